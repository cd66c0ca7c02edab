//! Plain-text listings printed by the `deps` and `languages` commands

use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use qscripts_core::{ActiveScriptSession, FileState};
use qscripts_host::LanguageConfig;

fn modified(file: &FileState) -> String {
    match file.last_modified() {
        Some(time) => timestamp(time),
        None => "missing".to_string(),
    }
}

fn timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// The resolved view of a session: script, index files, trigger, dependencies
pub fn dependency_tree(session: &ActiveScriptSession) -> String {
    let mut out = String::new();
    let main = &session.main.file;
    let _ = writeln!(out, "{} ({})", main.path().display(), modified(main));

    if session.index_files.is_empty() {
        let _ = writeln!(out, "  no index file");
        return out;
    }

    let _ = writeln!(out, "  index files:");
    for index in &session.index_files {
        let _ = writeln!(out, "    {} ({})", index.path().display(), modified(index));
    }

    if let Some(trigger) = &session.trigger {
        let _ = writeln!(
            out,
            "  trigger: {}{}",
            trigger.path().display(),
            if session.keep_trigger { " (kept)" } else { "" }
        );
    }

    let _ = writeln!(out, "  dependencies: {}", session.dependencies.len());
    for entry in session.dependencies.values() {
        let _ = writeln!(out, "    {} ({})", entry.path().display(), modified(&entry.file));
        if let Some(command) = &entry.reload_command {
            let _ = writeln!(out, "      reload: {}", command);
        }
        if let Some(base) = &entry.package_base {
            let _ = writeln!(out, "      package base: {}", base.display());
        }
    }
    out
}

/// One line per extension with the interpreter that runs it
pub fn language_table(languages: &BTreeMap<String, LanguageConfig>) -> String {
    let mut out = String::new();
    for (ext, language) in languages {
        let _ = write!(out, ".{:<6} {:<12} {}", ext, language.name, language.program);
        if let Some(entry) = &language.entry {
            let _ = write!(out, " (entry: {})", entry);
        }
        out.push('\n');
    }
    out
}
