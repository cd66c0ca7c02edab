//! Dependency discovery from `.deps.qscripts` / `.proj.qscripts` index files
//!
//! Every script may have an index file next to it named after the script with
//! `.deps.qscripts` (or, failing that, `.proj.qscripts`) appended. Each line
//! is a comment, a directive, or a path to a dependency script. Dependencies
//! are walked depth-first: a dependency's own index file is read completely
//! before the next line of the file that introduced it.
//!
//! ```text
//! ; comment                      '#', ';' and '//' also start comments
//! /pkgbase <path>                main index file only
//! /reload <command>              main index file only
//! /triggerfile [/keep] <path>    main index file only
//! <path with $tokens$>           a dependency script
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::expand::{ExpansionContext, expand_path};
use crate::file_state::FileState;
use crate::session::{ActiveScriptSession, DependencyEntry};

/// Index file suffix looked up first
pub const DEPS_INDEX_SUFFIX: &str = ".deps.qscripts";
/// Index file suffix used when there is no `.deps.qscripts`
pub const PROJ_INDEX_SUFFIX: &str = ".proj.qscripts";

/// Deepest chain of nested index files that will be followed
pub const DEFAULT_MAX_DEPTH: usize = 32;
/// Upper bound on index files read during one resolution
pub const DEFAULT_MAX_INDEX_READS: usize = 4096;

/// One interpreted line of an index file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLine<'a> {
    PackageBase(&'a str),
    Reload(&'a str),
    TriggerFile { keep: bool, path: &'a str },
    Dependency(&'a str),
}

/// Interpret one line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Option<IndexLine<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") || line.starts_with('#') || line.starts_with(';')
    {
        return None;
    }

    if let Some(value) = directive_value(line, "/pkgbase") {
        return Some(IndexLine::PackageBase(value));
    }
    if let Some(value) = directive_value(line, "/reload") {
        return Some(IndexLine::Reload(value));
    }
    if let Some(value) = directive_value(line, "/triggerfile") {
        return Some(match directive_value(value, "/keep") {
            Some(path) => IndexLine::TriggerFile { keep: true, path },
            None => IndexLine::TriggerFile { keep: false, path: value },
        });
    }
    Some(IndexLine::Dependency(line))
}

/// Value following `keyword` when the keyword ends at whitespace, `/` or the end
fn directive_value<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(""),
        Some('/') => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Path of the index file for `script`, if one exists
pub fn index_file_for(script: &Path) -> Option<PathBuf> {
    [DEPS_INDEX_SUFFIX, PROJ_INDEX_SUFFIX]
        .into_iter()
        .map(|suffix| with_suffix(script, suffix))
        .find(|candidate| candidate.is_file())
}

fn with_suffix(script: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(script.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// An index file being read, with the context its lines expand against
struct Frame {
    lines: std::vec::IntoIter<String>,
    ctx: ExpansionContext,
    depth: usize,
}

/// Walks index files into an [`ActiveScriptSession`]'s dependency map
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    max_depth: usize,
    max_index_reads: usize,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_index_reads: DEFAULT_MAX_INDEX_READS,
        }
    }

    pub fn with_limits(max_depth: usize, max_index_reads: usize) -> Self {
        Self {
            max_depth,
            max_index_reads,
        }
    }

    /// Rebuild the session's index files, trigger and dependencies from scratch
    pub fn rebuild(&self, session: &mut ActiveScriptSession) -> bool {
        session.clear_resolution();
        let script = session.script_path().to_path_buf();
        self.resolve(session, &script)
    }

    /// Walk the index file of `script` and everything it references
    ///
    /// Adds to the session without clearing it first. Returns `false` when
    /// `script` has no index file, which simply means it has no dependencies.
    pub fn resolve(&self, session: &mut ActiveScriptSession, script: &Path) -> bool {
        let mut reads = 0;
        let Some(root) = self.open(session, ExpansionContext::for_main(script), 0, &mut reads)
        else {
            debug!(target: "qscripts", "No index file for {}", script.display());
            return false;
        };

        let mut stack = vec![root];
        while let Some(frame) = stack.last_mut() {
            let Some(line) = frame.lines.next() else {
                stack.pop();
                continue;
            };
            let Some(parsed) = parse_line(&line) else {
                continue;
            };

            match parsed {
                IndexLine::PackageBase(value) => {
                    if frame.ctx.is_main_file {
                        let base = expand_path(value, &frame.ctx);
                        debug!(target: "qscripts", "Package base: {}", base.display());
                        frame.ctx.package_base = Some(base);
                    }
                }
                IndexLine::Reload(command) => {
                    if frame.ctx.is_main_file {
                        frame.ctx.reload_command =
                            (!command.is_empty()).then(|| command.to_string());
                    }
                }
                IndexLine::TriggerFile { keep, path } => {
                    if frame.ctx.is_main_file {
                        let trigger = expand_path(path, &frame.ctx);
                        debug!(target: "qscripts", "Trigger file: {} (keep: {})", trigger.display(), keep);
                        session.trigger = Some(FileState::observed(trigger));
                        session.keep_trigger = keep;
                    }
                }
                IndexLine::Dependency(reference) => {
                    let path = expand_path(reference, &frame.ctx);
                    let mut file = FileState::new(&path);
                    if !file.refresh() {
                        debug!(target: "qscripts", "Skipping missing dependency: {}", path.display());
                        continue;
                    }

                    session.dependencies.insert(
                        path.clone(),
                        DependencyEntry {
                            file,
                            reload_command: frame.ctx.reload_command.clone(),
                            package_base: frame.ctx.package_base.clone(),
                        },
                    );

                    let depth = frame.depth + 1;
                    let child_ctx = frame.ctx.nested(&path);
                    if depth > self.max_depth {
                        warn!(
                            target: "qscripts",
                            "Dependency chain deeper than {} levels, not following {}",
                            self.max_depth,
                            path.display()
                        );
                        continue;
                    }
                    if reads >= self.max_index_reads {
                        warn!(
                            target: "qscripts",
                            "Read {} index files, abandoning the rest of the dependency walk",
                            reads
                        );
                        break;
                    }
                    if let Some(child) = self.open(session, child_ctx, depth, &mut reads) {
                        stack.push(child);
                    }
                }
            }
        }

        true
    }

    /// Locate, register and read the index file for `ctx.current_file`
    fn open(
        &self,
        session: &mut ActiveScriptSession,
        mut ctx: ExpansionContext,
        depth: usize,
        reads: &mut usize,
    ) -> Option<Frame> {
        let index = index_file_for(&ctx.current_file)?;

        // Registered before reading so that fixing an unreadable file triggers a rebuild
        session.index_files.push(FileState::observed(&index));
        let bytes = match std::fs::read(&index) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "qscripts", "Failed to read index file {}: {}", index.display(), e);
                return None;
            }
        };
        *reads += 1;

        debug!(target: "qscripts", "Reading index file {} (depth {})", index.display(), depth);
        ctx.base_dir = index
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        // Index files need not be UTF-8; stray bytes only affect the line they are on
        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        Some(Frame {
            lines: lines.into_iter(),
            ctx,
            depth,
        })
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("; note"), None);
        assert_eq!(parse_line("# note"), None);
        assert_eq!(parse_line("// note"), None);
    }

    #[test]
    fn test_parse_directives() {
        assert_eq!(parse_line("/pkgbase ."), Some(IndexLine::PackageBase(".")));
        assert_eq!(
            parse_line("  /reload import x; reload(x)  "),
            Some(IndexLine::Reload("import x; reload(x)"))
        );
        assert_eq!(parse_line("/reload"), Some(IndexLine::Reload("")));
        assert_eq!(
            parse_line("/triggerfile go.trigger"),
            Some(IndexLine::TriggerFile {
                keep: false,
                path: "go.trigger"
            })
        );
        assert_eq!(
            parse_line("/triggerfile /keep go.trigger"),
            Some(IndexLine::TriggerFile {
                keep: true,
                path: "go.trigger"
            })
        );
        assert_eq!(
            parse_line("/triggerfile/keep go.trigger"),
            Some(IndexLine::TriggerFile {
                keep: true,
                path: "go.trigger"
            })
        );
    }

    #[test]
    fn test_parse_keyword_needs_boundary() {
        assert_eq!(
            parse_line("/reloader.py"),
            Some(IndexLine::Dependency("/reloader.py"))
        );
        assert_eq!(parse_line("util.py"), Some(IndexLine::Dependency("util.py")));
    }

    #[test]
    fn test_deps_index_preferred_over_proj() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");
        assert_eq!(index_file_for(&script), None);

        let proj = write(temp_dir.path(), "main.py.proj.qscripts", "");
        assert_eq!(index_file_for(&script), Some(proj));

        let deps = write(temp_dir.path(), "main.py.deps.qscripts", "");
        assert_eq!(index_file_for(&script), Some(deps));
    }

    #[test]
    fn test_script_without_index_has_no_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");

        let mut session = ActiveScriptSession::new(&script);
        assert!(!DependencyResolver::new().rebuild(&mut session));
        assert!(session.dependencies.is_empty());
        assert!(session.index_files.is_empty());
    }

    #[test]
    fn test_missing_dependency_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");
        let present = write(temp_dir.path(), "present.py", "");
        write(
            temp_dir.path(),
            "main.py.deps.qscripts",
            "missing.py\npresent.py\n",
        );

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::new().rebuild(&mut session);

        let keys: Vec<_> = session.dependencies.keys().cloned().collect();
        assert_eq!(keys, vec![present]);
    }

    #[test]
    fn test_directives_ignored_outside_main_index() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");
        write(temp_dir.path(), "dep.py", "");
        let leaf = write(temp_dir.path(), "leaf.py", "");
        write(temp_dir.path(), "main.py.deps.qscripts", "dep.py\n");
        write(
            temp_dir.path(),
            "dep.py.deps.qscripts",
            "/reload nested()\n/triggerfile go.trigger\n/pkgbase /nowhere\nleaf.py\n",
        );

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::new().rebuild(&mut session);

        assert!(session.trigger.is_none());
        let entry = session.dependency(&leaf).unwrap();
        assert_eq!(entry.reload_command, None);
        assert_eq!(entry.package_base, None);
    }

    #[test]
    fn test_reload_template_inherited_by_nested_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");
        write(temp_dir.path(), "dep.py", "");
        let leaf = write(temp_dir.path(), "leaf.py", "");
        write(
            temp_dir.path(),
            "main.py.deps.qscripts",
            "/pkgbase .\n/reload reload($pkgmodname$)\ndep.py\n",
        );
        write(temp_dir.path(), "dep.py.deps.qscripts", "leaf.py\n");

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::new().rebuild(&mut session);

        let entry = session.dependency(&leaf).unwrap();
        assert_eq!(entry.reload_command.as_deref(), Some("reload($pkgmodname$)"));
        assert_eq!(entry.package_base.as_deref(), Some(temp_dir.path()));
    }

    #[test]
    fn test_trigger_directive() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "main.py", "");
        write(
            temp_dir.path(),
            "main.py.deps.qscripts",
            "/triggerfile /keep $basename$.trigger\n",
        );

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::new().rebuild(&mut session);

        assert!(session.keep_trigger);
        assert_eq!(
            session.trigger.as_ref().map(|t| t.path().to_path_buf()),
            Some(temp_dir.path().join("main.trigger"))
        );
    }

    #[test]
    fn test_cycle_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "a.py", "");
        let b = write(temp_dir.path(), "b.py", "");
        write(temp_dir.path(), "a.py.deps.qscripts", "b.py\n");
        write(temp_dir.path(), "b.py.deps.qscripts", "a.py\n");

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::with_limits(8, 100).rebuild(&mut session);

        assert_eq!(session.dependencies.len(), 2);
        assert!(session.dependency(&b).is_some());
        assert!(session.dependency(&script).is_some());
        // Main index plus one read per level
        assert_eq!(session.index_files.len(), 9);
    }

    #[test]
    fn test_branching_cycle_stops_at_read_budget() {
        let temp_dir = TempDir::new().unwrap();
        let script = write(temp_dir.path(), "a.py", "");
        write(temp_dir.path(), "b.py", "");
        write(temp_dir.path(), "c.py", "");
        write(temp_dir.path(), "a.py.deps.qscripts", "b.py\nc.py\n");
        write(temp_dir.path(), "b.py.deps.qscripts", "c.py\na.py\n");
        write(temp_dir.path(), "c.py.deps.qscripts", "a.py\nb.py\n");

        let mut session = ActiveScriptSession::new(&script);
        DependencyResolver::with_limits(64, 50).rebuild(&mut session);

        assert_eq!(session.index_files.len(), 50);
        assert_eq!(session.dependencies.len(), 3);
    }

    #[test]
    fn test_index_with_non_utf8_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let main = write(temp_dir.path(), "main.py", "");
        let dep = write(temp_dir.path(), "dep.py", "");
        let index = temp_dir.path().join("main.py.deps.qscripts");
        fs::write(&index, b"; caf\xe9 notes\ndep.py\n").unwrap();

        let mut session = ActiveScriptSession::new(&main);
        assert!(DependencyResolver::new().rebuild(&mut session));

        assert!(session.dependency(&dep).is_some());
        assert_eq!(session.dependencies.len(), 1);
        assert_eq!(session.index_files.len(), 1);
        assert_eq!(session.index_files[0].path(), index.as_path());
    }
}
