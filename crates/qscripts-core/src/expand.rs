//! `$token$` expansion for index-file lines and reload commands
//!
//! | token        | expansion                                                  |
//! |--------------|------------------------------------------------------------|
//! | `basename`   | file name of the current file without its extension       |
//! | `env:NAME`   | value of the environment variable `NAME` (empty if unset) |
//! | `pkgbase`    | the active package base                                    |
//! | `pkgmodname` | dotted module path of the current file under the package base |
//!
//! Anything else between two `$` is replaced by its inner text.

use std::path::{Component, Path, PathBuf};

/// Everything needed to expand one line
#[derive(Debug, Clone, Default)]
pub struct ExpansionContext {
    /// File whose name feeds `$basename$` and `$pkgmodname$`
    pub current_file: PathBuf,
    /// Whether the index file being read belongs to the activated script
    pub is_main_file: bool,
    /// Directory of the index file being read; relative paths resolve against it
    pub base_dir: PathBuf,
    /// Root used by `$pkgbase$` and `$pkgmodname$`
    pub package_base: Option<PathBuf>,
    /// Active `/reload` template, inherited by nested dependencies
    pub reload_command: Option<String>,
}

impl ExpansionContext {
    /// Context for reading the index file of the activated script
    pub fn for_main(script: &Path) -> Self {
        Self {
            current_file: script.to_path_buf(),
            is_main_file: true,
            base_dir: parent_dir(script),
            package_base: None,
            reload_command: None,
        }
    }

    /// Context for a dependency discovered under `self`
    pub fn nested(&self, dependency: &Path) -> Self {
        Self {
            current_file: dependency.to_path_buf(),
            is_main_file: false,
            base_dir: parent_dir(dependency),
            package_base: self.package_base.clone(),
            reload_command: self.reload_command.clone(),
        }
    }
}

/// Replace every `$token$` in `input`
///
/// A token starts at a `$` and ends at the next `$` that leaves at least one
/// character in between. An unmatched `$` is copied through.
pub fn expand(input: &str, ctx: &ExpansionContext) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('$') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        // The inner text must be non-empty, so the closing `$` is searched
        // from the second character on.
        let Some(first) = after.chars().next() else {
            output.push('$');
            rest = after;
            break;
        };
        let Some(end) = after[first.len_utf8()..].find('$') else {
            output.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let end = end + first.len_utf8();

        output.push_str(&expand_token(&after[..end], ctx));
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Expand `input` and resolve it to a normalized absolute path under `ctx.base_dir`
pub fn expand_path(input: &str, ctx: &ExpansionContext) -> PathBuf {
    absolutize(Path::new(&expand(input, ctx)), &ctx.base_dir)
}

fn expand_token(token: &str, ctx: &ExpansionContext) -> String {
    if token.starts_with("pkgmodname") {
        ctx.package_base
            .as_deref()
            .and_then(|base| module_name(&ctx.current_file, base))
            .unwrap_or_default()
    } else if token.starts_with("pkgbase") {
        ctx.package_base
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    } else if token.starts_with("basename") {
        ctx.current_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else if let Some(name) = token.strip_prefix("env:") {
        std::env::var(name).unwrap_or_default()
    } else {
        token.to_string()
    }
}

/// `base/sub/mod.py` -> `sub.mod`
fn module_name(file: &Path, base: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let last = parts.pop()?;
    let stem = Path::new(&last)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(last);
    parts.push(stem);
    Some(parts.join("."))
}

/// Join a relative `path` onto `base` and lexically normalize the result
///
/// Symlinks are not resolved; `.` and `..` components are folded.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
