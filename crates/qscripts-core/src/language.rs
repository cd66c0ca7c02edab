//! Script languages the engine can hand files and snippets to

use std::path::Path;

use crate::error::LanguageError;

/// A script language provided by the host, selected by file extension
pub trait ScriptLanguage: Send {
    /// Human-readable language name (e.g., "Python")
    fn name(&self) -> &str;

    /// File extension without the dot (e.g., "py")
    fn extension(&self) -> &str;

    /// Evaluate a snippet of code, used for `/reload` commands
    fn evaluate_snippet(&mut self, code: &str) -> Result<(), LanguageError>;

    /// Compile and run a script file
    fn compile_and_run(&mut self, path: &Path) -> Result<(), LanguageError>;

    /// Call a function defined by the last script that ran
    ///
    /// Callers treat failure as best-effort; a missing function is not fatal.
    fn call_function(&mut self, name: &str) -> Result<(), LanguageError>;

    /// Function that must be called after compiling a file, if any
    fn entry_function(&self) -> Option<&str> {
        None
    }
}

/// Languages keyed by file extension
#[derive(Default)]
pub struct LanguageRegistry {
    languages: Vec<Box<dyn ScriptLanguage>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language, replacing any language with the same extension
    pub fn register(&mut self, language: Box<dyn ScriptLanguage>) {
        let ext = language.extension().to_ascii_lowercase();
        self.languages
            .retain(|l| !l.extension().eq_ignore_ascii_case(&ext));
        self.languages.push(language);
    }

    pub fn find_by_extension(&mut self, ext: &str) -> Option<&mut (dyn ScriptLanguage + 'static)> {
        self.languages
            .iter_mut()
            .find(|l| l.extension().eq_ignore_ascii_case(ext))
            .map(|l| l.as_mut())
    }

    /// The language for `path`'s extension
    pub fn for_path(&mut self, path: &Path) -> Option<&mut (dyn ScriptLanguage + 'static)> {
        let ext = path.extension()?.to_str()?;
        self.find_by_extension(ext)
    }

    pub fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.languages
                    .iter()
                    .any(|l| l.extension().eq_ignore_ascii_case(ext))
            })
    }

    /// `(name, extension)` of every registered language
    pub fn installed(&self) -> Vec<(&str, &str)> {
        self.languages
            .iter()
            .map(|l| (l.name(), l.extension()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.installed()).finish()
    }
}
