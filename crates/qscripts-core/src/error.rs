use std::path::PathBuf;

/// Failure reported by a [`ScriptLanguage`](crate::ScriptLanguage)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LanguageError {
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("compilation failed: {0}")]
    Compile(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("function `{0}` not found")]
    FunctionNotFound(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Why running a script file did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("script file '{}' not found", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("unknown script language for '{}'", .0.display())]
    UnknownLanguage(PathBuf),
    #[error("failed to run script file '{}': {source}", path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: LanguageError,
    },
    #[error("failed to call {function}() of '{}': {source}", path.display())]
    EntryFunction {
        path: PathBuf,
        function: String,
        #[source]
        source: LanguageError,
    },
}

/// Why a dependency's `/reload` command did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReloadError {
    #[error("unknown script language for '{}'", .0.display())]
    UnknownLanguage(PathBuf),
    #[error("failed to reload '{}': {source}", path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: LanguageError,
    },
}
