//! Dependency discovery, change detection and reload orchestration
//!
//! A script is activated into an [`ActiveScriptSession`]; its index files
//! (`<script>.deps.qscripts`) are walked into a dependency map; a host timer
//! then calls [`ReloadOrchestrator::tick`] which re-runs the script, or the
//! `/reload` command of a changed dependency, whenever something changes.
//! Running scripts is delegated to host-provided [`ScriptLanguage`]s.

pub mod error;
pub mod expand;
pub mod file_state;
pub mod language;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod timer;

// Re-export commonly used types
pub use error::{ExecError, LanguageError, ReloadError};
pub use expand::{ExpansionContext, expand, expand_path};
pub use file_state::{FileState, FileStatus};
pub use language::{LanguageRegistry, ScriptLanguage};
pub use orchestrator::{
    DEFAULT_POLL_INTERVAL, HostHooks, MIN_POLL_INTERVAL, MonitorOptions, NoHooks,
    REPOLL_AFTER_REBUILD, ReloadOrchestrator, TickOutcome, TickReport, UNLOAD_FUNCTION_NAME,
};
pub use resolver::DependencyResolver;
pub use session::{ActiveScriptSession, DependencyEntry};
pub use timer::{TimerId, TimerManager};
