//! Host side of qscripts: persisted settings, logging setup, interpreter
//! processes standing in for script languages, and terminal output hooks.

pub mod config;
pub mod interpreter;
pub mod logging;
pub mod terminal;

pub use config::{ConfigLoadError, LanguageConfig, MonitorConfig, ProjectPaths, QScriptsConfig};
pub use interpreter::{ExternalInterpreter, build_registry};
pub use logging::{init_logging, level_for_verbosity};
pub use terminal::TerminalHooks;
