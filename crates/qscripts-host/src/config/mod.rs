pub mod paths;
pub mod qscripts_config;

pub use paths::ProjectPaths;
pub use qscripts_config::{
    ConfigLoadError, LanguageConfig, MonitorConfig, QScriptsConfig, default_languages,
};
