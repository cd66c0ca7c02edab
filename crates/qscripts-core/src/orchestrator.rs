//! The poll tick that turns file changes into reloads and re-runs
//!
//! Each tick looks at the session in a fixed order and may stop early:
//!
//! 1. monitoring off or no session: nothing to do
//! 2. trigger file (if any): wait until it is modified, then consume it
//! 3. index files: a change rebuilds the dependency map and re-polls quickly
//! 4. dependencies: modified ones run their `/reload` command
//! 5. main script: gone tears the session down, otherwise re-run on any change

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{ExecError, ReloadError};
use crate::expand::{ExpansionContext, absolutize, expand};
use crate::file_state::{FileState, FileStatus};
use crate::language::LanguageRegistry;
use crate::resolver::DependencyResolver;
use crate::session::{ActiveScriptSession, DependencyEntry};

/// Shortest poll interval a host may configure
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(300);
/// Poll interval used when nothing is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Delay before the tick that follows a dependency rebuild
pub const REPOLL_AFTER_REBUILD: Duration = Duration::from_millis(1);
/// Function called in the previous run's scope before re-running, when enabled
pub const UNLOAD_FUNCTION_NAME: &str = "__quick_unload_script";

/// Behaviour switches for the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    pub interval: Duration,
    /// Ask the host to clear its output before each run
    pub clear_output: bool,
    /// Announce the file name at `info` level before each run
    pub show_filename: bool,
    /// Call [`UNLOAD_FUNCTION_NAME`] before each run
    pub exec_unload_func: bool,
}

impl MonitorOptions {
    /// Clamp the interval to [`MIN_POLL_INTERVAL`]
    pub fn normalized(mut self) -> Self {
        self.interval = self.interval.max(MIN_POLL_INTERVAL);
        self
    }
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            clear_output: false,
            show_filename: false,
            exec_unload_func: false,
        }
    }
}

/// Host-side effects the engine asks for
pub trait HostHooks: Send {
    /// Clear the output window before a run
    fn clear_output(&mut self) {}

    /// The session's dependency set changed
    fn refresh_view(&mut self, _session: &ActiveScriptSession) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl HostHooks for NoHooks {}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Monitoring is off or there is no active script
    Inactive,
    /// Trigger mode and the trigger file has not changed
    WaitingForTrigger,
    /// Nothing changed
    Unchanged,
    /// An index file changed and the dependency map was rebuilt
    DependenciesRebuilt { dependencies: usize },
    /// A `/reload` command failed; the script was not re-run
    ReloadFailed { path: PathBuf, error: ReloadError },
    /// The main script no longer exists and the session was dropped
    ScriptRemoved { path: PathBuf },
    /// The main script was re-run
    Executed { result: Result<(), ExecError> },
}

/// Outcome of a tick together with when the next one should happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub next_poll: Duration,
}

/// Owns the active session and reacts to changes in it
pub struct ReloadOrchestrator {
    session: Option<ActiveScriptSession>,
    monitoring: bool,
    options: MonitorOptions,
    resolver: DependencyResolver,
    languages: LanguageRegistry,
    hooks: Box<dyn HostHooks>,
}

impl ReloadOrchestrator {
    pub fn new(languages: LanguageRegistry, options: MonitorOptions) -> Self {
        Self {
            session: None,
            monitoring: false,
            options: options.normalized(),
            resolver: DependencyResolver::new(),
            languages,
            hooks: Box::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: impl HostHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_resolver(mut self, resolver: DependencyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MonitorOptions) {
        self.options = options.normalized();
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn session(&self) -> Option<&ActiveScriptSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ActiveScriptSession> {
        self.session.as_mut()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Turn the monitor on or off, returning the previous state
    pub fn set_monitoring(&mut self, active: bool) -> bool {
        std::mem::replace(&mut self.monitoring, active)
    }

    /// Make `script` the active script, run it once and start monitoring
    ///
    /// Monitoring starts even if this first run fails, so that fixing the
    /// script in the editor re-runs it.
    pub fn activate(&mut self, script: impl AsRef<Path>) -> Result<(), ExecError> {
        let script = match std::env::current_dir() {
            Ok(cwd) => absolutize(script.as_ref(), &cwd),
            Err(_) => script.as_ref().to_path_buf(),
        };

        let mut session = ActiveScriptSession::new(&script);
        self.resolver.rebuild(&mut session);
        info!(
            target: "qscripts",
            "Activated {} ({} dependencies)",
            script.display(),
            session.dependencies.len()
        );
        self.hooks.refresh_view(&session);
        self.session = Some(session);

        let result = self.execute_active();
        self.monitoring = true;
        result
    }

    /// Drop the active session and stop monitoring
    pub fn deactivate(&mut self) {
        if let Some(session) = self.session.take() {
            info!(target: "qscripts", "Deactivated {}", session.script_path().display());
        }
        self.monitoring = false;
    }

    /// Run the active script now, regardless of whether it changed
    pub fn execute_active(&mut self) -> Result<(), ExecError> {
        let was_monitoring = self.set_monitoring(false);
        let result = match self.session.as_mut() {
            Some(session) => execute_script(
                &mut self.languages,
                self.hooks.as_mut(),
                &self.options,
                &mut session.main.file,
            ),
            None => Ok(()),
        };
        self.set_monitoring(was_monitoring);
        result
    }

    /// Run any script once without touching the active session
    pub fn execute_file(&mut self, script: impl Into<PathBuf>) -> Result<(), ExecError> {
        let was_monitoring = self.set_monitoring(false);
        let mut file = FileState::new(script);
        let result = execute_script(
            &mut self.languages,
            self.hooks.as_mut(),
            &self.options,
            &mut file,
        );
        self.set_monitoring(was_monitoring);
        result
    }

    /// One poll of the active session
    pub fn tick(&mut self) -> TickReport {
        let outcome = self.poll();
        let next_poll = match outcome {
            TickOutcome::DependenciesRebuilt { .. } => REPOLL_AFTER_REBUILD,
            _ => self.options.interval,
        };
        TickReport { outcome, next_poll }
    }

    fn poll(&mut self) -> TickOutcome {
        if !self.monitoring {
            return TickOutcome::Inactive;
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Inactive;
        };

        // In trigger mode nothing happens until the trigger file changes
        if let Some(trigger) = session.trigger.as_mut() {
            if trigger.status(true) != FileStatus::Modified {
                return TickOutcome::WaitingForTrigger;
            }
            debug!(target: "qscripts", "Trigger file fired: {}", trigger.path().display());

            if !session.keep_trigger
                && let Err(e) = std::fs::remove_file(trigger.path())
            {
                warn!(
                    target: "qscripts",
                    "Failed to delete trigger file {}: {}",
                    trigger.path().display(),
                    e
                );
            }

            // Always run the main script even if it did not change
            session.main.file.invalidate();
        }

        match session.is_any_index_modified(true) {
            FileStatus::Modified => {
                self.resolver.rebuild(session);
                session.invalidate_all();
                self.hooks.refresh_view(session);

                let dependencies = session.dependencies.len();
                info!(
                    target: "qscripts",
                    "Dependency index changed, now tracking {} dependencies",
                    dependencies
                );
                return TickOutcome::DependenciesRebuilt { dependencies };
            }
            FileStatus::NotFound if !session.dependencies.is_empty() => {
                info!(
                    target: "qscripts",
                    "Dependency index file is gone, monitoring only {}",
                    session.script_path().display()
                );
                session.dependencies.clear();
            }
            _ => {}
        }

        let mut dependency_changed = false;
        for entry in session.dependencies.values_mut() {
            if entry.file.status(true) != FileStatus::Modified {
                continue;
            }
            dependency_changed = true;

            if entry.has_reload_directive() {
                if let Err(error) = run_reload_command(&mut self.languages, entry) {
                    warn!(target: "qscripts", "Failed to execute reload directive: {}", error);
                    return TickOutcome::ReloadFailed {
                        path: entry.path().to_path_buf(),
                        error,
                    };
                }
            }
        }

        let main_status = session.main.file.status(true);
        if main_status == FileStatus::NotFound {
            let path = session.script_path().to_path_buf();
            info!(
                target: "qscripts",
                "Active script {} no longer exists",
                path.display()
            );
            self.deactivate();
            return TickOutcome::ScriptRemoved { path };
        }

        if dependency_changed || main_status == FileStatus::Modified {
            let result = self.execute_active();
            return TickOutcome::Executed { result };
        }

        TickOutcome::Unchanged
    }
}

impl std::fmt::Debug for ReloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadOrchestrator")
            .field("session", &self.session)
            .field("monitoring", &self.monitoring)
            .field("options", &self.options)
            .field("languages", &self.languages)
            .finish_non_exhaustive()
    }
}

/// Evaluate a dependency's `/reload` command in the language of that dependency
///
/// The command is expanded against the dependency itself, so `$basename$` and
/// `$pkgmodname$` name the file that changed.
pub fn run_reload_command(
    languages: &mut LanguageRegistry,
    entry: &DependencyEntry,
) -> Result<(), ReloadError> {
    let path = entry.path();
    let Some(template) = entry.reload_command.as_deref() else {
        return Ok(());
    };
    let Some(language) = languages.for_path(path) else {
        return Err(ReloadError::UnknownLanguage(path.to_path_buf()));
    };

    let ctx = ExpansionContext {
        current_file: path.to_path_buf(),
        is_main_file: false,
        base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        package_base: entry.package_base.clone(),
        reload_command: None,
    };
    let command = expand(template, &ctx);
    debug!(target: "qscripts", "Reloading {}: {}", path.display(), command);

    language
        .evaluate_snippet(&command)
        .map_err(|source| ReloadError::Failed {
            path: path.to_path_buf(),
            source,
        })
}

/// Compile and run `file` through the language registered for its extension
///
/// The file's timestamp is taken first, so a change made while the script runs
/// is seen by the next tick and a failed run is not retried until the file
/// changes again.
pub fn execute_script(
    languages: &mut LanguageRegistry,
    hooks: &mut dyn HostHooks,
    options: &MonitorOptions,
    file: &mut FileState,
) -> Result<(), ExecError> {
    let result = run_script(languages, hooks, options, file);
    if let Err(e) = &result {
        error!(target: "qscripts", "{}", e);
    }
    result
}

fn run_script(
    languages: &mut LanguageRegistry,
    hooks: &mut dyn HostHooks,
    options: &MonitorOptions,
    file: &mut FileState,
) -> Result<(), ExecError> {
    if !file.refresh() {
        return Err(ExecError::ScriptNotFound(file.path().to_path_buf()));
    }
    let path = file.path();

    let Some(language) = languages.for_path(path) else {
        return Err(ExecError::UnknownLanguage(path.to_path_buf()));
    };

    if options.clear_output {
        hooks.clear_output();
    }

    if options.exec_unload_func
        && let Err(e) = language.call_function(UNLOAD_FUNCTION_NAME)
    {
        debug!(target: "qscripts", "{}() not called: {}", UNLOAD_FUNCTION_NAME, e);
    }

    if options.show_filename {
        info!(target: "qscripts", "Executing {}...", path.display());
    } else {
        debug!(target: "qscripts", "Executing {} ({})", path.display(), language.name());
    }

    language
        .compile_and_run(path)
        .map_err(|source| ExecError::Failed {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(entry) = language.entry_function().map(str::to_owned) {
        language
            .call_function(&entry)
            .map_err(|source| ExecError::EntryFunction {
                path: path.to_path_buf(),
                function: entry,
                source,
            })?;
    }

    Ok(())
}
