use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qscripts_cli::{WatchExit, report, run_watch};
use qscripts_core::{ActiveScriptSession, DependencyResolver, ReloadOrchestrator};
use qscripts_host::{
    ConfigLoadError, QScriptsConfig, TerminalHooks, build_registry, init_logging,
    level_for_verbosity,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
struct Cli {
    /// Enables debug output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Also write logs to the qscripts data directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script, then re-run it whenever it or a dependency changes
    Watch {
        /// Script to activate (default: the last watched script)
        script: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Clear the terminal before each run
        #[arg(long)]
        clear: bool,
    },
    /// Run a script once
    Run { script: PathBuf },
    /// Print the resolved dependencies of a script
    Deps { script: PathBuf },
    /// List the script languages and their interpreters
    Languages,
    /// Write an example config file
    Init,
}

fn load_config(path: &Path) -> Result<QScriptsConfig> {
    match QScriptsConfig::load_from(path) {
        Ok(config) => Ok(config),
        Err(ConfigLoadError::NotFound) => {
            info!("No config at {}, using defaults", path.display());
            Ok(QScriptsConfig::default())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn create_example_config(path: &Path) -> Result<()> {
    // Never overwrite an existing config file
    if path.exists() {
        bail!(
            "Config file already exists at {}. Edit it manually or delete it to create a new one.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let example_config = r#"# qscripts configuration

[monitor]
# Poll interval in milliseconds (minimum 300)
interval_ms = 500
clear_log = false
show_filename = false
# Call __quick_unload_script() before each re-run (needs a `call` snippet)
exec_unload_func = false

# Built-in interpreters cover py, sh, js, lua, rb and pl. Entries here
# replace them or add new extensions.
#
# [languages.py]
# name = "Python"
# program = "python3"
# eval_args = ["-c"]
# call = "import runpy; runpy.run_path(r'{script}')['{function}']()"
"#;

    fs::write(path, example_config)?;
    eprintln!("Config file created at: {}", path.display());
    Ok(())
}

async fn watch(
    mut config: QScriptsConfig,
    config_path: &Path,
    script: Option<PathBuf>,
    interval_ms: Option<u64>,
    clear: bool,
) -> Result<()> {
    let script = script
        .or_else(|| config.last_script.clone())
        .context("No script given and no previously watched script")?;
    let script = std::path::absolute(&script)
        .with_context(|| format!("Invalid script path {}", script.display()))?;
    if !script.exists() {
        bail!("Script file '{}' not found", script.display());
    }

    if config.last_script.as_deref() != Some(script.as_path()) {
        config.last_script = Some(script.clone());
        if let Err(e) = config.save_to(config_path) {
            warn!("Failed to remember {}: {:#}", script.display(), e);
        }
    }

    let mut options = config.monitor.options();
    if let Some(ms) = interval_ms {
        options.interval = Duration::from_millis(ms);
    }
    options.clear_output |= clear;

    let mut monitor =
        ReloadOrchestrator::new(build_registry(&config), options).with_hooks(TerminalHooks);

    // A failed first run is already logged; keep watching for the fix
    let _ = monitor.activate(&script);
    info!(
        "Watching {} every {}ms, press Ctrl-C to stop",
        script.display(),
        monitor.options().interval.as_millis()
    );

    let exit = run_watch(&mut monitor, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    if exit == WatchExit::ScriptRemoved {
        bail!("{} was removed", script.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_logging(level_for_verbosity(cli.debug), cli.log_file)
        .context("Failed to initialize logging")?;

    let config_path = cli.config.unwrap_or_else(QScriptsConfig::config_path);

    match cli.command {
        Command::Init => create_example_config(&config_path)?,
        Command::Watch {
            script,
            interval_ms,
            clear,
        } => {
            let config = load_config(&config_path)?;
            watch(config, &config_path, script, interval_ms, clear).await?;
        }
        Command::Run { script } => {
            let config = load_config(&config_path)?;
            let mut monitor = ReloadOrchestrator::new(
                build_registry(&config),
                config.monitor.options(),
            )
            .with_hooks(TerminalHooks);
            if monitor.execute_file(script).is_err() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Deps { script } => {
            let script = std::path::absolute(&script)?;
            let mut session = ActiveScriptSession::new(&script);
            DependencyResolver::new().rebuild(&mut session);
            print!("{}", report::dependency_tree(&session));
        }
        Command::Languages => {
            let config = load_config(&config_path)?;
            print!("{}", report::language_table(&config.language_configs()));
        }
    }

    Ok(ExitCode::SUCCESS)
}
