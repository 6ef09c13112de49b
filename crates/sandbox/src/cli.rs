//! Command line entry point.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::editor::{Editor, EditorOptions};
use crate::app::persist::Store;
use crate::app::session::SessionStore;
use crate::domain::errors::SandboxError;
use crate::domain::model::LogLevel;
use crate::domain::wire::SourcesPayload;
use crate::infra::config::Config;
use crate::infra::http::HttpBackend;
use crate::infra::logging::{self, LogTarget};
use crate::ui::app::UiApp;

#[derive(Debug, Parser)]
#[command(
    name = "sandbox",
    author,
    version,
    about = "Edit sandbox sources and check them against the build server",
    long_about = None
)]
pub struct Cli {
    /// Backend base URL, overriding config and SANDBOX_SERVER_URL
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the interactive editor (default)
    Tui,
    /// Fetch the directory tree and print it as JSON
    Pull {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build-check one source and report the first diagnostic
    Check {
        dir: String,
        source: String,
        /// Check this file's content instead of the stored content
        #[arg(long, value_name = "FILE")]
        content_file: Option<PathBuf>,
    },
    /// Save a directory tree read from a JSON file
    Push {
        file: PathBuf,
        /// Ask the server to rebuild outputs after saving
        #[arg(long)]
        update_builds: bool,
        /// Send variables whose name is empty
        #[arg(long)]
        keep_empty_variables: bool,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

pub fn run() -> Result<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Tui);
    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "sandbox", &mut io::stdout());
        return Ok(());
    }

    let root = env::current_dir().context("unable to determine working directory")?;
    let target = match command {
        Commands::Tui => LogTarget::File(SessionStore::new(&root).dir().join("sandbox.log")),
        _ => LogTarget::Stderr,
    };
    logging::init(target, cli.verbose)?;

    let config = Config::load()?.with_base_url(cli.server);
    let backend = HttpBackend::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    tracing::debug!(server = backend.base_url(), "configured backend");

    match command {
        Commands::Tui => {
            let mut app = UiApp::new(&config, backend, runtime.handle().clone(), root);
            app.run()
        }
        Commands::Pull { output } => runtime.block_on(pull(&backend, output.as_deref())),
        Commands::Check {
            dir,
            source,
            content_file,
        } => runtime.block_on(check(
            &backend,
            &config,
            &dir,
            &source,
            content_file.as_deref(),
        )),
        Commands::Push {
            file,
            update_builds,
            keep_empty_variables,
        } => {
            let options = push_options(&config, update_builds, keep_empty_variables);
            runtime.block_on(push(&backend, options, &file))
        }
        Commands::Completions { .. } => Ok(()),
    }
}

async fn pull(backend: &HttpBackend, output: Option<&Path>) -> Result<()> {
    let dirs = backend.load().await.context("failed to load sources")?;
    let json = serde_json::to_string_pretty(&SourcesPayload { dirs })?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => writeln!(io::stdout(), "{json}")?,
    }
    Ok(())
}

async fn check(
    backend: &HttpBackend,
    config: &Config,
    dir: &str,
    source: &str,
    content_file: Option<&Path>,
) -> Result<()> {
    let mut editor = Editor::new(EditorOptions::from_config(config));
    if !editor.reload(backend).await {
        bail!(latest_error(&editor));
    }

    if editor.workspace().registry().dir(dir).is_none() {
        return Err(SandboxError::UnknownDir(dir.to_string()).into());
    }
    if !editor.select_source(dir, source) {
        return Err(SandboxError::UnknownSource {
            path: dir.to_string(),
            name: source.to_string(),
        }
        .into());
    }
    if let Some(path) = content_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        editor.set_content(dir, source, content);
    }

    editor.check_selected(backend).await;
    if let Some(shown) = editor.diagnostic() {
        writeln!(io::stdout(), "{}", shown.error.summary())?;
        bail!(
            "{}/{} has {} build error(s)",
            dir,
            source,
            shown.reported
        );
    }
    match editor.log().latest() {
        Some(entry) if entry.level == LogLevel::Success => {
            writeln!(io::stdout(), "{}", entry.text)?;
            Ok(())
        }
        _ => bail!(latest_error(&editor)),
    }
}

/// Flags can only turn `update_builds` on and unnamed-variable filtering off.
fn push_options(
    config: &Config,
    update_builds: bool,
    keep_empty_variables: bool,
) -> EditorOptions {
    let mut options = EditorOptions::from_config(config);
    options.save.update_builds |= update_builds;
    options.save.drop_empty_variables &= !keep_empty_variables;
    options
}

async fn push(backend: &HttpBackend, options: EditorOptions, file: &Path) -> Result<()> {
    let data = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let payload: SourcesPayload = serde_json::from_str(&data)
        .with_context(|| format!("invalid sources file {}", file.display()))?;

    let mut editor = Editor::new(options);
    editor.load(payload.dirs);
    editor.save(backend).await;

    match editor.log().latest() {
        Some(entry) if entry.level == LogLevel::Info => {
            writeln!(io::stdout(), "{}", entry.text)?;
            Ok(())
        }
        _ => bail!(latest_error(&editor)),
    }
}

fn latest_error(editor: &Editor) -> String {
    editor
        .log()
        .latest()
        .map(|entry| entry.text.clone())
        .unwrap_or_else(|| "operation failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tui() {
        let cli = Cli::try_parse_from(["sandbox"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn server_flag_is_global() {
        let cli =
            Cli::try_parse_from(["sandbox", "check", "a", "x", "--server", "http://s"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://s"));
        assert!(matches!(
            cli.command,
            Some(Commands::Check { ref dir, ref source, .. }) if dir == "a" && source == "x"
        ));
    }

    #[test]
    fn push_flags_do_not_override_config_opt_outs() {
        let mut config = Config::default();
        config.editor.drop_empty_variables = false;
        let options = push_options(&config, false, false);
        assert!(!options.save.drop_empty_variables);
        assert!(!options.save.update_builds);

        let config = Config::default();
        assert!(push_options(&config, false, false).save.drop_empty_variables);
        let options = push_options(&config, true, true);
        assert!(!options.save.drop_empty_variables);
        assert!(options.save.update_builds);
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
