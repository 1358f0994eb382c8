use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use starbase::{App, AppResult, AppSession};
use std::path::PathBuf;
use urlimport::commands::{run_demo, run_list, run_module, run_resolve};
use urlimport::logging::init_logging;
use urlimport::{CliContext, OutputFormat};

/// urlimport - import sandboxed modules from remote HTTP roots
#[derive(Parser)]
#[command(name = "urlimport")]
#[command(about = "Import sandboxed modules from remote HTTP roots", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a urlimport.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Subcommand)]
enum Commands {
    /// Import a module and optionally call one of its functions
    Run {
        /// Remote root, e.g. http://localhost:8000
        root: String,
        /// Module name to import
        module: String,
        /// Function to call after importing
        #[arg(long)]
        call: Option<String>,
        /// Positional arguments for the called function
        #[arg(requires = "call")]
        args: Vec<String>,
    },
    /// List the modules a remote root offers
    List {
        /// Remote root, e.g. http://localhost:8000
        root: String,
    },
    /// Show the URL a module name resolves to
    Resolve {
        /// Remote root, e.g. http://localhost:8000
        root: String,
        /// Module name to resolve
        module: String,
    },
    /// Import remotePack from http://localhost:8000 and call fun()
    Demo,
}

/// Application session for the urlimport CLI
#[derive(Clone)]
struct UrlImportSession {
    config: Option<PathBuf>,
    format: OutputFormat,
    command: Commands,
}

#[async_trait::async_trait]
impl AppSession for UrlImportSession {
    async fn execute(&mut self) -> AppResult {
        let ctx = CliContext::load(self.config.as_deref(), self.format).into_diagnostic()?;
        let command = self.command.clone();

        // Imports use a blocking HTTP client.
        tokio::task::spawn_blocking(move || match command {
            Commands::Run {
                root,
                module,
                call,
                args,
            } => run_module(&ctx, &root, &module, call.as_deref(), &args),
            Commands::List { root } => run_list(&ctx, &root),
            Commands::Resolve { root, module } => run_resolve(&ctx, &root, &module),
            Commands::Demo => run_demo(&ctx),
        })
        .await
        .into_diagnostic()?
    }
}

#[tokio::main]
async fn main() -> starbase::MainResult {
    let cli = Cli::parse();
    init_logging();

    let session = UrlImportSession {
        config: cli.config,
        format: OutputFormat::from_json_flag(cli.json),
        command: cli.command,
    };

    let exit_code = App::default()
        .run(
            session,
            |mut session| async move { session.execute().await },
        )
        .await?;

    Ok(std::process::ExitCode::from(exit_code))
}
