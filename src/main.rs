// src/main.rs

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sshgate::config;
use sshgate::sys::scripts::split_remote_dir;
use sshgate::{
    ArtifactResult, BinaryResult, CommandAction, CommandCatalog, ExecResult, GatewayConfig,
    RemoteGateway, SshGateway, Stager,
};

#[derive(Parser)]
#[command(name = "sshgate", version, about = "Run commands and fetch files on the configured remote host")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show the command catalog
    List,
    #[command(flatten)]
    Remote(RemoteCmd),
}

/// Subcommands that talk to the remote host and so need credentials.
#[derive(Subcommand)]
enum RemoteCmd {
    /// Run a shell command remotely (arguments are joined with spaces)
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Download a remote directory as .tar.gz
    Archive { directory: String },
    /// Download the newest file matching a remote glob
    Fetch {
        glob: String,
        /// Only accept files modified at or after this remote epoch
        #[arg(long)]
        since: Option<i64>,
    },
    /// Run a catalog entry by key
    Run { key: String },
    /// Print the remote clock
    Epoch,
}

fn init_tracing() {
    // Logs go to stderr; stdout carries command output only.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SSHGATE_LOG_JSON").is_ok_and(|v| v == "1");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Process exit status mirrors the remote result; out-of-range codes clamp to 1.
fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn report_exec(res: &ExecResult) -> ExitCode {
    print!("{}", res.output);
    if !res.output.is_empty() && !res.output.ends_with('\n') {
        println!();
    }
    if let Some(kind) = res.failure {
        eprintln!("❗️ Exit code {} ({})", res.exit_code, kind);
    }
    exit_with(res.exit_code)
}

async fn report_archive(stager: &Stager, directory: &str, res: BinaryResult) -> Result<ExitCode, Box<dyn Error>> {
    if !res.is_success() {
        eprintln!("❗️ Exit code {}: {}", res.exit_code, res.diagnostic().trim());
        return Ok(exit_with(res.exit_code));
    }
    if let Some(warnings) = &res.warnings {
        eprintln!("⚠️ tar exited {} with warnings:\n{}", res.exit_code, warnings.trim());
    }

    let (_, leaf) = split_remote_dir(directory);
    let name = if leaf == "." { "archive".to_string() } else { leaf };
    let path = stager.stage(&format!("{}.tar.gz", name), res.payload).await?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn report_artifact(stager: &Stager, res: ArtifactResult) -> Result<ExitCode, Box<dyn Error>> {
    if !res.is_success() {
        eprintln!("❗️ Exit code {}: {}", res.exit_code, res.diagnostic().trim());
        return Ok(exit_with(res.exit_code));
    }

    let name = res.filename.clone().unwrap_or_default();
    let path = stager.stage(&name, res.payload).await?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Second step of a manual entry: read the command from stdin.
async fn prompt_command() -> Result<Option<String>, Box<dyn Error>> {
    eprint!("Command to run: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let line = line.trim().to_string();
    Ok((!line.is_empty()).then_some(line))
}

fn print_catalog(catalog: &CommandCatalog) {
    println!("{}", catalog.title);
    for entry in catalog.ordered() {
        let what = match &entry.action {
            CommandAction::Exec(cmd) => format!("exec: {}", cmd),
            CommandAction::Archive(dir) => format!("archive: {}", dir),
            CommandAction::Fetch { glob, trigger: Some(t) } => format!("fetch: {} after `{}`", glob, t),
            CommandAction::Fetch { glob, trigger: None } => format!("fetch: {}", glob),
            CommandAction::Manual => "manual".to_string(),
        };
        println!("  {:<12} {:<24} {}", entry.key, entry.title, what);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // ==============================================================================
    // 1. Configuration & Environment
    // ==============================================================================
    init_tracing();
    let cli = Cli::parse();

    // Real environment wins; ./.env only fills gaps.
    let file_vars = config::read_dotenv(Path::new(config::DOTENV_FILE));
    let lookup = config::layered(|key| std::env::var(key).ok(), &file_vars);
    let catalog = CommandCatalog::load(&config::catalog_path(&lookup));

    let command = match cli.command {
        Cmd::List => {
            print_catalog(&catalog);
            return Ok(ExitCode::SUCCESS);
        }
        Cmd::Remote(command) => command,
    };

    // ==============================================================================
    // 2. Credentials (fatal on failure: no key, no remote execution)
    // ==============================================================================
    let settings = GatewayConfig::load_from(&lookup)?;
    let profile = settings.connection_profile()?;
    tracing::info!("⚙️ sshgate targeting {}:{}", profile.target(), profile.port);

    let gateway = SshGateway::new(profile);
    let stager = Stager::new(&settings.runtime_dir);

    // ==============================================================================
    // 3. Dispatch
    // ==============================================================================
    let code = match command {
        RemoteCmd::Exec { command } => report_exec(&gateway.execute(&command.join(" ")).await),
        RemoteCmd::Archive { directory } => {
            let res = gateway.archive(&directory).await;
            report_archive(&stager, &directory, res).await?
        }
        RemoteCmd::Fetch { glob, since } => {
            let res = gateway.fetch(&glob, since).await;
            report_artifact(&stager, res).await?
        }
        RemoteCmd::Epoch => match gateway.remote_epoch().await {
            Ok(epoch) => {
                let human = chrono::DateTime::from_timestamp(epoch, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!("{} {}", epoch, human);
                ExitCode::SUCCESS
            }
            Err(res) => report_exec(&res),
        },
        RemoteCmd::Run { key } => {
            let Some(entry) = catalog.get(&key) else {
                eprintln!("Unknown command '{}'. Try `sshgate list`.", key);
                return Ok(ExitCode::from(2));
            };
            match entry.action.clone() {
                CommandAction::Exec(cmd) => report_exec(&gateway.execute(&cmd).await),
                CommandAction::Archive(dir) => {
                    let res = gateway.archive(&dir).await;
                    report_archive(&stager, &dir, res).await?
                }
                CommandAction::Fetch { glob, trigger: None } => {
                    let res = gateway.fetch(&glob, None).await;
                    report_artifact(&stager, res).await?
                }
                CommandAction::Fetch { glob, trigger: Some(trigger) } => {
                    let (exec, artifact) = gateway.trigger_and_fetch(&trigger, &glob).await;
                    match artifact {
                        Some(artifact) => {
                            if !exec.output.trim().is_empty() {
                                eprintln!("{}", exec.output.trim_end());
                            }
                            report_artifact(&stager, artifact).await?
                        }
                        None => report_exec(&exec),
                    }
                }
                CommandAction::Manual => match prompt_command().await? {
                    Some(cmd) => report_exec(&gateway.execute(&cmd).await),
                    None => {
                        eprintln!("Cancelled.");
                        ExitCode::SUCCESS
                    }
                },
            }
        }
    };

    Ok(code)
}
