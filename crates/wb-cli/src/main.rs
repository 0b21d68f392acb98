//! webview-bridge CLI
//!
//! Attaches to a Tauri application running the MCP bridge plugin, runs one
//! command and prints the result as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wb_client::commands::{ImageFormat, ScriptKind};
use webview_bridge::commands::{self, BridgeSession};
use webview_bridge::output::print_error;
use webview_bridge::settings::{self, Overrides};

#[derive(Parser)]
#[command(name = "webview-bridge")]
#[command(author, version, about = "Drive Tauri applications through the MCP bridge plugin")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Application host (overrides config and environment)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Application port; disables discovery
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Command timeout in milliseconds
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and report what was found
    Status,

    /// List bridge instances listening in the discovery port range
    Discover {
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },

    /// Show geometry and state of a window
    WindowInfo {
        /// Window label (defaults to the main window)
        #[arg(short, long)]
        window: Option<String>,
    },

    /// Show application metadata, environment and windows
    BackendState,

    /// List all webview windows
    ListWindows {
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },

    /// Invoke a Tauri command
    Invoke {
        /// Command name
        command: String,
        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Emit an application event
    Emit {
        /// Event name
        event: String,
        /// Payload as JSON
        #[arg(long)]
        payload: Option<String>,
    },

    /// Evaluate JavaScript in a window
    ExecJs {
        /// Script source
        script: String,
        /// Window label
        #[arg(short, long)]
        window: Option<String>,
    },

    /// Capture a window as an image data URL
    Screenshot {
        /// png or jpeg
        #[arg(short, long, default_value = "png")]
        format: ImageFormat,
        /// JPEG quality, 0-100
        #[arg(long)]
        quality: Option<u8>,
        /// Window label
        #[arg(short, long)]
        window: Option<String>,
    },

    /// IPC monitoring
    Ipc {
        #[command(subcommand)]
        action: IpcAction,
    },

    /// Scripts injected on every page load
    Scripts {
        #[command(subcommand)]
        action: ScriptsAction,
    },

    /// Print broadcast events as JSON lines until interrupted
    Watch {
        /// Exit after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum IpcAction {
    /// Start capturing IPC calls
    Start,
    /// Stop capturing IPC calls
    Stop,
    /// Show captured IPC calls
    Events {
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },
}

#[derive(Subcommand)]
enum ScriptsAction {
    /// List registered scripts
    List {
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Register a script
    Add {
        /// Script id
        id: String,
        /// inline or url
        kind: ScriptKind,
        /// Source or URL
        content: String,
        /// Window label
        #[arg(short, long)]
        window: Option<String>,
    },
    /// Remove a registered script
    Remove {
        /// Script id
        id: String,
        /// Window label
        #[arg(short, long)]
        window: Option<String>,
    },
    /// Remove every registered script
    Clear {
        /// Window label
        #[arg(short, long)]
        window: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Show config file path
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        host: cli.host,
        port: cli.port,
        timeout_ms: cli.timeout,
    };
    let config_path = cli.config.as_deref();

    // Commands that never touch an application
    match &cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => {
                    commands::config_show(&settings::resolve(config_path, &overrides)?)
                }
                ConfigAction::Get { key } => {
                    commands::config_get(&settings::resolve(config_path, &overrides)?, key)
                }
                ConfigAction::Path => commands::config_path(config_path),
                ConfigAction::Init { force } => commands::config_init(config_path, *force),
            };
        }
        Commands::Discover { table } => {
            let config = settings::resolve(config_path, &overrides)?;
            return commands::discover_command(&config, *table).await;
        }
        _ => {}
    }

    let config = settings::resolve(config_path, &overrides)?;
    let session = BridgeSession::open(config).await;
    let result = execute(&session, cli.command).await;
    session.close().await;
    result
}

async fn execute(session: &BridgeSession, command: Commands) -> Result<()> {
    if let Commands::Status = command {
        return commands::status_command(session).await;
    }

    let bridge = session.attached()?;
    match command {
        Commands::WindowInfo { window } => {
            commands::window_info_command(bridge, window.as_deref()).await
        }
        Commands::BackendState => commands::backend_state_command(bridge).await,
        Commands::ListWindows { table } => commands::list_windows_command(bridge, table).await,
        Commands::Invoke { command, args } => {
            commands::invoke_command(bridge, &command, args.as_deref()).await
        }
        Commands::Emit { event, payload } => {
            commands::emit_command(bridge, &event, payload.as_deref()).await
        }
        Commands::ExecJs { script, window } => {
            commands::exec_js_command(bridge, &script, window.as_deref()).await
        }
        Commands::Screenshot {
            format,
            quality,
            window,
        } => commands::screenshot_command(bridge, format, quality, window).await,
        Commands::Ipc { action } => match action {
            IpcAction::Start => commands::ipc_start_command(bridge).await,
            IpcAction::Stop => commands::ipc_stop_command(bridge).await,
            IpcAction::Events { table } => commands::ipc_events_command(bridge, table).await,
        },
        Commands::Scripts { action } => match action {
            ScriptsAction::List { table } => commands::scripts_list_command(bridge, table).await,
            ScriptsAction::Add {
                id,
                kind,
                content,
                window,
            } => {
                commands::scripts_add_command(bridge, &id, kind, &content, window.as_deref())
                    .await
            }
            ScriptsAction::Remove { id, window } => {
                commands::scripts_remove_command(bridge, &id, window.as_deref()).await
            }
            ScriptsAction::Clear { window } => {
                commands::scripts_clear_command(bridge, window.as_deref()).await
            }
        },
        Commands::Watch { count } => commands::watch_command(bridge, count).await,
        Commands::Status | Commands::Discover { .. } | Commands::Config { .. } => Ok(()),
    }
}
