use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hipchat_notifier::config::{Settings, SharedSettings};
use hipchat_notifier::format::MarkupRenderer;
use hipchat_notifier::hooks::{ReceiveHook, TicketHook};
use hipchat_notifier::notify::{Notifier, SendOutcome};
use hipchat_notifier::server::{AppState, build_router};
use hipchat_notifier::types::Notification;

#[derive(Debug, Parser)]
#[command(name = "hipchat-notifier", version, about = "Post git and ticket activity to HipChat")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "HIPCHAT_NOTIFIER_CONFIG", default_value = "hipchat-notifier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept push and ticket events over HTTP.
    Serve,

    /// Post a test message and wait for the result.
    Test {
        /// Destination room; the default room when omitted.
        room: Option<String>,
    },

    /// Queue a message for a room.
    #[command(alias = "post")]
    Send {
        /// Destination room; the default room when omitted.
        room: Option<String>,

        /// Message text, or `-` to read it from stdin.
        #[arg(short, long, value_name = "-|MESSAGE")]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hipchat_notifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let settings = SharedSettings::new(settings);
    let notifier = Notifier::new(settings.clone())?;

    let result = match cli.command {
        Command::Serve => serve(cli.config, settings, notifier.clone()).await,
        Command::Test { room } => test_message(&notifier, room).await,
        Command::Send { room, message } => {
            let message = read_message(message)?;
            notifier.send_async(Notification::text(message).with_room(room));
            Ok(())
        }
    };

    notifier.shutdown().await;
    result
}

async fn serve(config: PathBuf, settings: SharedSettings, notifier: Notifier) -> Result<()> {
    let snapshot = settings.snapshot();
    let renderer = Arc::new(MarkupRenderer::from_settings(&snapshot.bugtraq));
    let sink = Arc::new(notifier);

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(config, settings.clone(), renderer.clone()));
    #[cfg(not(unix))]
    let _ = config;

    let receive_hook = ReceiveHook::new(settings.clone(), sink.clone());
    let ticket_hook = TicketHook::new(settings.clone(), sink, renderer);
    let app = build_router(AppState::new(settings, receive_hook, ticket_hook));

    let addr = snapshot.server.listen;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Re-reads the config file on every SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(path: PathBuf, settings: SharedSettings, renderer: Arc<MarkupRenderer>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(hangups) => hangups,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGHUP; configuration reload disabled");
            return;
        }
    };
    while hangups.recv().await.is_some() {
        match settings.reload(&path) {
            Ok(reloaded) => {
                renderer.reload(&reloaded.bugtraq);
                info!(path = %path.display(), "Reloaded configuration");
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Reload failed; keeping current configuration");
            }
        }
    }
}

async fn test_message(notifier: &Notifier, room: Option<String>) -> Result<()> {
    let notification = Notification::text("Test message sent from hipchat-notifier").with_room(room);
    match notifier.send(&notification).await? {
        SendOutcome::Delivered => {
            info!("test message delivered");
            Ok(())
        }
        SendOutcome::Rejected { status, response_body, .. } => {
            bail!("HipChat rejected the test message ({status}): {response_body}")
        }
    }
}

fn read_message(message: String) -> Result<String> {
    if message != "-" {
        return Ok(message);
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading message from stdin")?;
    Ok(text.trim_end().to_string())
}
