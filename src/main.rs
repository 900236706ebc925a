use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use handoff::{
    ActionPayload, Activation, GatewayOutcome, Handoff, HandoffConfig, ListenerError,
    ProduceOutcome, RawActionEvent,
};

#[derive(Parser, Debug)]
#[command(name = "handoff", version, about = "Notification action handoff")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Slot file, overrides `store.path` from the config
    #[arg(long, global = true)]
    slot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a notification action, as the notification handler would
    Emit {
        #[arg(long)]
        reminder_id: Option<String>,
        #[arg(long)]
        action: Option<String>,
    },
    /// Run the gateway once, printing any delivered action as JSON
    Check {
        #[arg(long, value_enum, default_value_t = ActivationArg::CheckNow)]
        activation: ActivationArg,
    },
    /// Print the pending action, if any
    Peek,
    /// Drop the pending action
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActivationArg {
    ColdStart,
    Resume,
    CheckNow,
}

impl From<ActivationArg> for Activation {
    fn from(arg: ActivationArg) -> Self {
        match arg {
            ActivationArg::ColdStart => Activation::ColdStart,
            ActivationArg::Resume => Activation::Resume,
            ActivationArg::CheckNow => Activation::CheckNow,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HandoffConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HandoffConfig::default(),
    };
    if let Some(slot) = cli.slot {
        config.store.path = slot;
    }

    let handoff = Handoff::open(&config);

    match cli.command {
        Command::Emit {
            reminder_id,
            action,
        } => {
            // The emitting process never has the application attached.
            let outcome = handoff.handle_event(RawActionEvent {
                reminder_id,
                action,
            });
            if let ProduceOutcome::Discarded(reason) = outcome {
                tracing::info!(?reason, "event discarded");
            }
        }
        Command::Check { activation } => {
            handoff.attach(Arc::new(print_payload));
            match handoff.gateway().check(activation.into()) {
                GatewayOutcome::Empty => tracing::info!("nothing pending"),
                GatewayOutcome::Expired { age_ms } => {
                    tracing::info!(age_ms, "pending action expired")
                }
                GatewayOutcome::Delivered(_) => {}
            }
        }
        Command::Peek => {
            if let Some(pending) = handoff.pending() {
                let doc = serde_json::json!({
                    "reminderId": pending.reminder_id,
                    "action": pending.action.as_str(),
                    "createdAt": pending.created_at,
                });
                println!("{doc}");
            }
        }
        Command::Clear => handoff.discard_pending(),
    }

    Ok(())
}

fn print_payload(payload: &ActionPayload) -> Result<(), ListenerError> {
    let line = serde_json::to_string(payload).map_err(|e| ListenerError::new(e.to_string()))?;
    writeln!(io::stdout(), "{line}").map_err(|e| ListenerError::new(e.to_string()))
}
