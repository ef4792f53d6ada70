//! Runs one command script through all three runtime shapes and checks they
//! agree on the final state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use statefold_engine::{Actor, ActorRef, EffectHandler, EventSourced, HandleError, Interpreter, RenderLoop};
use statefold_events::{EventLog, MemoryEventLog};
use statefold_counter::{
    load_config, Counter, CounterCommand, CounterEffect, CounterEvent, DemoConfig, EventTally,
    TextView, TotalIncrements,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statefold-demo", about = "Drive the counter kernel through every runtime shape")]
struct Cli {
    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Commands: signed amounts (`3`, `-1`) or `reset`
    #[arg(allow_hyphen_values = true, default_values = ["3", "-1", "1", "reset", "1"])]
    commands: Vec<String>,
}

/// Logs effects; never yields feedback.
struct LogEffects;

#[async_trait]
impl Interpreter<Counter> for LogEffects {
    async fn interpret(&self, effect: CounterEffect) -> Result<Vec<CounterEvent>> {
        if effect != CounterEffect::None {
            tracing::debug!(?effect, "Render effect");
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl EffectHandler<Counter> for LogEffects {
    async fn handle(&self, effect: CounterEffect, me: &ActorRef<Counter>) -> Result<()> {
        if effect != CounterEffect::None {
            tracing::debug!(actor = me.name(), ?effect, "Actor effect");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading config");
            load_config(path)?
        }
        None => DemoConfig::default(),
    };
    let kernel = config.counter.kernel();

    let commands = cli
        .commands
        .iter()
        .map(|c| c.parse::<CounterCommand>())
        .collect::<Result<Vec<_>>>()?;

    // -- Event log -----------------------------------------------------------
    let log: Arc<MemoryEventLog<CounterEvent>> = Arc::new(MemoryEventLog::new());
    let mut sourced =
        EventSourced::from_log_with_config(kernel, log.clone(), config.engine.runtime.clone())
            .await?;

    for command in &commands {
        match sourced.handle(command).await {
            Ok(state) => tracing::info!(?command, count = state.count, "Command accepted"),
            Err(HandleError::Rejected(error)) => {
                tracing::warn!(?command, %error, "Command rejected")
            }
            Err(other) => {
                return Err(anyhow::Error::new(other).context("event log runtime failed"))
            }
        }
    }

    let events: Vec<CounterEvent> = log
        .read_all()
        .await?
        .into_iter()
        .map(|entry| entry.event)
        .collect();
    let rebuilt = sourced.rebuild().await?;
    anyhow::ensure!(&rebuilt == sourced.state(), "replay diverged from live state");

    // -- Render loop ---------------------------------------------------------
    let mut render = RenderLoop::with_config(kernel, TextView, LogEffects, config.engine.runtime.clone());
    render.start().await?;
    for event in &events {
        render.dispatch(*event).await?;
    }

    // -- Actor ---------------------------------------------------------------
    let actor = Actor::spawn_with_config(
        "counter",
        kernel,
        Some(Arc::new(LogEffects)),
        config.engine.clone(),
    );
    for event in &events {
        actor.tell(*event)?;
    }
    actor.drain().await?;
    let actor_state = actor.state();
    actor.stop().await?;

    let summary = serde_json::json!({
        "events": events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
        "log": sourced.state(),
        "render": render.state(),
        "actor": actor_state,
        "latest_view": render.views().latest(),
        "total_increments": sourced.project(&TotalIncrements).await?,
        "resets": sourced.project(&EventTally).await?.reset,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    anyhow::ensure!(
        sourced.state() == render.state() && render.state() == &actor_state,
        "runtime shapes disagree on the final state"
    );
    Ok(())
}
