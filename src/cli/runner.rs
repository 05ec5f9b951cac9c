//! CLI runner - executes commands

use crate::cdc::{
    ChangeEvent, ChangeEventIterator, DebeziumEnvelopeConverter, OffsetFieldTracker,
    ReplicationPosition,
};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{CdcConfig, WorkerSourceConfig};
use crate::error::{Error, Result, ResultExt};
use crate::protocol::Message;
use crate::source::{read_to_end, CdcSource, ResetStateEmitter, Source};
use crate::state::PersistedState;
use crate::types::JsonValue;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        match &self.cli.command {
            Commands::Reset { job_root } => {
                for message in self.reset(job_root).await? {
                    self.write_message(&mut out, &message)?;
                }
            }
            Commands::State => {
                let description = self.describe_state()?;
                self.write_value(&mut out, &description)?;
            }
            Commands::Replay {
                events,
                target,
                job_root,
            } => {
                for message in self.replay(events, *target, job_root).await? {
                    self.write_message(&mut out, &message)?;
                }
            }
        }
        Ok(())
    }

    /// Load the worker source config
    fn load_config(&self) -> Result<WorkerSourceConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Source config file not specified (use -C flag)"))?;
        WorkerSourceConfig::from_file(path)
    }

    /// Run a reset job to completion
    pub async fn reset(&self, job_root: &Path) -> Result<Vec<Message>> {
        let config = self.load_config()?;
        let mut source = ResetStateEmitter::new();
        source.start(&config, job_root).await?;

        let messages = read_to_end(&mut source).await?;
        source.close().await?;

        info!(messages = messages.len(), "Reset checkpoints emitted");
        Ok(messages)
    }

    /// Summarize the persisted state of the job
    pub fn describe_state(&self) -> Result<JsonValue> {
        let config = self.load_config()?;
        let Some(state) = PersistedState::from_blob(config.state_blob())? else {
            return Ok(json!({"stateType": null, "streams": [], "hasSharedState": false}));
        };

        let streams: Vec<_> = state
            .stream_states()
            .iter()
            .map(|s| json!({"stream": s.descriptor.to_string(), "hasState": !s.is_reset()}))
            .collect();
        let has_shared_state =
            matches!(&state, PersistedState::Global(global) if global.shared_state.is_some());

        Ok(json!({
            "stateType": state.state_type(),
            "streams": streams,
            "hasSharedState": has_shared_state,
        }))
    }

    /// Replay change events from a JSON lines file through a CDC source
    pub async fn replay(&self, events: &Path, target: i64, job_root: &Path) -> Result<Vec<Message>> {
        let config = self.load_config()?;
        let cdc = match &config.source_connection_configuration {
            Some(connection) => CdcConfig::from_connection_config(connection)?,
            None => CdcConfig::default(),
        };
        let captured = read_events(events).await?;
        debug!(events = captured.len(), "Loaded captured change events");

        let (tx, rx) = mpsc::channel(cdc.queue_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let producer_running = Arc::clone(&running);
        let producer = tokio::spawn(async move {
            for event in captured {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            producer_running.store(false, Ordering::Release);
        });

        let iterator = ChangeEventIterator::new(
            rx,
            OffsetFieldTracker::lsn(),
            ReplicationPosition::new(target),
            move || running.load(Ordering::Acquire),
            || debug!("Change event replay closed"),
            cdc.idle_wait,
        );
        let mut source = CdcSource::new(iterator, DebeziumEnvelopeConverter);
        source.start(&config, job_root).await?;

        let messages = read_to_end(&mut source).await;
        source.close().await?;
        producer
            .await
            .map_err(|e| anyhow::Error::new(e).context("Change event producer failed"))?;

        messages
    }

    fn write_message(&self, out: &mut impl Write, message: &Message) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => writeln!(out, "{}", message.to_json_line()?)?,
            OutputFormat::Pretty => writeln!(out, "{}", serde_json::to_string_pretty(message)?)?,
        }
        Ok(())
    }

    fn write_value(&self, out: &mut impl Write, value: &JsonValue) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => writeln!(out, "{value}")?,
            OutputFormat::Pretty => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
        }
        Ok(())
    }
}

/// Read one change event per non-empty line
async fn read_events(path: &Path) -> Result<Vec<ChangeEvent>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::config(format!(
            "Failed to read change events '{}': {}",
            path.display(),
            e
        ))
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<ChangeEvent>(line)
                .with_context(|| format!("Invalid change event on line {}", index + 1))
        })
        .collect()
}
