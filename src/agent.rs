//! HarborAgent – runs the service against the line-delimited host protocol.
//!
//! ## Tasks
//!
//! | Task    | Does                                                        |
//! |---------|-------------------------------------------------------------|
//! | reader  | parses one [`HostEvent`] per input line, dispatches it      |
//! | clock   | advances the service's virtual clock to wall time           |
//! | writer  | serialises every [`HostEffect`] as one output line          |
//!
//! Reader and clock share the [`Harbor`] behind one mutex and hold it for a
//! single callback at a time, so host callbacks never interleave.

use crate::protocol::{HostEffect, HostEvent};
use crate::service::HarborService;
use crate::sim::SimHost;
use crate::types::EntityId;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Harbor: service + simulated host
// ---------------------------------------------------------------------------

/// The process root: the service and the host it drives.
pub struct Harbor {
    pub service: HarborService,
    pub host: SimHost,
}

impl Harbor {
    pub fn new(service: HarborService, host: SimHost) -> Self {
        Self { service, host }
    }

    /// Apply an inbound event to the simulated world and route host
    /// callbacks to the service.
    pub fn handle(&mut self, event: HostEvent) {
        self.host.apply(&event);
        match event {
            HostEvent::EntitySpawned { entity, .. } => {
                self.service.on_entity_spawned(&mut self.host, entity)
            }
            HostEvent::EntityDestroyed { entity } => self.service.on_entity_destroyed(entity),
            HostEvent::EgressRequested { entity } => self.request_egress(entity),
            HostEvent::Command { player, args } => {
                if let Err(e) = self
                    .service
                    .on_command(&mut self.host, player, args.as_slice())
                {
                    debug!("Command from {} rejected: {}", player, e);
                }
            }
            _ => {}
        }
        self.pump_egress();
    }

    /// Fire due timers up to `now`.
    pub fn advance_to(&mut self, now: Duration) {
        self.service.advance_to(&mut self.host, now);
        self.pump_egress();
    }

    pub fn take_effects(&mut self) -> Vec<HostEffect> {
        self.host.take_effects()
    }

    fn request_egress(&mut self, entity: EntityId) {
        let decision = self.service.on_egress_requested(&mut self.host, entity);
        self.host.record(HostEffect::egress(entity, decision));
    }

    /// Restarted departures re-enter the gate, as the game's own egress
    /// entry point would.
    fn pump_egress(&mut self) {
        for entity in self.host.take_egress_requests() {
            self.request_egress(entity);
        }
    }
}

// ---------------------------------------------------------------------------
// Config for HarborAgent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HarborAgentConfig {
    /// How often the clock task advances the virtual clock.
    pub clock_resolution: Duration,
    /// Save unsaved settings on shutdown.
    pub autosave_on_unload: bool,
}

impl Default for HarborAgentConfig {
    fn default() -> Self {
        Self {
            clock_resolution: Duration::from_millis(100),
            autosave_on_unload: false,
        }
    }
}

// ---------------------------------------------------------------------------
// HarborAgent
// ---------------------------------------------------------------------------

pub struct HarborAgent {
    config: HarborAgentConfig,
    harbor: Arc<Mutex<Harbor>>,
}

impl HarborAgent {
    pub fn new(config: HarborAgentConfig, harbor: Arc<Mutex<Harbor>>) -> Self {
        Self { config, harbor }
    }

    /// Run until `input` ends or SIGINT.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_until(input, output, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
            info!("HarborAgent shutting down (SIGINT)");
        })
        .await
    }

    /// Run until `input` ends or `shutdown` resolves. Returns the output
    /// sink once every effect has been written.
    pub async fn run_until<R, W, F>(self, input: R, output: W, shutdown: F) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel::<HostEffect>();
        let writer = tokio::spawn(write_effects(rx, output));

        // -------------------------------------------------------------------
        // Clock task
        // -------------------------------------------------------------------

        let clock_harbor = self.harbor.clone();
        let clock_tx = tx.clone();
        let resolution = self.config.clock_resolution;
        let clock = tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            let mut timer = tokio::time::interval(resolution);
            loop {
                timer.tick().await;
                // Hold the lock only for the advance, then release before sending.
                let effects = {
                    let mut harbor = clock_harbor.lock();
                    harbor.advance_to(start.elapsed());
                    harbor.take_effects()
                };
                forward(&clock_tx, effects);
            }
        });

        // -------------------------------------------------------------------
        // Reader loop
        // -------------------------------------------------------------------

        info!("HarborAgent active – clock resolution {:?}", resolution);
        let mut lines = input.lines();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<HostEvent>(line) {
                            Ok(event) => {
                                let effects = {
                                    let mut harbor = self.harbor.lock();
                                    harbor.handle(event);
                                    harbor.take_effects()
                                };
                                forward(&tx, effects);
                            }
                            Err(e) => warn!("Skipping malformed event: {}", e),
                        }
                    }
                    Ok(None) => {
                        info!("Host input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read host input: {}", e);
                        break;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        // -------------------------------------------------------------------
        // Unload
        // -------------------------------------------------------------------

        clock.abort();
        let effects = {
            let mut guard = self.harbor.lock();
            let harbor = &mut *guard;
            if self.config.autosave_on_unload && harbor.service.is_dirty() {
                if let Err(e) = harbor.service.save() {
                    warn!("Autosave on unload failed: {}", e);
                }
            }
            harbor.service.shutdown(&mut harbor.host);
            info!("HarborAgent stopped: {:?}", harbor.service.stats());
            harbor.take_effects()
        };
        forward(&tx, effects);
        drop(tx);

        writer.await.context("Effect writer task failed")?
    }
}

fn forward(tx: &mpsc::UnboundedSender<HostEffect>, effects: Vec<HostEffect>) {
    for effect in effects {
        if tx.send(effect).is_err() {
            warn!("Effect writer gone, dropping effects");
            return;
        }
    }
}

/// Serialise each effect as one JSON line.
///
/// Serialisation errors are logged and swallowed; write errors end the task.
async fn write_effects<W>(mut rx: mpsc::UnboundedReceiver<HostEffect>, mut output: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(effect) = rx.recv().await {
        let mut line = match serde_json::to_vec(&effect) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialise effect: {}", e);
                continue;
            }
        };
        line.push(b'\n');
        output
            .write_all(&line)
            .await
            .context("Failed to write host effect")?;
    }
    output.flush().await.context("Failed to flush host output")?;
    Ok(output)
}
