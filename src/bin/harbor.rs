//! harbor-gate-server binary
//!
//! Plays the game host over stdin/stdout (one JSON message per line) and
//! drives the harbor core against a simulated world. Logs go to stderr.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                           | Default             | Description                        |
//! |-------------------------------|---------------------|------------------------------------|
//! | `HARBOR_CONFIG_PATH`          | `harbor-gate.json`  | Persisted zones and flags          |
//! | `HARBOR_SETTINGS`             | *(none)*            | TOML overriding the keys below     |
//! | `HARBOR_CLOCK_RESOLUTION_MS`  | `100`               | Timer clock resolution             |
//! | `HARBOR_WATER_LEVEL`          | `0.0`               | Initial sea level                  |
//! | `HARBOR_SEED`                 | `42`                | Offshore spawn point seed          |
//! | `HARBOR_AUTOSAVE`             | `false`             | Save unsaved settings on shutdown  |

use anyhow::{Context, Result};
use clap::Parser;
use harbor_gate::{
    agent::{Harbor, HarborAgent, HarborAgentConfig},
    service::HarborService,
    settings::JsonFileStore,
    sim::SimHost,
    water::TideLevel,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "harbor-gate-server", about = "Harbor Gate cargo ship control", version)]
struct Args {
    /// Persisted settings document (zones and flags)
    #[arg(long, env = "HARBOR_CONFIG_PATH", default_value = "harbor-gate.json")]
    config_path: PathBuf,

    /// Optional TOML file overriding the runtime options below
    #[arg(long, env = "HARBOR_SETTINGS")]
    settings: Option<PathBuf>,

    /// Timer clock resolution in milliseconds
    #[arg(long, env = "HARBOR_CLOCK_RESOLUTION_MS", default_value_t = 100)]
    clock_resolution_ms: u64,

    /// Initial sea level
    #[arg(long, env = "HARBOR_WATER_LEVEL", default_value_t = 0.0)]
    water_level: f32,

    /// Seed for generated offshore spawn points
    #[arg(long, env = "HARBOR_SEED", default_value_t = 42)]
    seed: u32,

    /// Save unsaved settings on shutdown
    #[arg(long, env = "HARBOR_AUTOSAVE", default_value_t = false)]
    autosave_on_unload: bool,
}

/// Runtime options after layering the TOML file over the CLI/env values.
#[derive(Debug, Deserialize)]
struct RuntimeOptions {
    config_path: PathBuf,
    clock_resolution_ms: u64,
    water_level: f32,
    seed: u32,
    autosave_on_unload: bool,
}

impl Args {
    fn resolve(self) -> Result<RuntimeOptions> {
        let mut builder = config::Config::builder()
            .set_default("config_path", self.config_path.to_string_lossy().into_owned())?
            .set_default("clock_resolution_ms", self.clock_resolution_ms as i64)?
            .set_default("water_level", f64::from(self.water_level))?
            .set_default("seed", i64::from(self.seed))?
            .set_default("autosave_on_unload", self.autosave_on_unload)?;

        if let Some(path) = &self.settings {
            builder = builder.add_source(
                config::File::from(path.as_path()).format(config::FileFormat::Toml),
            );
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize::<RuntimeOptions>())
            .context("Invalid runtime settings")
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging; stdout carries the host protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("harbor_gate=debug".parse()?),
        )
        .init();

    let options = Args::parse().resolve()?;

    tracing::info!(
        config_path = %options.config_path.display(),
        water_level = options.water_level,
        seed = options.seed,
        "Starting harbor-gate-server"
    );

    let mut host = SimHost::new(TideLevel::flat(options.water_level), u64::from(options.seed));
    let store = JsonFileStore::new(&options.config_path);
    let service = HarborService::load(Box::new(store), &mut host).with_context(|| {
        format!("Failed to load settings from {}", options.config_path.display())
    })?;

    let harbor = Arc::new(Mutex::new(Harbor::new(service, host)));
    let agent_config = HarborAgentConfig {
        clock_resolution: Duration::from_millis(options.clock_resolution_ms.max(1)),
        autosave_on_unload: options.autosave_on_unload,
    };

    // Run until stdin closes or SIGINT
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    HarborAgent::new(agent_config, harbor)
        .run(input, tokio::io::stdout())
        .await?;
    Ok(())
}
