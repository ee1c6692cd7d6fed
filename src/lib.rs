//! Harbor Gate
//!
//! Governs a cargo ship on a game server: holds it in port while it is near
//! any departure-block zone, optionally pins its spawn point, keeps it level
//! with the tide, and draws the zones to operators who ask for a live view.
//!
//! ## Architecture
//!
//! ```text
//! HarborAgent  (agent.rs)        ← line-delimited host protocol, wall clock
//!   └── Harbor                   ← process root
//!         ├── SimHost  (sim.rs)  ← in-memory game host
//!         └── HarborService  (service.rs) ← host callbacks, timers, commands
//!               ├── EgressGate        (gate.rs)
//!               ├── TideTracker       (tide.rs)
//!               ├── ViewerBroadcast   (viewer.rs)
//!               ├── Settings + store  (settings.rs) → GeoZoneSet (zones.rs)
//!               └── TimerQueue        (scheduler.rs)
//! ```
//!
//! The core only talks to the game through [`host::Host`], so a real server
//! integration implements that trait and calls the `HarborService` entry
//! points from its hooks.

// Core modules are always available (no server feature needed).
pub mod command;
pub mod gate;
pub mod host;
pub mod messages;
pub mod protocol;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod sim;
pub mod tide;
pub mod types;
pub mod viewer;
pub mod water;
pub mod zones;

// The async runtime requires the `server` feature.
#[cfg(feature = "server")]
pub mod agent;

// Convenience re-exports
#[cfg(feature = "server")]
pub use agent::{Harbor, HarborAgent, HarborAgentConfig};
pub use host::{Host, HostError};
pub use service::{HarborService, HarborStats};
pub use settings::{ConfigStore, JsonFileStore, MemoryStore, Settings, StoreError};
pub use sim::SimHost;
pub use types::{Decision, EntityId, FeatureFlags, GateParameters, PlayerId, Vec3};
pub use zones::{GeoZoneSet, ZoneError};
