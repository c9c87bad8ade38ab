//! # Flowbridge
//!
//! A bridge between client applications and a Bonita-compatible
//! business-process engine. The crate adds what the engine's raw HTTP API
//! leaves to every caller: session and anti-forgery-token management,
//! resilient request execution with a bounded retry on expiry, a
//! concurrency-safe per-principal session registry, and a mapping from
//! business-level "flow" names to the engine's process identifiers.
//!
//! ## Architecture Overview
//!
//! - **[`engine`]**: session lifecycle, the bounded-retry request executor,
//!   typed API operations and the transport seam they are written against
//! - **[`registry`]**: concurrent principal → session map (last login wins)
//! - **[`flows`]**: configured flow catalog and flow → process resolution
//! - **[`bridge`]**: application-scoped wiring of all of the above
//! - **[`config`]**: TOML discovery hierarchy with environment overrides
//!
//! The bridge forwards operations; it implements no process semantics of
//! its own. Task routing, workflow state and contract validation all stay
//! upstream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowbridge::{BridgeSystem, ConfigDiscovery, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigDiscovery::load()?;
//!     let bridge = BridgeSystem::new(config)?;
//!
//!     let credentials = Credentials::new("walter.bates", "bpm");
//!     let mut session = bridge.session_for(credentials).await?;
//!
//!     let outcome = bridge.start_flow(&mut session, "invoice-approval", None).await?;
//!     println!("started case {}", outcome.case_id);
//!     Ok(())
//! }
//! ```

/// Upstream engine integration: sessions, request execution, typed API.
pub mod engine;

/// Concurrency-safe registry of active sessions, keyed by principal.
pub mod registry;

/// Flow definitions and flow → process resolution.
pub mod flows;

/// Application-scoped wiring of transport, client, registry and catalog.
pub mod bridge;

/// Configuration discovery and loading.
pub mod config;

/// Environment variable names and configuration file constants.
pub mod env;

/// Command line interface.
pub mod cli;

pub use bridge::{BridgeError, BridgeSystem};
pub use config::{BridgeConfig, BridgeConfigFile, ConfigDiscovery, ConfigError};
pub use engine::{
    CaseDescriptor, CaseVariable, CaseWithVariables, Credentials, EngineClient, EngineError,
    EngineSession, EngineTransport, FailureKind, HttpTransport, ProcessDescriptor,
    RequestExecutor, SessionLifecycle, StartProcessOutcome, TaskDescriptor, TaskFilter,
};
pub use flows::{FlowCatalog, FlowDefinition, FlowError};
pub use registry::SessionRegistry;
