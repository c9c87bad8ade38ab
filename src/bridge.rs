//! Application-scoped wiring of the bridge components.
//!
//! [`BridgeSystem`] owns the one shared transport, the typed engine
//! client, the per-principal session registry and the flow catalog, and is
//! handed to request handlers by reference. There is no hidden global
//! state; everything is constructed here, once, from a [`BridgeConfig`].
//!
//! The canonical authentication model is a cached session per principal:
//! [`BridgeSystem::session_for`] reuses the registry entry when present
//! and establishes (and registers) a fresh session otherwise. Callers that
//! want a throwaway session can still use the lifecycle directly.

use crate::config::{BridgeConfig, ConfigError};
use crate::engine::{
    Credentials, EngineClient, EngineError, EngineSession, EngineTransport, HttpTransport,
    StartProcessOutcome,
};
use crate::flows::{FlowCatalog, FlowError};
use crate::registry::SessionRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Page size used when listing processes for flow resolution.
const RESOLUTION_PAGE_SIZE: u32 = 100;

/// Errors surfaced by the bridge's combined operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

pub struct BridgeSystem {
    client: EngineClient,
    registry: SessionRegistry,
    catalog: FlowCatalog,
    config: BridgeConfig,
}

impl BridgeSystem {
    /// Builds the system with the production HTTP transport.
    pub fn new(config: BridgeConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(
            config.engine_url.clone(),
            config.login_timeout,
            config.request_timeout,
        )?);
        Ok(Self::with_transport(config, transport)?)
    }

    /// Builds the system over an arbitrary transport (used by tests).
    pub fn with_transport(
        config: BridgeConfig,
        transport: Arc<dyn EngineTransport>,
    ) -> Result<Self, ConfigError> {
        let catalog = FlowCatalog::from_definitions(&config.flows)?;
        info!(
            engine_url = %config.engine_url,
            flows = catalog.len(),
            "bridge system initialized"
        );
        Ok(Self {
            client: EngineClient::new(transport),
            registry: SessionRegistry::new(),
            catalog,
            config,
        })
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &FlowCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the principal's registered session, establishing and
    /// registering a new one when absent. Concurrent callers may race to
    /// establish; login is idempotent per principal and the registry keeps
    /// whichever write lands last.
    pub async fn session_for(
        &self,
        credentials: Credentials,
    ) -> Result<EngineSession, EngineError> {
        if let Some(session) = self.registry.get(&credentials.username) {
            debug!(principal = %credentials.username, "reusing registered session");
            return Ok(session);
        }
        let session = self.client.lifecycle().establish(credentials).await?;
        self.registry.set(session.clone());
        Ok(session)
    }

    /// Stores a session back into the registry, replacing the principal's
    /// entry. Used after the executor refreshed a session in place so later
    /// callers pick up the new tokens.
    pub fn store(&self, session: &EngineSession) {
        self.registry.set(session.clone());
    }

    /// Terminates and deregisters the principal's session, if any.
    pub async fn release(&self, principal: &str) {
        if let Some(mut session) = self.registry.remove(principal) {
            self.client.lifecycle().terminate(&mut session).await;
        }
    }

    /// Starts the process behind a configured flow.
    ///
    /// A definition carrying an explicit process id goes straight to
    /// instantiation; otherwise the current process listing is fetched and
    /// resolved against the flow's criteria. An unknown slug fails before
    /// any upstream call is made.
    pub async fn start_flow(
        &self,
        session: &mut EngineSession,
        slug: &str,
        contract_inputs: Option<&Value>,
    ) -> Result<StartProcessOutcome, BridgeError> {
        let definition = self
            .catalog
            .get(slug)
            .ok_or_else(|| FlowError::NotDefined(slug.to_string()))?;

        let process_id = match &definition.process_id {
            Some(process_id) => process_id.clone(),
            None => {
                let processes = self
                    .client
                    .list_processes(session, 0, RESOLUTION_PAGE_SIZE, None)
                    .await?;
                self.catalog.resolve(slug, &processes)?
            }
        };

        info!(slug, process_id = %process_id, "starting flow instance");
        let outcome = self
            .client
            .start_process(session, &process_id, contract_inputs)
            .await?;
        Ok(outcome)
    }
}
