//! Connection service
//!
//! Owns the single live store handle shared by every adapter. Adapters
//! ask for the handle on every operation, so the connection can be
//! reloaded or stopped without recreating them.
//!
//! `start` and `reload` connect and probe with `ping` before the new
//! handle is published. A failed probe closes the new handle and leaves
//! the service as it was; nothing is raised to the caller.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::handle::DocumentStore;
use super::memory::MemoryServer;
use crate::config::{ConfigError, ConfigResult};
use crate::observability::{log_event_with_fields, Event};

/// Scheme served by `MemoryConnector`
pub const MEMORY_SCHEME: &str = "memory://";

/// Where the document store lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Store URL (default: "memory://localhost/")
    #[serde(default = "default_url")]
    pub url: String,

    /// Database name (default: "docdao")
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_url() -> String {
    "memory://localhost/".to_string()
}

fn default_database() -> String {
    "docdao".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
        }
    }
}

impl ConnectionConfig {
    /// Check required values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::invalid("connection.url", "must not be empty"));
        }
        if !self.url.contains("://") {
            return Err(ConfigError::invalid(
                "connection.url",
                format!("'{}' has no scheme", redact_url(&self.url)),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::invalid("connection.database", "must not be empty"));
        }
        Ok(())
    }
}

/// URL with any `user:password@` part removed, for logging
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***@{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Opens store handles
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> StoreResult<Arc<dyn DocumentStore>>;
}

/// Connects to a shared `MemoryServer`
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    server: MemoryServer,
}

impl MemoryConnector {
    pub fn new(server: MemoryServer) -> Self {
        Self { server }
    }

    /// The server connections are opened against
    pub fn server(&self) -> &MemoryServer {
        &self.server
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, config: &ConnectionConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        if !config.url.starts_with(MEMORY_SCHEME) {
            return Err(StoreError::InvalidUrl(redact_url(&config.url)));
        }
        let conn = self.server.connect(&config.database)?;
        Ok(Arc::new(conn))
    }
}

enum ConnectionState {
    /// Never started; the first `handle` call starts lazily
    Idle,
    Up(Arc<dyn DocumentStore>),
    /// Last start failed
    Down(String),
    Stopped,
}

/// Lifecycle owner of the shared store handle
pub struct ConnectionService {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    state: RwLock<ConnectionState>,
}

impl ConnectionService {
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            state: RwLock::new(ConnectionState::Idle),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connect and probe. On failure the service is down; not raised.
    pub fn start(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let ConnectionState::Up(_) = &*state {
            return;
        }
        *state = match self.establish() {
            Ok(handle) => ConnectionState::Up(handle),
            Err(e) => ConnectionState::Down(e.to_string()),
        };
    }

    /// Swap in a fresh connection once it is confirmed live, then close
    /// the previous one. If the new connection fails the old one stays.
    pub fn reload(&self) {
        let handle = match self.establish() {
            Ok(handle) => handle,
            Err(_) => return,
        };

        let previous = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, ConnectionState::Up(handle))
        };

        if let ConnectionState::Up(old) = previous {
            old.close();
            log_event_with_fields(
                Event::ConnectionReloaded,
                &[("database", &self.config.database)],
            );
        }
    }

    /// Close the active connection unconditionally
    pub fn stop(&self) {
        let previous = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, ConnectionState::Stopped)
        };
        if let ConnectionState::Up(old) = previous {
            old.close();
        }
        log_event_with_fields(
            Event::ConnectionStopped,
            &[("database", &self.config.database)],
        );
    }

    /// True while a probed connection is held
    pub fn is_up(&self) -> bool {
        matches!(
            &*self.state.read().unwrap_or_else(|e| e.into_inner()),
            ConnectionState::Up(_)
        )
    }

    /// The live handle. `collection` names the caller's collection for
    /// error context. Starts the service on first use.
    pub fn handle(&self, collection: &str) -> StoreResult<Arc<dyn DocumentStore>> {
        {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            match &*state {
                ConnectionState::Up(handle) => return Ok(Arc::clone(handle)),
                ConnectionState::Down(reason) => {
                    return Err(StoreError::NotConnected(format!(
                        "{} ({}): {}",
                        self.config.database, collection, reason
                    )))
                }
                ConnectionState::Stopped => {
                    return Err(StoreError::NotConnected(format!(
                        "{} ({}): stopped",
                        self.config.database, collection
                    )))
                }
                ConnectionState::Idle => {}
            }
        }

        self.start();
        match &*self.state.read().unwrap_or_else(|e| e.into_inner()) {
            ConnectionState::Up(handle) => Ok(Arc::clone(handle)),
            _ => Err(StoreError::NotConnected(format!(
                "{} ({}): start failed",
                self.config.database, collection
            ))),
        }
    }

    fn establish(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        let url = redact_url(&self.config.url);

        let handle = match self.connector.connect(&self.config) {
            Ok(handle) => handle,
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::ConnectionDown,
                    &[("error", &message), ("url", &url)],
                );
                return Err(e);
            }
        };

        if let Err(e) = handle.ping() {
            handle.close();
            let message = e.to_string();
            log_event_with_fields(Event::ConnectionDown, &[("error", &message), ("url", &url)]);
            return Err(e);
        }

        log_event_with_fields(
            Event::ConnectionUp,
            &[("database", &self.config.database), ("url", &url)],
        );
        Ok(handle)
    }
}
