//! Process-wide HTTP client, created on first use and released at shutdown.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kick_client::BROWSER_USER_AGENT;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lazily created shared `reqwest::Client`.
///
/// Clones share one slot. `reqwest::Client` is itself reference counted, so
/// requests already in flight keep their connection pool alive after
/// [`SharedHttp::release`].
#[derive(Debug, Clone, Default)]
pub struct SharedHttp {
    slot: Arc<Mutex<Option<reqwest::Client>>>,
}

impl SharedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared client, building it if needed.
    pub fn client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        tracing::debug!("Shared HTTP client created");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the shared client. The next [`SharedHttp::client`] call builds a new one.
    pub fn release(&self) -> bool {
        let released = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if released {
            tracing::info!("Shared HTTP client released");
        }
        released
    }

    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
