//! Async HTTP client for the hub firmware

use crate::endpoints;
use crate::types::{
    CapturedSignal, ClientError, FirmwareAck, HubStatus, RxInfo, SavedSlots, SendSignal,
    WifiStatus,
};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default total timeout per hub request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Name payload for the firmware slot endpoints
#[derive(Debug, Serialize)]
struct SlotName<'a> {
    name: &'a str,
}

/// Async client for a single hub
///
/// Cheap to clone; the underlying connection pool is shared. Requests are
/// not retried, callers decide how to handle failures.
#[derive(Debug, Clone)]
pub struct ExtenderClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ExtenderClient {
    /// Create a client for the hub at `host` (hostname or `host:port`).
    pub fn new(host: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: format!("http://{host}"),
            token,
        })
    }

    /// The base URL requests are issued against.
    #[must_use] pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, endpoint));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            status if !status.is_success() => {
                tracing::warn!("hub returned {} for {}", status, response.url().path());
                Err(ClientError::UnexpectedStatus(status))
            }
            _ => Ok(response.json().await?),
        }
    }

    /// Fetch the hub identity block.
    pub async fn status(&self) -> Result<HubStatus, ClientError> {
        self.execute(self.request(Method::GET, endpoints::STATUS))
            .await
    }

    /// Fetch station and access-point wifi details.
    pub async fn wifi_status(&self) -> Result<WifiStatus, ClientError> {
        self.execute(self.request(Method::GET, endpoints::WIFI_STATUS))
            .await
    }

    /// Fetch receiver counters.
    pub async fn rx_info(&self) -> Result<RxInfo, ClientError> {
        self.execute(self.request(Method::GET, endpoints::IR_RX_INFO))
            .await
    }

    /// Fetch firmware slot usage together with the saved signal names.
    pub async fn saved_slots(&self) -> Result<SavedSlots, ClientError> {
        self.execute(self.request(Method::GET, endpoints::IR_SAVED))
            .await
    }

    /// Fetch the most recent capture in the hub's receive buffer.
    pub async fn last_signal(&self) -> Result<CapturedSignal, ClientError> {
        self.execute(self.request(Method::GET, endpoints::IR_LAST))
            .await
    }

    /// Transmit a raw signal.
    pub async fn send_signal(&self, signal: &SendSignal) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .execute(self.request(Method::POST, endpoints::IR_SEND).json(signal))
            .await?;
        tracing::debug!(
            "sent signal: freq={} Hz, {} marks",
            signal.freq,
            signal.raw.len()
        );
        Ok(())
    }

    /// Arm the hub's capture window.
    pub async fn learn_start(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .execute(self.request(Method::POST, endpoints::IR_LEARN_START))
            .await?;
        Ok(())
    }

    /// Disarm the hub's capture window.
    pub async fn learn_stop(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .execute(self.request(Method::POST, endpoints::IR_LEARN_STOP))
            .await?;
        Ok(())
    }

    /// Save the hub's last capture into a named firmware slot.
    pub async fn save_last(&self, name: &str) -> Result<bool, ClientError> {
        let ack: FirmwareAck = self
            .execute(
                self.request(Method::POST, endpoints::IR_SAVE)
                    .json(&SlotName { name }),
            )
            .await?;
        Ok(ack.status == "saved")
    }

    /// Transmit the signal stored in a named firmware slot.
    pub async fn send_saved(&self, name: &str) -> Result<bool, ClientError> {
        let ack: FirmwareAck = self
            .execute(
                self.request(Method::POST, endpoints::IR_SEND_NAME)
                    .json(&SlotName { name }),
            )
            .await?;
        Ok(ack.status == "sent")
    }

    /// Delete a named firmware slot.
    pub async fn delete_saved(&self, name: &str) -> Result<bool, ClientError> {
        let ack: FirmwareAck = self
            .execute(
                self.request(Method::DELETE, endpoints::IR_DELETE)
                    .json(&SlotName { name }),
            )
            .await?;
        Ok(ack.status == "deleted")
    }

    /// Clear every firmware slot.
    pub async fn clear_saved(&self) -> Result<bool, ClientError> {
        let ack: FirmwareAck = self
            .execute(self.request(Method::POST, endpoints::IR_CLEAR))
            .await?;
        Ok(ack.status == "cleared")
    }
}
