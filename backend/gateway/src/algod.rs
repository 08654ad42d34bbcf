//! Algod REST client: reads application boxes and global state, and fetches
//! suggested transaction parameters.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the node rate-limits us or the
//!   connection fails, up to [`MAX_BACKOFF_SECS`] seconds between tries and
//!   [`MAX_ATTEMPTS`] tries in total.
//! * Any other error response is returned immediately.
//! * A 404 is only read as "absent" for a box when algod says the box is
//!   missing; any other 404 is an error.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use bounty_board::{BoardError, GlobalState, GlobalValue, LedgerReader, ParamsSource, SuggestedParams};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{GatewayError, Result};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_ATTEMPTS: u32 = 5;
/// Rounds a built transaction stays valid for.
const VALIDITY_WINDOW: u64 = 1000;
/// Message algod returns with a 404 for an absent box. Any other 404 (unknown
/// application, wrong base path) is an error.
const BOX_NOT_FOUND: &str = "box not found";

// ─────────────────────────────────────────────────────────
// REST response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BoxResponse {
    /// Base64 box contents
    pub value: String,
    #[allow(dead_code)]
    pub round: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationResponse {
    pub params: ApplicationParams,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationParams {
    #[serde(rename = "global-state", default)]
    pub global_state: Vec<TealKeyValue>,
}

#[derive(Debug, Deserialize)]
pub struct TealKeyValue {
    /// Base64 key
    pub key: String,
    pub value: TealValue,
}

#[derive(Debug, Deserialize)]
pub struct TealValue {
    /// 1 = bytes, 2 = uint
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub bytes: String,
    #[serde(default)]
    pub uint: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransactionParamsResponse {
    pub fee: u64,
    #[serde(rename = "min-fee")]
    pub min_fee: u64,
    #[serde(rename = "last-round")]
    pub last_round: u64,
    #[serde(rename = "genesis-id")]
    pub genesis_id: String,
    #[serde(rename = "genesis-hash")]
    pub genesis_hash: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AlgodClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff: Duration,
}

impl AlgodClient {
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Self {
        AlgodClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
        }
    }

    /// Shorten the first retry delay (tests).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Fetch box `name` of application `app_id`; `None` when algod reports
    /// the box itself as missing.
    pub async fn get_box(&self, app_id: u64, name: &[u8]) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/v2/applications/{app_id}/box", self.base_url);
        let name_param = format!("b64:{}", B64.encode(name));
        let body: BoxResponse = match self
            .get_json(|| self.client.get(&url).query(&[("name", name_param.as_str())]))
            .await
        {
            Ok(body) => body,
            Err(GatewayError::NotFound(message)) if message.contains(BOX_NOT_FOUND) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        let value = B64
            .decode(body.value.as_bytes())
            .map_err(|e| GatewayError::Algod(format!("box value is not base64: {e}")))?;
        debug!("Fetched box {} ({} bytes)", hex::encode(name), value.len());
        Ok(Some(value))
    }

    pub async fn get_global_state(&self, app_id: u64) -> Result<GlobalState> {
        let url = format!("{}/v2/applications/{app_id}", self.base_url);
        let app: ApplicationResponse = self.get_json(|| self.client.get(&url)).await?;
        decode_global_state(&app.params.global_state)
    }

    pub async fn get_suggested_params(&self) -> Result<SuggestedParams> {
        let url = format!("{}/v2/transactions/params", self.base_url);
        let p: TransactionParamsResponse = self.get_json(|| self.client.get(&url)).await?;
        Ok(SuggestedParams {
            fee: p.fee,
            min_fee: p.min_fee,
            first_valid: p.last_round,
            last_valid: p.last_round + VALIDITY_WINDOW,
            genesis_id: p.genesis_id,
            genesis_hash: p.genesis_hash,
        })
    }

    /// GET with back-off. A 404 comes back as [`GatewayError::NotFound`].
    async fn get_json<T, F>(&self, request: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let mut req = request();
            if let Some(token) = &self.token {
                req = req.header("X-Algo-API-Token", token);
            }

            match req.send().await {
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("Algod request failed (will retry in {backoff:?}): {e}");
                }
                Err(e) => return Err(e.into()),
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                        warn!("Rate-limited by algod (will retry in {backoff:?})");
                    } else if !status.is_success() {
                        let message = resp
                            .json::<ErrorBody>()
                            .await
                            .map(|b| b.message)
                            .unwrap_or_default();
                        if status == StatusCode::NOT_FOUND {
                            return Err(GatewayError::NotFound(message));
                        }
                        return Err(GatewayError::Algod(format!("{status}: {message}")));
                    } else {
                        let bytes = resp.bytes().await?;
                        return Ok(serde_json::from_slice(&bytes)?);
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(Duration::from_secs(MAX_BACKOFF_SECS));
            attempt += 1;
        }
    }
}

fn decode_global_state(entries: &[TealKeyValue]) -> Result<GlobalState> {
    let mut state = GlobalState::new();
    for entry in entries {
        let key = B64
            .decode(entry.key.as_bytes())
            .map_err(|e| GatewayError::Algod(format!("global-state key is not base64: {e}")))?;
        let value = match entry.value.kind {
            2 => GlobalValue::Uint(entry.value.uint),
            _ => GlobalValue::Bytes(B64.decode(entry.value.bytes.as_bytes()).map_err(|e| {
                GatewayError::Algod(format!("global-state value is not base64: {e}"))
            })?),
        };
        state.insert(key, value);
    }
    Ok(state)
}

#[async_trait]
impl LedgerReader for AlgodClient {
    async fn read_box(&self, app_id: u64, name: &[u8]) -> bounty_board::Result<Option<Vec<u8>>> {
        self.get_box(app_id, name).await.map_err(BoardError::from)
    }

    async fn read_global_state(&self, app_id: u64) -> bounty_board::Result<GlobalState> {
        self.get_global_state(app_id).await.map_err(BoardError::from)
    }
}

#[async_trait]
impl ParamsSource for AlgodClient {
    async fn suggested_params(&self) -> bounty_board::Result<SuggestedParams> {
        self.get_suggested_params().await.map_err(BoardError::from)
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
