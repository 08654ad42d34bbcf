//! Application configuration loaded from environment variables.

use bounty_board::{Address, ContractInfo};

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Algod REST endpoint (e.g. https://testnet-api.algonode.cloud)
    pub algod_url: String,
    /// Sent as `X-Algo-API-Token` when set
    pub algod_token: Option<String>,
    /// The deployed BountyBoard application
    pub contract: ContractInfo,
    /// Port for the REST API server
    pub api_port: u16,
    /// Box reads in flight while listing tasks
    pub listing_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            algod_url: env_var("ALGOD_URL")
                .unwrap_or_else(|_| "https://testnet-api.algonode.cloud".to_string()),
            algod_token: env_var("ALGOD_TOKEN").ok().filter(|t| !t.is_empty()),
            contract: contract_from_env()?,
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| GatewayError::Config("Invalid API_PORT".to_string()))?,
            listing_concurrency: env_var("LISTING_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .map_err(|_| GatewayError::Config("Invalid LISTING_CONCURRENCY".to_string()))?,
        })
    }
}

/// `CONTRACT_JSON` (deployment artifact) wins over `APP_ID` / `APP_ADDRESS` / `NETWORK`.
fn contract_from_env() -> Result<ContractInfo> {
    if let Ok(path) = env_var("CONTRACT_JSON") {
        return Ok(ContractInfo::from_json_file(path)?);
    }

    let app_id = env_var("APP_ID")
        .map_err(|_| {
            GatewayError::Config("APP_ID or CONTRACT_JSON environment variable is required".to_string())
        })?
        .parse()
        .map_err(|_| GatewayError::Config("Invalid APP_ID".to_string()))?;
    let app_address: Address = env_var("APP_ADDRESS")?
        .parse()
        .map_err(|e| GatewayError::Config(format!("Invalid APP_ADDRESS: {e}")))?;
    let network = env_var("NETWORK").unwrap_or_else(|_| "testnet".to_string());

    Ok(ContractInfo {
        app_id,
        app_address,
        network,
    })
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| GatewayError::Config(format!("Missing env var: {key}")))
}
