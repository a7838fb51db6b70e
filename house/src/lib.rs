use blackjack_house_client::RetryPolicy;
use blackjack_house_types::{ObjectId, DEFAULT_GAS_BUDGET, DEFAULT_MODULE};
use commonware_utils::{from_hex_formatted, hex};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;
use url::Url;

pub mod contract;
pub mod defaults;
mod error;
mod fields;
pub mod keys;
pub mod ledger;
pub mod matcher;
pub mod oracle;
pub mod reader;
pub mod signer;
pub mod submitter;

pub use error::{Error, Result};

use contract::Contract;
use keys::{AdminKeypair, KeyError};
use oracle::OracleConfig;
use signer::HouseKey;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn from_hex_formatted(value: &str) -> Option<Self> {
        from_hex_formatted(value).map(Self)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// Configuration for the [oracle::HouseOracle] and its ledger connections.
#[derive(Deserialize, Serialize)]
pub struct Config {
    pub rpc_url: String,
    #[serde(default)]
    pub sponsor_url: Option<String>,

    pub package_address: String,
    #[serde(default = "default_module_name")]
    pub module_name: String,
    pub house_data_id: String,

    pub admin_secret_key: HexBytes,
    pub house_bls_secret_key: HexBytes,

    #[serde(default = "default_gas_budget")]
    pub gas_budget: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
    #[serde(default)]
    pub retry_non_idempotent: bool,
    #[serde(default = "default_owned_objects_page_size")]
    pub owned_objects_page_size: usize,
    #[serde(default = "default_transaction_wait_timeout_ms")]
    pub transaction_wait_timeout_ms: u64,
    #[serde(default = "default_transaction_poll_interval_ms")]
    pub transaction_poll_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field} is not a valid object id: {value}")]
    InvalidObjectId {
        field: &'static str,
        value: String,
        #[source]
        source: blackjack_house_types::ObjectIdError,
    },
    #[error("{field} is invalid: {source}")]
    InvalidKey {
        field: &'static str,
        #[source]
        source: KeyError,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} must be a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} URL scheme must be http or https: {value}")]
    InvalidUrlScheme { field: &'static str, value: String },
    #[error("module_name must be a Move identifier: {value}")]
    InvalidModuleName { value: String },
    #[error("retry_max_backoff_ms ({max}) must be >= retry_initial_backoff_ms ({initial})")]
    InvalidBackoff { initial: u64, max: u64 },
}

/// A [Config] whose keys are decoded and whose values are checked.
pub struct ValidatedConfig {
    pub rpc_url: String,
    pub sponsor_url: Option<String>,
    pub contract: Contract,
    pub house_data_id: ObjectId,
    pub admin: AdminKeypair,
    pub house_key: HouseKey,
    pub gas_budget: u64,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub owned_objects_page_size: usize,
    pub transaction_wait_timeout: Duration,
    pub transaction_poll_interval: Duration,
}

impl ValidatedConfig {
    /// Split off the part of the configuration the oracle itself consumes.
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            contract: self.contract.clone(),
            house_data_id: self.house_data_id,
            gas_budget: self.gas_budget,
            house_key: self.house_key.clone(),
            admin: self.admin.clone(),
        }
    }
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field("rpc_url", &cfg.rpc_url)
            .field("sponsor_url", &cfg.sponsor_url)
            .field("package_address", &cfg.package_address)
            .field("module_name", &cfg.module_name)
            .field("house_data_id", &cfg.house_data_id)
            .field("admin_secret_key", &"<redacted>")
            .field("house_bls_secret_key", &"<redacted>")
            .field("gas_budget", &cfg.gas_budget)
            .field("log_level", &cfg.log_level)
            .field("request_timeout_ms", &cfg.request_timeout_ms)
            .field("retry_max_attempts", &cfg.retry_max_attempts)
            .field("retry_initial_backoff_ms", &cfg.retry_initial_backoff_ms)
            .field("retry_max_backoff_ms", &cfg.retry_max_backoff_ms)
            .field("retry_non_idempotent", &cfg.retry_non_idempotent)
            .field("owned_objects_page_size", &cfg.owned_objects_page_size)
            .field(
                "transaction_wait_timeout_ms",
                &cfg.transaction_wait_timeout_ms,
            )
            .field(
                "transaction_poll_interval_ms",
                &cfg.transaction_poll_interval_ms,
            )
            .finish()
    }
}

fn default_module_name() -> String {
    DEFAULT_MODULE.to_string()
}

fn default_gas_budget() -> u64 {
    DEFAULT_GAS_BUDGET
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    defaults::DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_retry_max_attempts() -> usize {
    defaults::DEFAULT_RETRY_MAX_ATTEMPTS
}

fn default_retry_initial_backoff_ms() -> u64 {
    defaults::DEFAULT_RETRY_INITIAL_BACKOFF_MS
}

fn default_retry_max_backoff_ms() -> u64 {
    defaults::DEFAULT_RETRY_MAX_BACKOFF_MS
}

fn default_owned_objects_page_size() -> usize {
    defaults::DEFAULT_OWNED_OBJECTS_PAGE_SIZE
}

fn default_transaction_wait_timeout_ms() -> u64 {
    defaults::DEFAULT_TRANSACTION_WAIT_TIMEOUT_MS
}

fn default_transaction_poll_interval_ms() -> u64 {
    defaults::DEFAULT_TRANSACTION_POLL_INTERVAL_MS
}

fn ensure_nonzero(field: &'static str, value: u64) -> std::result::Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn validate_http_url(field: &'static str, value: &str) -> std::result::Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(ConfigError::InvalidUrlScheme {
                field,
                value: value.to_string(),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_object_id(field: &'static str, value: &str) -> std::result::Result<ObjectId, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidObjectId {
            field,
            value: value.to_string(),
            source,
        })
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    pub fn from_yaml(contents: &str) -> std::result::Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn parse_admin(&self) -> std::result::Result<AdminKeypair, ConfigError> {
        AdminKeypair::from_bytes(self.admin_secret_key.as_ref()).map_err(|source| {
            ConfigError::InvalidKey {
                field: "admin_secret_key",
                source,
            }
        })
    }

    pub fn parse_house_key(&self) -> std::result::Result<HouseKey, ConfigError> {
        HouseKey::from_bytes(self.house_bls_secret_key.as_ref()).map_err(|source| {
            ConfigError::InvalidKey {
                field: "house_bls_secret_key",
                source,
            }
        })
    }

    pub fn validate(self) -> std::result::Result<ValidatedConfig, ConfigError> {
        validate_http_url("rpc_url", &self.rpc_url)?;
        if let Some(sponsor_url) = &self.sponsor_url {
            validate_http_url("sponsor_url", sponsor_url)?;
        }
        let package = parse_object_id("package_address", &self.package_address)?;
        let house_data_id = parse_object_id("house_data_id", &self.house_data_id)?;
        if !is_identifier(&self.module_name) {
            return Err(ConfigError::InvalidModuleName {
                value: self.module_name,
            });
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        ensure_nonzero("gas_budget", self.gas_budget)?;
        ensure_nonzero("request_timeout_ms", self.request_timeout_ms)?;
        ensure_nonzero("retry_max_attempts", self.retry_max_attempts as u64)?;
        ensure_nonzero("owned_objects_page_size", self.owned_objects_page_size as u64)?;
        ensure_nonzero(
            "transaction_wait_timeout_ms",
            self.transaction_wait_timeout_ms,
        )?;
        ensure_nonzero(
            "transaction_poll_interval_ms",
            self.transaction_poll_interval_ms,
        )?;
        if self.retry_max_backoff_ms < self.retry_initial_backoff_ms {
            return Err(ConfigError::InvalidBackoff {
                initial: self.retry_initial_backoff_ms,
                max: self.retry_max_backoff_ms,
            });
        }

        let admin = self.parse_admin()?;
        let house_key = self.parse_house_key()?;

        Ok(ValidatedConfig {
            rpc_url: self.rpc_url,
            sponsor_url: self.sponsor_url,
            contract: Contract::new(package, self.module_name),
            house_data_id,
            admin,
            house_key,
            gas_budget: self.gas_budget,
            log_level,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry_policy: RetryPolicy {
                max_attempts: self.retry_max_attempts,
                initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
                retry_non_idempotent: self.retry_non_idempotent,
            },
            owned_objects_page_size: self.owned_objects_page_size,
            transaction_wait_timeout: Duration::from_millis(self.transaction_wait_timeout_ms),
            transaction_poll_interval: Duration::from_millis(self.transaction_poll_interval_ms),
        })
    }
}

#[cfg(test)]
mod mocks;
