//! Service configuration with TOML file support.
//!
//! Secrets never live in the file. Each one is named by the environment
//! variable that holds it (`*_env` fields).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use guestpass_lifecycle::EngineConfig;
use guestpass_types::BuildingCalendar;

use crate::NodeError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub building: BuildingConfig,
    #[serde(default)]
    pub gateways: GatewaysConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Prefix of the links sent to guests.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process only; everything is lost on restart.
    Memory,
    Lmdb,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    pub kid: String,
    pub secret_env: String,
    /// Still accepted on incoming tokens, never used to sign.
    #[serde(default)]
    pub verify_only: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokensConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_active_kid")]
    pub active_kid: String,
    #[serde(default = "default_keys")]
    pub keys: Vec<KeyConfig>,
    #[serde(default = "default_wallet_secret_env")]
    pub wallet_secret_env: String,
    #[serde(default = "default_door_ttl")]
    pub door_ttl_secs: u64,
    #[serde(default = "default_prereg_ttl")]
    pub prereg_ttl_secs: u64,
    #[serde(default = "default_verification_ttl")]
    pub verification_ttl_secs: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Offset of building-local time east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Printed on wallet passes.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Http,
    /// In-process stand-ins for local development.
    Null,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewaysConfig {
    #[serde(default = "default_gateway_mode")]
    pub mode: GatewayMode,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default)]
    pub verification_url: Option<String>,
    #[serde(default)]
    pub sms_url: Option<String>,
    #[serde(default)]
    pub wallet_url: Option<String>,
    #[serde(default)]
    pub membership_url: Option<String>,
    /// Bearer token sent to every gateway endpoint.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_webhook_secret_env")]
    pub webhook_secret_env: String,
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "human" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Lmdb
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./guestpass_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_issuer() -> String {
    "guestpass".to_string()
}

fn default_active_kid() -> String {
    "k1".to_string()
}

fn default_keys() -> Vec<KeyConfig> {
    vec![KeyConfig {
        kid: default_active_kid(),
        secret_env: "GUESTPASS_TOKEN_KEY_K1".to_string(),
        verify_only: false,
    }]
}

fn default_wallet_secret_env() -> String {
    "GUESTPASS_WALLET_SECRET".to_string()
}

fn default_door_ttl() -> u64 {
    600
}

fn default_prereg_ttl() -> u64 {
    24 * 3600
}

fn default_verification_ttl() -> u64 {
    48 * 3600
}

fn default_session_ttl() -> u64 {
    8 * 3600
}

fn default_gateway_mode() -> GatewayMode {
    GatewayMode::Http
}

fn default_call_timeout_ms() -> u64 {
    5_000
}

fn default_webhook_secret_env() -> String {
    "GUESTPASS_WEBHOOK_SECRET".to_string()
}

fn default_webhook_tolerance() -> u64 {
    guestpass_crypto::DEFAULT_TOLERANCE_SECS
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_base_url: default_public_base_url(),
            cors: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
        }
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            active_kid: default_active_kid(),
            keys: default_keys(),
            wallet_secret_env: default_wallet_secret_env(),
            door_ttl_secs: default_door_ttl(),
            prereg_ttl_secs: default_prereg_ttl(),
            verification_ttl_secs: default_verification_ttl(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl Default for GatewaysConfig {
    fn default() -> Self {
        Self {
            mode: default_gateway_mode(),
            call_timeout_ms: default_call_timeout_ms(),
            verification_url: None,
            sms_url: None,
            wallet_url: None,
            membership_url: None,
            api_key_env: None,
            webhook_secret_env: default_webhook_secret_env(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Checks that do not need the environment.
    pub fn validate(&self) -> Result<(), NodeError> {
        let tokens = &self.tokens;
        match tokens.keys.iter().find(|k| k.kid == tokens.active_kid) {
            None => {
                return Err(NodeError::Config(format!(
                    "active_kid {} is not in tokens.keys",
                    tokens.active_kid
                )))
            }
            Some(key) if key.verify_only => {
                return Err(NodeError::Config(format!(
                    "active_kid {} is marked verify_only",
                    tokens.active_kid
                )))
            }
            Some(_) => {}
        }
        let mut kids: Vec<&str> = tokens.keys.iter().map(|k| k.kid.as_str()).collect();
        kids.sort_unstable();
        if kids.windows(2).any(|w| w[0] == w[1]) {
            return Err(NodeError::Config("duplicate kid in tokens.keys".into()));
        }
        if tokens.door_ttl_secs == 0 || tokens.session_ttl_secs == 0 {
            return Err(NodeError::Config("token lifetimes must be positive".into()));
        }
        BuildingCalendar::from_offset_minutes(self.building.utc_offset_minutes)
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn engine_config(&self) -> Result<EngineConfig, NodeError> {
        let calendar = BuildingCalendar::from_offset_minutes(self.building.utc_offset_minutes)
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(EngineConfig {
            public_base_url: self.server.public_base_url.clone(),
            building_code: self.building.code.clone(),
            calendar,
            door_ttl_secs: self.tokens.door_ttl_secs,
            prereg_ttl_secs: self.tokens.prereg_ttl_secs,
            verification_ttl_secs: self.tokens.verification_ttl_secs,
            session_ttl_secs: self.tokens.session_ttl_secs,
            call_timeout: Duration::from_millis(self.gateways.call_timeout_ms),
        })
    }
}
