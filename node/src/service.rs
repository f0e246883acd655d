//! Service assembly: storage, key ring, gateways and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use guestpass_crypto::TokenCodec;
use guestpass_lifecycle::{EngineDeps, PassEngine, SystemClock};
use guestpass_nullables::{
    NullMembership, NullNotifier, NullStore, NullVerificationGateway, NullWalletIssuer,
};
use guestpass_rpc::{AppState, RpcServer, WebhookSettings};
use guestpass_store::GuestPassStore;
use guestpass_store_lmdb::LmdbStore;

use crate::config::{GatewayMode, ServiceConfig, StorageBackend};
use crate::gateways::Gateways;
use crate::secrets::{load_key_ring, load_secret, EnvSecrets, SecretSource};
use crate::shutdown::ShutdownController;
use crate::NodeError;

pub struct GuestPassService {
    config: ServiceConfig,
    state: AppState,
    shutdown: Arc<ShutdownController>,
}

impl GuestPassService {
    /// Build the service with secrets taken from the environment.
    pub fn new(config: ServiceConfig) -> Result<Self, NodeError> {
        Self::with_secrets(config, &EnvSecrets)
    }

    pub fn with_secrets(
        config: ServiceConfig,
        secrets: &dyn SecretSource,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let store = open_store(&config)?;
        let keys = load_key_ring(&config.tokens, secrets)?;
        let codec = TokenCodec::new(config.tokens.issuer.clone(), keys);
        let wallet_secret = load_secret(secrets, &config.tokens.wallet_secret_env)?;
        let gateways = build_gateways(&config, secrets)?;

        let deps = EngineDeps {
            store,
            clock: Arc::new(SystemClock),
            codec,
            wallet_secret,
            verification: gateways.verification,
            notifier: gateways.notifier,
            wallet: gateways.wallet,
            membership: gateways.membership,
        };
        let engine = Arc::new(PassEngine::new(deps, config.engine_config()?));

        let webhook = WebhookSettings {
            secret: load_secret(secrets, &config.gateways.webhook_secret_env)?,
            tolerance_secs: config.gateways.webhook_tolerance_secs,
        };

        Ok(Self {
            state: AppState::new(engine, webhook),
            shutdown: Arc::new(ShutdownController::new()),
            config,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        self.shutdown.clone()
    }

    /// Serve the HTTP API until SIGINT/SIGTERM or a programmatic shutdown.
    pub async fn run(self) -> Result<(), NodeError> {
        let signals = self.shutdown.clone();
        tokio::spawn(async move { signals.wait_for_signal().await });

        RpcServer::new(self.config.server.bind, self.state)
            .with_cors(self.config.server.cors)
            .serve(self.shutdown.signalled())
            .await?;
        info!("guest pass service stopped");
        Ok(())
    }
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn GuestPassStore>, NodeError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("using in-memory storage; passes are lost on restart");
            Ok(Arc::new(NullStore::new()))
        }
        StorageBackend::Lmdb => {
            let map_size = config.storage.map_size_mb.saturating_mul(1 << 20);
            Ok(Arc::new(LmdbStore::open(&config.storage.data_dir, map_size)?))
        }
    }
}

fn build_gateways(
    config: &ServiceConfig,
    secrets: &dyn SecretSource,
) -> Result<Gateways, NodeError> {
    let gateways = &config.gateways;
    match gateways.mode {
        GatewayMode::Null => {
            warn!("external gateways are stubbed; no SMS, verification or wallet calls leave the process");
            Ok(Gateways {
                verification: Arc::new(NullVerificationGateway::new()),
                notifier: Arc::new(NullNotifier::new()),
                wallet: Arc::new(NullWalletIssuer::new()),
                membership: Arc::new(NullMembership::new()),
            })
        }
        GatewayMode::Http => {
            let api_key = match &gateways.api_key_env {
                Some(name) => load_secret(secrets, name)?
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
                None => None,
            };
            Ok(Gateways::http(
                gateways.verification_url.as_deref(),
                gateways.sms_url.as_deref(),
                gateways.wallet_url.as_deref(),
                gateways.membership_url.as_deref(),
                api_key,
                Duration::from_millis(gateways.call_timeout_ms),
            ))
        }
    }
}
