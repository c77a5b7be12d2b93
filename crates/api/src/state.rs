//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use stratboard_gateway::{AuthGateway, CredentialStore, TokenCodec};

use crate::config::Config;
use crate::email::MailService;
use crate::store::{PgAccountStore, PgCredentialStore, PgPolicyStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub gateway: Arc<AuthGateway>,
    pub credentials: Arc<dyn CredentialStore>,
    pub mailer: MailService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let codec = TokenCodec::new(config.token_secret.as_bytes(), config.token_durations);
        let gateway = Arc::new(AuthGateway::new(
            codec,
            Arc::new(PgAccountStore::new(pool.clone())),
            Arc::new(PgPolicyStore::new(pool.clone())),
        ));

        let mailer = MailService::from_env();
        if mailer.enabled() {
            tracing::info!("outbound mail enabled");
        } else {
            tracing::info!("outbound mail disabled");
        }

        Self {
            credentials: Arc::new(PgCredentialStore::new(pool.clone())),
            pool,
            config,
            gateway,
            mailer,
        }
    }
}
