use crate::auth::TokenService;
use crate::config::AuthConfig;
use crate::storage::Store;
use std::sync::Arc;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: AuthConfig) -> Self {
        let tokens = TokenService::new(&auth.jwt_secret, auth.token_ttl());
        Self {
            store,
            tokens: Arc::new(tokens),
            auth: Arc::new(auth),
        }
    }
}
