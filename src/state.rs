use std::{sync::Arc, time::Duration};

use crate::{
    auth::jwt::JwtService, config::AppConfig, realtime::RealtimeHub, storage::ObjectStorage,
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: JwtService,
    pub hub: RealtimeHub,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        jwt: JwtService,
    ) -> Self {
        let hub = RealtimeHub::new(config.realtime_buffer);
        Self {
            store,
            config: Arc::new(config),
            storage,
            jwt,
            hub,
        }
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.config.presigned_url_expiry_seconds)
    }
}
