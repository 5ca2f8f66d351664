//! Shared application state handed to every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    services::scan_service::ScanPipeline,
    store::CredentialStore,
};

#[derive(Clone)]
pub struct AppState {
    /// Credential store, also probed by `/health`.
    pub keys: Arc<dyn CredentialStore>,
    pub pipeline: Arc<ScanPipeline>,
    /// Shared secret for `/v1/admin/*`; `None` leaves those routes open.
    pub admin_token: Option<Arc<str>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        keys: Arc<dyn CredentialStore>,
        pipeline: ScanPipeline,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            keys,
            pipeline: Arc::new(pipeline),
            admin_token: admin_token.map(Arc::from),
            started_at: Utc::now(),
        }
    }
}
