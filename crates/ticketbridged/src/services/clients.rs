use std::sync::Arc;

use super::{BackendClient, BackendUser, ClientFactory, ServiceError, Upstream};

/// Client handle bound to one upstream account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamClient {
    base_url: String,
    account_id: String,
}

impl UpstreamClient {
    /// Builds a handle for `account_id` on `base_url`.
    pub fn new(base_url: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            account_id: account_id.into(),
        }
    }
}

impl BackendClient for UpstreamClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn account_id(&self) -> &str {
        &self.account_id
    }
}

/// Factory producing [`UpstreamClient`] handles from upstream records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticClientFactory;

impl ClientFactory for StaticClientFactory {
    fn new_client(
        &self,
        upstream: &Upstream,
        user: &BackendUser,
    ) -> Result<Arc<dyn BackendClient>, ServiceError> {
        if user.account_id.is_empty() {
            return Err(ServiceError::NotConnected {
                caller_id: user.caller_id.clone(),
                upstream: upstream.key.clone(),
            });
        }
        let base_url = upstream.url.trim_end_matches('/');
        Ok(Arc::new(UpstreamClient::new(base_url, user.account_id.as_str())))
    }
}
