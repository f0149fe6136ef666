use mockall::mock;

use crate::services::{BackendUser, CallerIdentity, ServiceError, TenantRegistry, Upstream};

mock! {
    pub Registry {}

    impl TenantRegistry for Registry {
        fn load_current_upstream(&self) -> Result<Upstream, ServiceError>;
        fn load_known_upstreams(&self) -> Result<Vec<Upstream>, ServiceError>;
        fn store_upstream(&self, upstream: &Upstream) -> Result<(), ServiceError>;
        fn store_current_upstream(&self, key: &str) -> Result<Upstream, ServiceError>;
        fn delete_upstream(&self, key: &str) -> Result<Upstream, ServiceError>;
        fn load_identity(&self, caller_id: &str) -> Result<CallerIdentity, ServiceError>;
        fn load_backend_user(
            &self,
            upstream: &Upstream,
            caller_id: &str,
        ) -> Result<BackendUser, ServiceError>;
        fn store_notification_setting(
            &self,
            upstream: &Upstream,
            caller_id: &str,
            enabled: bool,
        ) -> Result<(), ServiceError>;
        fn delete_backend_user(
            &self,
            upstream: &Upstream,
            caller_id: &str,
        ) -> Result<(), ServiceError>;
    }
}
