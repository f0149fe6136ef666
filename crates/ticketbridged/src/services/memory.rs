use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BackendUser, CallerIdentity, ServiceError, TenantRegistry, Upstream};

type AccountKey = (String, String);

#[derive(Debug, Default)]
struct RegistryState {
    upstreams: BTreeMap<String, Upstream>,
    current: Option<String>,
    identities: HashMap<String, CallerIdentity>,
    accounts: HashMap<AccountKey, BackendUser>,
}

/// Thread-safe, in-process [`TenantRegistry`].
///
/// The first upstream added becomes current until
/// [`store_current_upstream`](TenantRegistry::store_current_upstream) picks
/// another one.
#[derive(Debug, Default)]
pub struct MemoryTenantRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryTenantRegistry {
    /// Registers an upstream.
    pub fn add_upstream(&self, upstream: Upstream) {
        let mut state = self.lock_recovering();
        if state.current.is_none() {
            state.current = Some(upstream.key.clone());
        }
        state.upstreams.insert(upstream.key.clone(), upstream);
    }

    /// Registers a platform identity.
    pub fn add_identity(&self, identity: CallerIdentity) {
        self.lock_recovering()
            .identities
            .insert(identity.user_id.clone(), identity);
    }

    /// Links a caller's account on an upstream.
    pub fn connect(&self, upstream_key: &str, user: BackendUser) {
        let key = (upstream_key.to_owned(), user.caller_id.clone());
        self.lock_recovering().accounts.insert(key, user);
    }

    /// Returns the linked account's notification preference.
    #[must_use]
    pub fn notification_setting(&self, upstream_key: &str, caller_id: &str) -> Option<bool> {
        let key = (upstream_key.to_owned(), caller_id.to_owned());
        self.lock_recovering()
            .accounts
            .get(&key)
            .map(|user| user.settings.notifications)
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Poisoned {
                store: "tenant registry",
            })
    }

    fn lock_recovering(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn account_key(upstream: &Upstream, caller_id: &str) -> AccountKey {
    (upstream.key.clone(), caller_id.to_owned())
}

fn not_connected(upstream: &Upstream, caller_id: &str) -> ServiceError {
    ServiceError::NotConnected {
        caller_id: caller_id.to_owned(),
        upstream: upstream.key.clone(),
    }
}

impl TenantRegistry for MemoryTenantRegistry {
    fn load_current_upstream(&self) -> Result<Upstream, ServiceError> {
        let state = self.lock()?;
        state
            .current
            .as_ref()
            .and_then(|key| state.upstreams.get(key))
            .cloned()
            .ok_or(ServiceError::NoCurrentUpstream)
    }

    fn load_known_upstreams(&self) -> Result<Vec<Upstream>, ServiceError> {
        Ok(self.lock()?.upstreams.values().cloned().collect())
    }

    fn store_upstream(&self, upstream: &Upstream) -> Result<(), ServiceError> {
        self.lock()?
            .upstreams
            .insert(upstream.key.clone(), upstream.clone());
        Ok(())
    }

    fn store_current_upstream(&self, key: &str) -> Result<Upstream, ServiceError> {
        let mut state = self.lock()?;
        let upstream = state
            .upstreams
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownUpstream(key.to_owned()))?;
        state.current = Some(upstream.key.clone());
        Ok(upstream)
    }

    fn delete_upstream(&self, key: &str) -> Result<Upstream, ServiceError> {
        let mut state = self.lock()?;
        let upstream = state
            .upstreams
            .remove(key)
            .ok_or_else(|| ServiceError::UnknownUpstream(key.to_owned()))?;
        state.accounts.retain(|(upstream_key, _), _| upstream_key != key);
        if state.current.as_deref() == Some(key) {
            state.current = None;
        }
        Ok(upstream)
    }

    fn load_identity(&self, caller_id: &str) -> Result<CallerIdentity, ServiceError> {
        self.lock()?
            .identities
            .get(caller_id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownUser(caller_id.to_owned()))
    }

    fn load_backend_user(
        &self,
        upstream: &Upstream,
        caller_id: &str,
    ) -> Result<BackendUser, ServiceError> {
        self.lock()?
            .accounts
            .get(&account_key(upstream, caller_id))
            .cloned()
            .ok_or_else(|| not_connected(upstream, caller_id))
    }

    fn store_notification_setting(
        &self,
        upstream: &Upstream,
        caller_id: &str,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let user = state
            .accounts
            .get_mut(&account_key(upstream, caller_id))
            .ok_or_else(|| not_connected(upstream, caller_id))?;
        user.settings.notifications = enabled;
        Ok(())
    }

    fn delete_backend_user(
        &self,
        upstream: &Upstream,
        caller_id: &str,
    ) -> Result<(), ServiceError> {
        self.lock()?
            .accounts
            .remove(&account_key(upstream, caller_id))
            .map(|_| ())
            .ok_or_else(|| not_connected(upstream, caller_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const CLOUD: &str = "https://acme.atlassian.net";

    #[fixture]
    fn registry() -> MemoryTenantRegistry {
        let registry = MemoryTenantRegistry::default();
        registry.add_upstream(Upstream::cloud(CLOUD, "secret"));
        registry.add_upstream(Upstream::server("https://jira.acme.test"));
        registry.connect(CLOUD, BackendUser::new("u1", "acc-1", "Alice"));
        registry
    }

    #[rstest]
    fn first_upstream_becomes_current(registry: MemoryTenantRegistry) {
        let current = registry.load_current_upstream().expect("current upstream");
        assert_eq!(current.key, CLOUD);
        assert_eq!(registry.load_known_upstreams().expect("list").len(), 2);
    }

    #[rstest]
    fn selecting_unknown_upstream_fails(registry: MemoryTenantRegistry) {
        let error = registry
            .store_current_upstream("https://nope.test")
            .expect_err("unknown upstream");
        assert!(matches!(error, ServiceError::UnknownUpstream(_)));
    }

    #[rstest]
    fn stored_upstreams_can_become_current(registry: MemoryTenantRegistry) {
        let upstream = Upstream::server("https://jira.other.test");
        registry.store_upstream(&upstream).expect("store upstream");
        let selected = registry
            .store_current_upstream(&upstream.key)
            .expect("select upstream");
        assert_eq!(selected, upstream);
        assert_eq!(
            registry.load_current_upstream().expect("current upstream"),
            upstream
        );
    }

    #[rstest]
    fn deleting_upstream_forgets_its_accounts(registry: MemoryTenantRegistry) {
        let upstream = registry.load_current_upstream().expect("current upstream");
        registry
            .store_notification_setting(&upstream, "u1", true)
            .expect("store setting");

        let deleted = registry.delete_upstream(CLOUD).expect("delete upstream");
        assert_eq!(deleted.key, CLOUD);
        assert!(matches!(
            registry.load_current_upstream(),
            Err(ServiceError::NoCurrentUpstream)
        ));
        assert_eq!(registry.load_known_upstreams().expect("list").len(), 1);
        assert_eq!(registry.notification_setting(CLOUD, "u1"), None);

        registry.store_upstream(&upstream).expect("reinstall");
        assert!(registry.load_backend_user(&upstream, "u1").is_err());
        assert!(matches!(
            registry.delete_upstream("https://nope.test"),
            Err(ServiceError::UnknownUpstream(_))
        ));
    }

    #[rstest]
    fn deleting_another_upstream_keeps_the_current_one(registry: MemoryTenantRegistry) {
        registry
            .delete_upstream("https://jira.acme.test")
            .expect("delete upstream");
        assert_eq!(
            registry.load_current_upstream().expect("current upstream").key,
            CLOUD
        );
    }

    #[rstest]
    fn poisoned_lock_is_reported(registry: MemoryTenantRegistry) {
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry.state.lock();
            panic!("writer failed");
        }));
        assert!(panicked.is_err());

        let error = registry
            .load_known_upstreams()
            .expect_err("poisoned lock");
        assert!(matches!(
            error,
            ServiceError::Poisoned {
                store: "tenant registry"
            }
        ));
        assert_eq!(error.to_string(), "tenant registry lock poisoned");
    }

    #[test]
    fn empty_registry_has_no_current_upstream() {
        let error = MemoryTenantRegistry::default()
            .load_current_upstream()
            .expect_err("no upstream");
        assert!(matches!(error, ServiceError::NoCurrentUpstream));
    }

    #[rstest]
    fn notification_settings_require_linked_account(registry: MemoryTenantRegistry) {
        let upstream = registry.load_current_upstream().expect("current upstream");
        assert_eq!(registry.notification_setting(CLOUD, "u1"), Some(true));
        registry
            .store_notification_setting(&upstream, "u1", false)
            .expect("linked account accepts settings");
        assert_eq!(registry.notification_setting(CLOUD, "u1"), Some(false));
        let user = registry
            .load_backend_user(&upstream, "u1")
            .expect("linked account");
        assert!(!user.settings.notifications);
        assert!(
            registry
                .store_notification_setting(&upstream, "u2", true)
                .is_err()
        );
    }

    #[rstest]
    fn deleting_account_clears_settings(registry: MemoryTenantRegistry) {
        let upstream = registry.load_current_upstream().expect("current upstream");
        registry
            .store_notification_setting(&upstream, "u1", false)
            .expect("store setting");
        registry
            .delete_backend_user(&upstream, "u1")
            .expect("delete account");
        assert!(registry.load_backend_user(&upstream, "u1").is_err());
        assert_eq!(registry.notification_setting(CLOUD, "u1"), None);
        assert!(registry.delete_backend_user(&upstream, "u1").is_err());
    }
}
