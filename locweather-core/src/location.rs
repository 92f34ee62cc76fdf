use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    error::LocationError,
    model::{Coordinate, Permission, Priority, RawFix},
    permission::PermissionSystem,
};

/// Callback a provider invokes for every fix it produces.
pub type FixHandler = Box<dyn FnMut(RawFix) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The platform location service.
///
/// A provider may call the handler any number of times, synchronously from
/// `request_updates` or later from another task. Dropping the handler without
/// calling it means no fix will ever arrive.
pub trait LocationProvider: Send + Sync + Debug {
    fn request_updates(&self, priority: Priority, handler: FixHandler) -> SubscriptionId;

    fn remove_updates(&self, id: SubscriptionId);
}

/// Subscription state shared between a pending request and `teardown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    /// `request_updates` is running; its id is not known yet.
    Reserved,
    /// Teardown arrived while the slot was reserved.
    Cancelled,
    Active(SubscriptionId),
}

/// Delivers exactly one coordinate per request.
#[derive(Debug)]
pub struct LocationSource {
    provider: Arc<dyn LocationProvider>,
    permissions: Arc<dyn PermissionSystem>,
    slot: Mutex<Slot>,
}

impl LocationSource {
    pub fn new(provider: Arc<dyn LocationProvider>, permissions: Arc<dyn PermissionSystem>) -> Self {
        Self { provider, permissions, slot: Mutex::new(Slot::Empty) }
    }

    /// Requests a single high-accuracy fix.
    ///
    /// Returns `Ok(None)` without touching the provider when no location
    /// permission is held.
    pub async fn request_once(&self) -> Result<Option<Coordinate>, LocationError> {
        if !Permission::all().iter().any(|p| self.permissions.is_granted(*p)) {
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let handler: FixHandler = Box::new(move |fix: RawFix| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(fix);
            }
        });

        *self.lock_slot() = Slot::Reserved;
        let id = self.provider.request_updates(Priority::HighAccuracy, handler);
        let subscription = Subscription::register(self, id)?;

        let fix = rx.await.map_err(|_| {
            LocationError::Unavailable("location provider stopped without delivering a fix".into())
        })?;
        drop(subscription);

        debug!(latitude = ?fix.latitude, longitude = ?fix.longitude, "received location fix");
        Coordinate::try_from(fix).map(Some)
    }

    /// Releases any pending subscription, including one still being registered.
    pub fn teardown(&self) {
        let mut slot = self.lock_slot();
        let current = *slot;
        match current {
            Slot::Active(id) => {
                *slot = Slot::Empty;
                drop(slot);
                debug!(?id, "releasing pending location subscription");
                self.provider.remove_updates(id);
            }
            Slot::Reserved => *slot = Slot::Cancelled,
            Slot::Empty | Slot::Cancelled => {}
        }
    }

    fn release(&self, id: SubscriptionId) {
        let mut slot = self.lock_slot();
        if *slot == Slot::Active(id) {
            *slot = Slot::Empty;
            drop(slot);
            self.provider.remove_updates(id);
        }
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LocationSource {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Unregisters its subscription when dropped, unless teardown already did.
struct Subscription<'a> {
    source: &'a LocationSource,
    id: SubscriptionId,
}

impl<'a> Subscription<'a> {
    fn register(source: &'a LocationSource, id: SubscriptionId) -> Result<Self, LocationError> {
        let mut slot = source.lock_slot();
        if *slot == Slot::Cancelled {
            *slot = Slot::Empty;
            drop(slot);
            debug!(?id, "location request torn down during registration");
            source.provider.remove_updates(id);
            return Err(LocationError::Unavailable("location request was torn down".into()));
        }
        *slot = Slot::Active(id);
        Ok(Self { source, id })
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.source.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct StaticPermissions(Vec<Permission>);

    #[async_trait]
    impl PermissionSystem for StaticPermissions {
        fn location_services_enabled(&self) -> bool {
            true
        }

        fn is_granted(&self, permission: Permission) -> bool {
            self.0.contains(&permission)
        }

        async fn request(&self, permissions: &[Permission]) -> Vec<(Permission, bool)> {
            permissions.iter().map(|p| (*p, self.0.contains(p))).collect()
        }
    }

    enum Behaviour {
        /// Calls the handler with each fix during registration.
        Deliver(Vec<RawFix>),
        /// Drops the handler immediately.
        Abandon,
        /// Keeps the handler and never calls it.
        Hold,
    }

    struct FakeProvider {
        behaviour: Behaviour,
        next_id: Mutex<u64>,
        priorities: Mutex<Vec<Priority>>,
        held: Mutex<HashMap<SubscriptionId, FixHandler>>,
        removed: Mutex<Vec<SubscriptionId>>,
    }

    impl Debug for FakeProvider {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FakeProvider").finish_non_exhaustive()
        }
    }

    impl FakeProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                next_id: Mutex::new(0),
                priorities: Mutex::new(Vec::new()),
                held: Mutex::new(HashMap::new()),
                removed: Mutex::new(Vec::new()),
            })
        }
    }

    impl LocationProvider for FakeProvider {
        fn request_updates(&self, priority: Priority, mut handler: FixHandler) -> SubscriptionId {
            self.priorities.lock().unwrap().push(priority);
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                SubscriptionId(*next)
            };

            match &self.behaviour {
                Behaviour::Deliver(fixes) => {
                    for fix in fixes {
                        handler(*fix);
                    }
                    self.held.lock().unwrap().insert(id, handler);
                }
                Behaviour::Abandon => drop(handler),
                Behaviour::Hold => {
                    self.held.lock().unwrap().insert(id, handler);
                }
            }
            id
        }

        fn remove_updates(&self, id: SubscriptionId) {
            self.held.lock().unwrap().remove(&id);
            self.removed.lock().unwrap().push(id);
        }
    }

    fn all_granted() -> Arc<StaticPermissions> {
        Arc::new(StaticPermissions(Permission::all().to_vec()))
    }

    #[tokio::test]
    async fn first_fix_wins_and_subscription_is_released() {
        let provider = FakeProvider::new(Behaviour::Deliver(vec![
            RawFix::new(48.8566, 2.3522),
            RawFix::new(0.0, 0.0),
        ]));
        let source = LocationSource::new(provider.clone(), all_granted());

        let coord = source.request_once().await.unwrap();

        assert_eq!(coord, Some(Coordinate { latitude: 48.8566, longitude: 2.3522 }));
        assert_eq!(*provider.priorities.lock().unwrap(), vec![Priority::HighAccuracy]);
        assert_eq!(*provider.removed.lock().unwrap(), vec![SubscriptionId(1)]);
    }

    #[tokio::test]
    async fn no_permission_is_a_silent_noop() {
        let provider = FakeProvider::new(Behaviour::Deliver(vec![RawFix::new(1.0, 1.0)]));
        let source = LocationSource::new(provider.clone(), Arc::new(StaticPermissions(vec![])));

        assert_eq!(source.request_once().await.unwrap(), None);
        assert!(provider.priorities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn coarse_permission_alone_is_enough() {
        let provider = FakeProvider::new(Behaviour::Deliver(vec![RawFix::new(1.0, 2.0)]));
        let perms = Arc::new(StaticPermissions(vec![Permission::CoarseLocation]));
        let source = LocationSource::new(provider, perms);

        assert!(source.request_once().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn abandoned_handler_is_unavailable() {
        let provider = FakeProvider::new(Behaviour::Abandon);
        let source = LocationSource::new(provider.clone(), all_granted());

        let err = source.request_once().await.unwrap_err();

        assert!(err.to_string().contains("without delivering"));
        assert_eq!(provider.removed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_fix_is_unavailable() {
        let provider = FakeProvider::new(Behaviour::Deliver(vec![RawFix {
            latitude: None,
            longitude: Some(4.0),
        }]));
        let source = LocationSource::new(provider, all_granted());

        assert!(matches!(source.request_once().await, Err(LocationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn teardown_releases_pending_subscription_once() {
        let provider = FakeProvider::new(Behaviour::Hold);
        let source = Arc::new(LocationSource::new(provider.clone(), all_granted()));

        let pending = tokio::spawn({
            let source = source.clone();
            async move { source.request_once().await }
        });
        while provider.held.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        source.teardown();
        let result = pending.await.unwrap();

        assert!(matches!(result, Err(LocationError::Unavailable(_))));
        assert_eq!(*provider.removed.lock().unwrap(), vec![SubscriptionId(1)]);
    }

    /// Tears the source down from inside `request_updates`, then keeps the handler.
    #[derive(Default)]
    struct TeardownDuringRegistration {
        source: std::sync::OnceLock<std::sync::Weak<LocationSource>>,
        held: Mutex<Vec<FixHandler>>,
        removed: Mutex<Vec<SubscriptionId>>,
    }

    impl Debug for TeardownDuringRegistration {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TeardownDuringRegistration").finish_non_exhaustive()
        }
    }

    impl LocationProvider for TeardownDuringRegistration {
        fn request_updates(&self, _priority: Priority, handler: FixHandler) -> SubscriptionId {
            if let Some(source) = self.source.get().and_then(|weak| weak.upgrade()) {
                source.teardown();
            }
            self.held.lock().unwrap().push(handler);
            SubscriptionId(42)
        }

        fn remove_updates(&self, id: SubscriptionId) {
            self.held.lock().unwrap().clear();
            self.removed.lock().unwrap().push(id);
        }
    }

    #[tokio::test]
    async fn teardown_during_registration_releases_the_new_subscription() {
        let provider = Arc::new(TeardownDuringRegistration::default());
        let source = Arc::new(LocationSource::new(provider.clone(), all_granted()));
        provider.source.set(Arc::downgrade(&source)).unwrap();

        let result =
            tokio::time::timeout(std::time::Duration::from_secs(1), source.request_once()).await;

        assert!(matches!(result, Ok(Err(LocationError::Unavailable(_)))));
        assert_eq!(*provider.removed.lock().unwrap(), vec![SubscriptionId(42)]);

        // The slot is free again; a later teardown has nothing to release.
        source.teardown();
        assert_eq!(provider.removed.lock().unwrap().len(), 1);
    }
}
