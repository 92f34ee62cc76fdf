use locweather_core::{Coordinate, FixHandler, LocationProvider, Priority, RawFix, SubscriptionId};
use reqwest::Client;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const IP_LOOKUP_URL: &str = "http://ip-api.com/json";

/// Always reports the same coordinate, immediately.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationProvider for FixedLocation {
    fn request_updates(&self, _priority: Priority, mut handler: FixHandler) -> SubscriptionId {
        handler(RawFix::new(self.0.latitude, self.0.longitude));
        SubscriptionId(0)
    }

    fn remove_updates(&self, _id: SubscriptionId) {}
}

/// Approximates the device position from its public IP address.
///
/// Accuracy priority is ignored; the lookup is city-level at best.
#[derive(Debug)]
pub struct IpGeolocation {
    http: Client,
    url: String,
    next_id: AtomicU64,
    lookups: Arc<Mutex<HashMap<SubscriptionId, JoinHandle<()>>>>,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpApiResponse {
    fn into_fix(self) -> Result<RawFix, String> {
        if self.status == "success" {
            Ok(RawFix { latitude: self.lat, longitude: self.lon })
        } else {
            Err(self.message.unwrap_or(self.status))
        }
    }
}

impl IpGeolocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
            lookups: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.lookups.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn lookup(http: Client, url: String) -> Result<RawFix, String> {
        let res = http.get(&url).send().await.map_err(|err| err.to_string())?;
        let parsed: IpApiResponse = res.json().await.map_err(|err| err.to_string())?;
        parsed.into_fix()
    }
}

impl LocationProvider for IpGeolocation {
    fn request_updates(&self, _priority: Priority, mut handler: FixHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let http = self.http.clone();
        let url = self.url.clone();
        let lookups = Arc::clone(&self.lookups);

        // Held until the handle is stored, so the task's own removal cannot run first.
        let mut pending = self.lookups.lock().unwrap_or_else(PoisonError::into_inner);
        let task = tokio::spawn(async move {
            match Self::lookup(http, url).await {
                Ok(fix) => handler(fix),
                Err(err) => warn!("IP geolocation failed: {err}"),
            }
            lookups.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        });
        pending.insert(id, task);
        id
    }

    fn remove_updates(&self, id: SubscriptionId) {
        let task = self.lookups.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        if let Some(task) = task {
            debug!(?id, "cancelling IP geolocation lookup");
            task.abort();
        }
    }
}

/// Picks explicit coordinates, then the configured home, then IP lookup.
pub fn select_provider(
    explicit: Option<Coordinate>,
    home: Option<Coordinate>,
    allow_ip_lookup: bool,
) -> Option<Arc<dyn LocationProvider>> {
    if let Some(coordinate) = explicit.or(home) {
        return Some(Arc::new(FixedLocation(coordinate)));
    }
    if allow_ip_lookup {
        return Some(Arc::new(IpGeolocation::new(IP_LOOKUP_URL)));
    }
    None
}

/// Stands in when no source is available; never delivers.
#[derive(Debug, Clone, Copy)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn request_updates(&self, _priority: Priority, handler: FixHandler) -> SubscriptionId {
        drop(handler);
        SubscriptionId(0)
    }

    fn remove_updates(&self, _id: SubscriptionId) {}
}
