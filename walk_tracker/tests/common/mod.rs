#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::DateTime;
use tokio::sync::{mpsc, oneshot, Notify};
use walk_tracker::{
    LocationError, LocationProvider, LocationSubscription, LocationUpdate, ManualClock, PersistenceError,
    SubscriptionId, TrackerConfig, WalkStore, WalkTracker,
};
use walk_tracker_lib::{location_sample::LocationSample, walk::WalkPayload};

pub fn sample(latitude: f64, longitude: f64, millis: i64) -> LocationSample {
    LocationSample::new(latitude, longitude, DateTime::from_timestamp_millis(millis).unwrap())
}

/// Ticks far apart, so progress events do not show up unless a test asks for them.
pub fn quiet_config() -> TrackerConfig {
    TrackerConfig {
        tick_interval: Duration::from_secs(3600),
        ..TrackerConfig::default()
    }
}

enum Fix {
    Ready(Result<LocationSample, LocationError>),
    Gated(oneshot::Receiver<Result<LocationSample, LocationError>>),
    Never,
}

/// Location provider whose answers are queued up by the test.
#[derive(Default)]
pub struct ScriptedProvider {
    fixes: Mutex<VecDeque<Fix>>,
    sender: Mutex<Option<mpsc::UnboundedSender<LocationUpdate>>>,
    next_id: AtomicU64,
    subscribed: AtomicUsize,
    unsubscribed: AtomicUsize,
    pub fix_requested: Notify,
    pub fail_subscribe: AtomicBool,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_fix(&self, fix: Result<LocationSample, LocationError>) {
        self.fixes.lock().unwrap().push_back(Fix::Ready(fix));
    }

    /// The fix is only delivered when the returned sender is used.
    pub fn push_gated_fix(&self) -> oneshot::Sender<Result<LocationSample, LocationError>> {
        let (tx, rx) = oneshot::channel();
        self.fixes.lock().unwrap().push_back(Fix::Gated(rx));
        tx
    }

    pub fn push_silent_fix(&self) {
        self.fixes.lock().unwrap().push_back(Fix::Never);
    }

    /// Sends an update on the open subscription. False if there is none.
    pub fn send(&self, update: LocationUpdate) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(sender) => sender.send(update).is_ok(),
            None => false,
        }
    }

    /// Ends the update stream without unsubscribing.
    pub fn close_updates(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn subscribed(&self) -> usize {
        self.subscribed.load(Ordering::SeqCst)
    }

    pub fn unsubscribed(&self) -> usize {
        self.unsubscribed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for ScriptedProvider {
    async fn request_once(&self) -> Result<LocationSample, LocationError> {
        self.fix_requested.notify_one();
        let fix = self.fixes.lock().unwrap().pop_front();
        match fix {
            Some(Fix::Ready(fix)) => fix,
            Some(Fix::Gated(rx)) => rx.await.unwrap_or(Err(LocationError::Unavailable("gate dropped".into()))),
            Some(Fix::Never) => std::future::pending().await,
            None => Err(LocationError::Unavailable("no fix scripted".into())),
        }
    }

    fn subscribe(&self) -> Result<LocationSubscription, LocationError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(LocationError::Unavailable("subscription refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        self.subscribed.fetch_add(1, Ordering::SeqCst);
        Ok(LocationSubscription {
            id: SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            updates: rx,
        })
    }

    fn unsubscribe(&self, _id: SubscriptionId) {
        self.sender.lock().unwrap().take();
        self.unsubscribed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps saved walks in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub sessions: Mutex<Vec<WalkPayload>>,
    pub samples: Mutex<Vec<(i64, Vec<LocationSample>)>>,
    pub fail_sessions: AtomicBool,
    pub fail_samples: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl WalkStore for MemoryStore {
    async fn save_session(&self, payload: &WalkPayload) -> Result<i64, PersistenceError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(PersistenceError("database is offline".into()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(payload.clone());
        Ok(sessions.len() as i64)
    }

    async fn save_samples(&self, walk_id: i64, samples: &[LocationSample]) -> Result<(), PersistenceError> {
        if self.fail_samples.load(Ordering::SeqCst) {
            return Err(PersistenceError("location table is locked".into()));
        }
        self.samples.lock().unwrap().push((walk_id, samples.to_vec()));
        Ok(())
    }
}

pub struct Harness {
    pub tracker: WalkTracker,
    pub provider: Arc<ScriptedProvider>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(quiet_config())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        let provider = ScriptedProvider::new();
        let store = MemoryStore::new();
        let clock = ManualClock::at_millis(0);
        let tracker = WalkTracker::spawn(provider.clone(), store.clone(), Arc::new(clock.clone()), config);
        Self {
            tracker,
            provider,
            store,
            clock,
        }
    }
}
