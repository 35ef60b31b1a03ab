use std::{future::Future, sync::Arc};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{error, info};
use walk_tracker_lib::{
    pet::PetId,
    walk::{WalkDetails, WalkPayload},
};

use crate::{
    actor::{Command, Reply, SessionActor},
    Clock, LocationProvider, PersistenceError, SavedWalk, SessionError, SystemClock, TrackerConfig, WalkEvent,
    WalkProgress, WalkStore,
};

/// Handle to one walk. The walk itself lives on its own task; dropping the
/// handle abandons it and releases the location subscription and timer.
pub struct WalkTracker {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<WalkEvent>,
    store: Arc<dyn WalkStore>,
    task: JoinHandle<()>,
}

impl WalkTracker {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        provider: Arc<dyn LocationProvider>,
        store: Arc<dyn WalkStore>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let actor = SessionActor::new(provider, clock, config, events.clone());
        let task = tokio::spawn(actor.run(receiver));

        Self {
            commands,
            events,
            store,
            task,
        }
    }

    pub fn new(provider: Arc<dyn LocationProvider>, store: Arc<dyn WalkStore>) -> Self {
        Self::spawn(provider, store, Arc::new(SystemClock), TrackerConfig::default())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalkEvent> {
        self.events.subscribe()
    }

    /// Resolves once the first fix has arrived and the walk is active. The
    /// future does not borrow the tracker, so the walk can still be stopped
    /// or abandoned while it waits.
    pub fn start(&self, pet_id: impl Into<PetId>) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        self.start_walk(pet_id.into())
    }

    fn start_walk(&self, pet_id: PetId) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let commands = self.commands.clone();
        async move { send_request(&commands, |reply| Command::Start { pet_id, reply }).await }
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn set_details(&self, details: WalkDetails) -> Result<(), SessionError> {
        self.request(|reply| Command::SetDetails { details, reply }).await
    }

    pub async fn snapshot(&self) -> Result<WalkProgress, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Packages the stopped walk and hands it to the store. Failures from the
    /// store are not retried; the error carries the payload instead.
    pub async fn finalize(&self) -> Result<SavedWalk, SessionError> {
        let payload = self.request(|reply| Command::Finalize { reply }).await?;

        let walk_id = match self.store.save_session(&payload).await {
            Ok(walk_id) => walk_id,
            Err(source) => return Err(self.persistence_failed(source, payload)),
        };

        if let Err(source) = self.store.save_samples(walk_id, &payload.samples).await {
            return Err(self.persistence_failed(source, payload));
        }

        info!(walk_id, samples = payload.samples.len(), "Walk saved");
        let _ = self.events.send(WalkEvent::Saved { walk_id });

        Ok(SavedWalk { walk_id, payload })
    }

    /// Throws the walk away without saving and waits for its task to finish.
    /// A start still waiting for its first fix gets `TrackerClosed`.
    pub async fn abandon(self) {
        if self.commands.send(Command::Abandon).await.is_ok() {
            let _ = self.task.await;
        }
    }

    fn persistence_failed(&self, source: PersistenceError, payload: Arc<WalkPayload>) -> SessionError {
        error!("Failed to save walk: {}", source);
        let err = SessionError::Persistence { source, payload };
        let _ = self.events.send(WalkEvent::Error(err.kind()));
        err
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, SessionError> {
        send_request(&self.commands, command).await
    }
}

async fn send_request<T>(
    commands: &mpsc::Sender<Command>,
    command: impl FnOnce(Reply<T>) -> Command,
) -> Result<T, SessionError> {
    let (reply, response) = oneshot::channel();
    commands
        .send(command(reply))
        .await
        .map_err(|_| SessionError::TrackerClosed)?;
    response.await.map_err(|_| SessionError::TrackerClosed)?
}
