use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::{JoinError, JoinHandle},
    time::{Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use walk_tracker_lib::{
    location_sample::LocationSample,
    pet::PetId,
    walk::{WalkDetails, WalkPayload},
};

use crate::{
    location::SubscriptionGuard, Action, Clock, LocationError, LocationProvider, LocationUpdate, SampleOutcome, SessionError,
    SessionState, TrackerConfig, WalkEvent, WalkProgress, WalkSession,
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

pub(crate) enum Command {
    Start { pet_id: PetId, reply: Reply<()> },
    Pause { reply: Reply<()> },
    Resume { reply: Reply<()> },
    Stop { reply: Reply<()> },
    SetDetails { details: WalkDetails, reply: Reply<()> },
    Snapshot { reply: Reply<WalkProgress> },
    Finalize { reply: Reply<Arc<WalkPayload>> },
    Abandon,
}

struct PendingStart {
    pet_id: PetId,
    reply: Reply<()>,
    fix: JoinHandle<Result<LocationSample, LocationError>>,
}

/// Owns one walk. Every change to the session happens on this task, so
/// location updates, timer ticks and commands can never interleave.
pub(crate) struct SessionActor {
    session: WalkSession,
    provider: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    events: broadcast::Sender<WalkEvent>,

    pending_start: Option<PendingStart>,
    subscription: Option<SubscriptionGuard>,
    ticker: Option<Interval>,
}

impl SessionActor {
    pub(crate) fn new(
        provider: Arc<dyn LocationProvider>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
        events: broadcast::Sender<WalkEvent>,
    ) -> Self {
        Self {
            session: WalkSession::new(),
            provider,
            clock,
            config,
            events,
            pending_start: None,
            subscription: None,
            ticker: None,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            // Location updates are drained before commands, so a fix that was
            // delivered before a pause or stop is applied before it.
            tokio::select! {
                biased;

                fix = next_fix(&mut self.pending_start) => self.on_fix(fix),
                update = next_update(&mut self.subscription) => match update {
                    Some(update) => self.on_update(update),
                    None => {
                        warn!("Location updates ended while walk is {}", self.session.state());
                        self.subscription = None;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Abandon) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = next_tick(&mut self.ticker) => self.on_tick(),
            }
        }

        self.release();
        if !self.session.is_finalized() && !self.session.samples().is_empty() {
            info!(samples = self.session.samples().len(), "Walk discarded without saving");
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start { pet_id, reply } => self.request_fix(pet_id, reply),
            Command::Pause { reply } => {
                let result = self.session.pause(self.clock.now()).map(|_| {
                    info!("Walk paused");
                    self.emit(WalkEvent::Paused);
                });
                self.respond(reply, result);
            }
            Command::Resume { reply } => {
                let result = self.session.resume(self.clock.now()).map(|_| {
                    info!("Walk resumed");
                    self.emit(WalkEvent::Resumed);
                });
                self.respond(reply, result);
            }
            Command::Stop { reply } => {
                let result = self.stop();
                self.respond(reply, result);
            }
            Command::SetDetails { details, reply } => {
                let result = self.session.set_details(details);
                self.respond(reply, result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(self.session.progress(self.clock.now())));
            }
            Command::Finalize { reply } => {
                let result = self.session.finalize().map(|payload| {
                    info!(pet_id = %payload.pet_id, "Walk finalized");
                    Arc::new(payload)
                });
                self.respond(reply, result);
            }
            Command::Abandon => {}
        }
    }

    /// Kicks off the first fix without waiting for it. The result comes back
    /// through `next_fix` so that a stop can still be served meanwhile.
    fn request_fix(&mut self, pet_id: PetId, reply: Reply<()>) {
        if self.pending_start.is_some() || self.session.state() != SessionState::Idle {
            let err = SessionError::InvalidStateTransition {
                state: self.session.state(),
                action: Action::Start,
            };
            return self.respond(reply, Err(err));
        }
        if pet_id.is_empty() {
            return self.respond(reply, Err(SessionError::InvalidPetId));
        }

        debug!(%pet_id, "Requesting first location fix");
        let provider = self.provider.clone();
        let timeout = self.config.fix_timeout;
        let fix = tokio::spawn(async move {
            tokio::time::timeout(timeout, provider.request_once())
                .await
                .unwrap_or(Err(LocationError::Timeout))
        });

        self.pending_start = Some(PendingStart { pet_id, reply, fix });
    }

    fn on_fix(&mut self, fix: Result<Result<LocationSample, LocationError>, JoinError>) {
        let Some(PendingStart { pet_id, reply, .. }) = self.pending_start.take() else {
            return;
        };

        let fix = fix.unwrap_or_else(|err| Err(LocationError::Unavailable(err.to_string())));
        let result = fix.map_err(SessionError::from).and_then(|fix| self.begin(pet_id, fix));
        self.respond(reply, result);
    }

    fn begin(&mut self, pet_id: PetId, first_fix: LocationSample) -> Result<(), SessionError> {
        // Dropped again on any error below, which unsubscribes
        let subscription = SubscriptionGuard::open(&self.provider)?;

        let now = self.clock.now();
        self.session.start(pet_id.clone(), first_fix, now)?;

        let period = self.config.tick_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.subscription = Some(subscription);
        self.ticker = Some(ticker);

        info!(%pet_id, "Walk started");
        self.emit(WalkEvent::Started { pet_id, started_at: now });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now();

        if let Some(pending) = self.pending_start.take() {
            pending.fix.abort();
            self.session.cancel_start(now)?;
            self.report(&SessionError::StartCancelled);
            let _ = pending.reply.send(Err(SessionError::StartCancelled));
            info!("Walk stopped before the first fix");
        } else {
            self.session.stop(now)?;
            self.release();
            info!(
                distance = self.session.distance_meters(),
                samples = self.session.samples().len(),
                "Walk stopped"
            );
        }

        self.emit(WalkEvent::Stopped {
            ended_at: self.session.ended_at().unwrap_or(now),
        });
        Ok(())
    }

    fn on_update(&mut self, update: LocationUpdate) {
        let sample = match update {
            Ok(sample) => sample,
            Err(err) => {
                warn!("Location update failed: {}", err);
                self.report(&SessionError::LocationUnavailable(err));
                return;
            }
        };

        match self.session.record(sample) {
            Ok(SampleOutcome::Accepted { increment_meters }) => debug!(
                increment = increment_meters,
                total = self.session.distance_meters(),
                "Recorded location"
            ),
            Ok(SampleOutcome::Ignored) => debug!("Ignoring location while paused"),
            Err(err) => debug!("Dropping location: {}", err),
        }
    }

    fn on_tick(&mut self) {
        self.emit(WalkEvent::Progress(self.session.progress(self.clock.now())));
    }

    /// Releases the location subscription, the duration timer and any
    /// outstanding first fix.
    fn release(&mut self) {
        self.subscription = None;
        self.ticker = None;
        if let Some(pending) = self.pending_start.take() {
            pending.fix.abort();
            let _ = pending.reply.send(Err(SessionError::TrackerClosed));
        }
    }

    fn respond<T>(&self, reply: Reply<T>, result: Result<T, SessionError>) {
        if let Err(err) = &result {
            self.report(err);
        }
        // The caller may have given up waiting
        let _ = reply.send(result);
    }

    fn report(&self, err: &SessionError) {
        debug!(state = %self.session.state(), "Walk operation failed: {}", err);
        self.emit(WalkEvent::Error(err.kind()));
    }

    fn emit(&self, event: WalkEvent) {
        // No listeners is fine
        let _ = self.events.send(event);
    }
}

async fn next_fix(pending: &mut Option<PendingStart>) -> Result<Result<LocationSample, LocationError>, JoinError> {
    match pending {
        Some(pending) => (&mut pending.fix).await,
        None => std::future::pending().await,
    }
}

async fn next_update(subscription: &mut Option<SubscriptionGuard>) -> Option<LocationUpdate> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
