use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use walk_tracker_lib::{
    location_sample::LocationSample,
    pet::PetId,
    walk::{WalkDetails, WalkPayload},
};

use crate::{route::Route, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Paused,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        })
    }
}

/// The operation that was attempted, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Resume,
    Stop,
    Record,
    Finalize,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Start => "start",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Stop => "stop",
            Action::Record => "record a location on",
            Action::Finalize => "finalize",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    Accepted { increment_meters: f64 },
    /// The walk is paused. The sample was dropped and added no distance.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkProgress {
    pub state: SessionState,
    pub distance_meters: f64,
    pub duration_millis: i64,
    pub sample_count: usize,
    pub current_location: Option<LocationSample>,
}

/// One tracked walk. `Idle -> Active <-> Paused -> Stopped`.
///
/// Every method that moves time forward takes `now` explicitly, so the same
/// session can be driven by a live clock or by the timestamps of a recorded route.
/// A method called from a state that does not allow it returns
/// [`SessionError::InvalidStateTransition`] and changes nothing.
#[derive(Debug, Clone)]
pub struct WalkSession {
    pet_id: Option<PetId>,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    paused_since: Option<DateTime<Utc>>,
    paused_total: TimeDelta,
    route: Route,
    details: WalkDetails,
    finalized: bool,
}

impl Default for WalkSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkSession {
    pub fn new() -> Self {
        Self {
            pet_id: None,
            state: SessionState::Idle,
            started_at: None,
            ended_at: None,
            paused_since: None,
            paused_total: TimeDelta::zero(),
            route: Route::new(),
            details: WalkDetails::default(),
            finalized: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pet_id(&self) -> Option<&PetId> {
        self.pet_id.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn samples(&self) -> &[LocationSample] {
        self.route.samples()
    }

    pub fn distance_meters(&self) -> f64 {
        self.route.distance_meters()
    }

    pub fn details(&self) -> &WalkDetails {
        &self.details
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure(&self, action: Action, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidStateTransition {
                state: self.state,
                action,
            })
        }
    }

    /// Begins the walk with `first_fix` as its first sample.
    pub fn start(&mut self, pet_id: PetId, first_fix: LocationSample, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure(Action::Start, &[SessionState::Idle])?;
        if pet_id.is_empty() {
            return Err(SessionError::InvalidPetId);
        }

        self.pet_id = Some(pet_id);
        self.route.push(first_fix);
        self.started_at = Some(now);
        self.state = SessionState::Active;
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure(Action::Pause, &[SessionState::Active])?;
        self.paused_since = Some(self.not_before_start(now));
        self.state = SessionState::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure(Action::Resume, &[SessionState::Paused])?;
        self.close_pause(now);
        self.state = SessionState::Active;
        Ok(())
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure(Action::Stop, &[SessionState::Active, SessionState::Paused])?;
        self.close_pause(now);
        self.ended_at = Some(self.not_before_start(now));
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Ends a walk whose first fix never arrived. The session is stopped
    /// without any samples and can not be finalized.
    pub fn cancel_start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure(Action::Stop, &[SessionState::Idle])?;
        self.ended_at = Some(now);
        self.state = SessionState::Stopped;
        Ok(())
    }

    pub fn record(&mut self, sample: LocationSample) -> Result<SampleOutcome, SessionError> {
        match self.state {
            SessionState::Active => Ok(SampleOutcome::Accepted {
                increment_meters: self.route.push(sample),
            }),
            SessionState::Paused => Ok(SampleOutcome::Ignored),
            state => Err(SessionError::InvalidStateTransition {
                state,
                action: Action::Record,
            }),
        }
    }

    pub fn set_details(&mut self, details: WalkDetails) -> Result<(), SessionError> {
        if self.finalized {
            return Err(SessionError::AlreadyFinalized);
        }
        self.details = details;
        Ok(())
    }

    /// Time since start, not counting pauses. Always derived from the
    /// recorded timestamps, never from a tick count.
    pub fn duration(&self, now: DateTime<Utc>) -> TimeDelta {
        let Some(started_at) = self.started_at else {
            return TimeDelta::zero();
        };

        let end = self.ended_at.unwrap_or(now);
        let open_pause = self
            .paused_since
            .map(|since| (end - since).max(TimeDelta::zero()))
            .unwrap_or_else(TimeDelta::zero);

        (end - started_at - self.paused_total - open_pause).max(TimeDelta::zero())
    }

    pub fn progress(&self, now: DateTime<Utc>) -> WalkProgress {
        WalkProgress {
            state: self.state,
            distance_meters: self.route.distance_meters(),
            duration_millis: self.duration(now).num_milliseconds(),
            sample_count: self.route.len(),
            current_location: self.route.last().copied(),
        }
    }

    /// Packages a stopped walk for storage. Only succeeds once.
    pub fn finalize(&mut self) -> Result<WalkPayload, SessionError> {
        if self.finalized {
            return Err(SessionError::AlreadyFinalized);
        }
        self.ensure(Action::Finalize, &[SessionState::Stopped])?;

        let (Some(pet_id), Some(started_at), Some(ended_at)) = (self.pet_id.clone(), self.started_at, self.ended_at) else {
            return Err(SessionError::EmptySession);
        };

        let duration_millis = self.duration(ended_at).num_milliseconds();
        self.finalized = true;

        Ok(WalkPayload {
            pet_id,
            started_at,
            ended_at,
            duration_seconds: (duration_millis + 500) / 1000,
            distance_meters: self.route.distance_meters(),
            details: self.details.clone(),
            samples: self.route.samples().to_vec(),
        })
    }

    fn close_pause(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total = self.paused_total + (now - since).max(TimeDelta::zero());
        }
    }

    fn not_before_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.started_at.map_or(now, |started_at| now.max(started_at))
    }
}
