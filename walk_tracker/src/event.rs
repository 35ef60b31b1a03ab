use chrono::{DateTime, Utc};
use serde::Serialize;
use walk_tracker_lib::pet::PetId;

use crate::{ErrorKind, WalkProgress};

/// Lifecycle notifications for whatever surface shows them to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WalkEvent {
    Started { pet_id: PetId, started_at: DateTime<Utc> },
    Paused,
    Resumed,
    Stopped { ended_at: DateTime<Utc> },
    Progress(WalkProgress),
    Saved { walk_id: i64 },
    Error(ErrorKind),
}
