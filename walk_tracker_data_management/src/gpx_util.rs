use std::{fs::File, io::{BufReader, BufWriter}, path::{Path, PathBuf}};

use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Metadata, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;
use tracing::{debug, info};
use walk_tracker::WalkSession;
use walk_tracker_lib::{location_sample::LocationSample, pet::PetId, walk::{WalkDetails, WalkPayload, WalkRecord}};

use crate::{DataManager, DataManagerError, GPX_DIR};

/// Track points read from a GPX file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxRoute {
    pub name: Option<String>,
    pub description: Option<String>,
    pub samples: Vec<LocationSample>,
}

impl DataManager {
    /// Replays the route in a GPX file as a walk for `pet_id` and stores it.
    pub async fn add_gpx_walk(&self, pet_id: PetId, path: &Path, title: Option<String>) -> Result<i64, DataManagerError> {
        let route = import_gpx(path)?;
        let details = WalkDetails {
            title: title.or(route.name.clone()).unwrap_or_default(),
            description: route.description.clone().unwrap_or_default(),
            ..Default::default()
        };

        let payload = replay_route(pet_id, &route.samples, details)?;
        self.save_walk(&payload).await
    }

    pub async fn export_walk_gpx(&self, walk_id: i64, path: &Path) -> Result<(), DataManagerError> {
        let walk = self.get_walk(walk_id).await?;
        export_gpx(&walk, path)?;
        info!(walk_id, path = %path.display(), "Exported walk");
        Ok(())
    }
}

/// `GPX_DIR` under the project root, created if missing.
pub fn default_gpx_dir() -> Result<PathBuf, DataManagerError> {
    let root = project_root::get_project_root()
        .map_err(|err| DataManagerError::Io(format!("Failed to find project root: {}", err)))?;
    let dir = root.join(GPX_DIR);
    std::fs::create_dir_all(&dir)
        .map_err(|err| DataManagerError::Io(format!("Failed to create {:?}: {}", dir, err)))?;
    Ok(dir)
}

pub fn import_gpx(path: &Path) -> Result<GpxRoute, DataManagerError> {
    let file = File::open(path)
        .map_err(|err| DataManagerError::Io(format!("Failed to open {:?}: {}", path, err)))?;
    let gpx = gpx::read(BufReader::new(file))
        .map_err(|err| DataManagerError::Gpx(format!("Failed to parse {:?}: {}", path, err)))?;

    let mut name = None;
    let mut description = None;
    let mut fallback_time = None;
    if let Some(meta) = gpx.metadata {
        name = meta.name;
        description = meta.description;
        fallback_time = meta.time.map(to_chrono).transpose()?;
    }

    let mut samples: Vec<LocationSample> = Vec::new();
    for track in gpx.tracks {
        if name.is_none() {
            name = track.name;
        }
        for segment in track.segments {
            for point in segment.points {
                let timestamp = match point.time {
                    Some(time) => to_chrono(time)?,
                    None => fallback_time
                        .ok_or_else(|| DataManagerError::Gpx("Track point has no time".to_string()))?,
                };

                // hdop is a dilution factor, not meters, so accuracy stays unknown
                samples.push(LocationSample::from_position(point.point(), timestamp));
            }
        }
    }

    debug!(samples = samples.len(), "Read GPX route");
    Ok(GpxRoute {
        name,
        description,
        samples,
    })
}

/// Writes the walk as a GPX 1.1 file with a single track segment. GPX has no
/// field for accuracy in meters, so it is left out.
pub fn export_gpx(walk: &WalkRecord, path: &Path) -> Result<(), DataManagerError> {
    let mut segment = TrackSegment::new();
    for sample in &walk.samples {
        let mut point = Waypoint::new(sample.position());
        point.time = Some(to_gpx_time(sample.timestamp)?);
        segment.points.push(point);
    }

    let mut track = Track::new();
    track.name = Some(walk.title.clone());
    track.segments.push(segment);

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("walk_tracker".to_string()),
        metadata: Some(Metadata {
            name: Some(walk.title.clone()),
            description: (!walk.description.is_empty()).then(|| walk.description.clone()),
            time: Some(to_gpx_time(walk.start_time)?),
            ..Default::default()
        }),
        tracks: vec![track],
        ..Default::default()
    };

    let file = File::create(path)
        .map_err(|err| DataManagerError::Io(format!("Failed to create {:?}: {}", path, err)))?;
    gpx::write(&gpx, BufWriter::new(file))
        .map_err(|err| DataManagerError::Gpx(format!("Failed to write {:?}: {}", path, err)))
}

/// Runs the samples through a walk session, using each sample's own time as
/// the clock, and returns the finalized walk.
pub fn replay_route(pet_id: PetId, samples: &[LocationSample], details: WalkDetails) -> Result<WalkPayload, DataManagerError> {
    let replay_failed = |err: walk_tracker::SessionError| DataManagerError::Gpx(format!("Failed to replay route: {}", err));

    let Some((first, rest)) = samples.split_first() else {
        return Err(DataManagerError::Gpx("Route has no track points".to_string()));
    };

    let mut session = WalkSession::new();
    session.start(pet_id, *first, first.timestamp).map_err(replay_failed)?;
    for sample in rest {
        session.record(*sample).map_err(replay_failed)?;
    }

    let end = rest.last().unwrap_or(first).timestamp;
    session.stop(end).map_err(replay_failed)?;
    session.set_details(details).map_err(replay_failed)?;
    session.finalize().map_err(replay_failed)
}

fn to_chrono(time: Time) -> Result<DateTime<Utc>, DataManagerError> {
    let time: OffsetDateTime = time.into();
    DateTime::from_timestamp(time.unix_timestamp(), time.nanosecond())
        .ok_or_else(|| DataManagerError::Gpx(format!("Time out of range: {}", time)))
}

fn to_gpx_time(time: DateTime<Utc>) -> Result<Time, DataManagerError> {
    OffsetDateTime::from_unix_timestamp_nanos(time.timestamp_millis() as i128 * 1_000_000)
        .map(Time::from)
        .map_err(|err| DataManagerError::Gpx(format!("Time out of range: {}", err)))
}
