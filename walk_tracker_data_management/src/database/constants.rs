pub const WALKS_TABLE_NAME: &str = "walks";
pub const WALK_ID: &str = "walk_id";
pub const PET_ID: &str = "pet_id";
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const NOTES: &str = "notes";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const DURATION: &str = "duration";
pub const DISTANCE: &str = "distance";
pub const ROUTE_DATA: &str = "route_data";

pub const WALK_LOCATIONS_TABLE_NAME: &str = "walk_locations";
// Walk id
pub const SEQ: &str = "seq";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const ACCURACY: &str = "accuracy";
pub const TIMESTAMP: &str = "timestamp";
