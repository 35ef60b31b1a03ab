pub mod format;
pub mod geo;
pub mod location_sample;
pub mod pet;
pub mod walk;
