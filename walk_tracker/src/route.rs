use walk_tracker_lib::{geo::sample_distance, location_sample::LocationSample};

/// The ordered samples of a walk together with their running distance.
/// Each push adds one leg, so the cost per sample does not grow with the route.
#[derive(Debug, Clone, Default)]
pub struct Route {
    samples: Vec<LocationSample>,
    distance_meters: f64,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the sample and returns the distance it added.
    /// A repeated position adds nothing but is still kept.
    pub fn push(&mut self, sample: LocationSample) -> f64 {
        let increment = self
            .samples
            .last()
            .map(|previous| sample_distance(previous, &sample))
            .unwrap_or(0.);

        self.distance_meters += increment;
        self.samples.push(sample);
        increment
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&LocationSample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
