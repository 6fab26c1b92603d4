//! Elevation lookup for tower and pillar nodes

/// Resolves the elevation of a coordinate; `NaN` means unknown (2D graph)
pub trait ElevationProvider {
    fn elevation(&self, lat: f64, lon: f64) -> f64;

    /// Free any tile caches once reading is done
    fn release(&mut self) {}
}

/// No elevation data at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElevation;

impl ElevationProvider for NoElevation {
    fn elevation(&self, _lat: f64, _lon: f64) -> f64 {
        f64::NAN
    }
}

/// Same elevation everywhere, handy for fixtures
#[derive(Debug, Clone, Copy)]
pub struct FixedElevation(pub f64);

impl ElevationProvider for FixedElevation {
    fn elevation(&self, _lat: f64, _lon: f64) -> f64 {
        self.0
    }
}
