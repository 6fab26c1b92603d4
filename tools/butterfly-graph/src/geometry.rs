//! Edge geometry: great-circle lengths and Douglas-Peucker simplification

use geo::{HaversineDistance, Point};

/// A coordinate with optional elevation (`NaN` when the graph is 2D)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: f64::NAN,
        }
    }

    pub fn with_ele(lat: f64, lon: f64, ele: f64) -> Self {
        Self { lat, lon, ele }
    }

    pub fn has_ele(&self) -> bool {
        !self.ele.is_nan()
    }
}

pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    p1.haversine_distance(&p2)
}

/// Distance between two points, including the climb when both carry an elevation
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let flat = haversine_distance(a, b);
    if a.has_ele() && b.has_ele() {
        let climb = b.ele - a.ele;
        (flat * flat + climb * climb).sqrt()
    } else {
        flat
    }
}

/// Cumulative length of a point list
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Douglas-Peucker simplification with a separate elevation bound.
///
/// The first and last point are always kept. Horizontal deviation is
/// measured in metres on a local equirectangular projection.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier {
    max_distance: f64,
    elevation_max_distance: Option<f64>,
}

impl Simplifier {
    pub fn new(max_distance: f64, elevation_max_distance: Option<f64>) -> Self {
        Self {
            max_distance,
            elevation_max_distance: elevation_max_distance.filter(|d| !d.is_nan()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_distance > 0.0
    }

    pub fn simplify(&self, points: &mut Vec<GeoPoint>) {
        if !self.is_enabled() || points.len() < 3 {
            return;
        }
        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[points.len() - 1] = true;
        self.mark(points, 0, points.len() - 1, &mut keep);

        let mut flags = keep.into_iter();
        points.retain(|_| flags.next().unwrap_or(true));
    }

    fn mark(&self, points: &[GeoPoint], first: usize, last: usize, keep: &mut [bool]) {
        if last <= first + 1 {
            return;
        }

        // Find the point that deviates most from the line between first and last
        let mut worst = 0.0;
        let mut worst_idx = first;
        for i in first + 1..last {
            let score = self.deviation(&points[i], &points[first], &points[last]);
            if score > worst {
                worst = score;
                worst_idx = i;
            }
        }

        if worst > 1.0 {
            keep[worst_idx] = true;
            self.mark(points, first, worst_idx, keep);
            self.mark(points, worst_idx, last, keep);
        }
    }

    /// Deviation relative to the tolerances: above 1.0 means the point must stay
    fn deviation(&self, point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
        let (dist, t) = perpendicular_distance(point, start, end);
        let mut score = dist / self.max_distance;

        if let Some(ele_max) = self.elevation_max_distance {
            if point.has_ele() && start.has_ele() && end.has_ele() {
                let expected = start.ele + t * (end.ele - start.ele);
                let ele_dev = (point.ele - expected).abs();
                let ele_score = if ele_max > 0.0 {
                    ele_dev / ele_max
                } else if ele_dev > 0.0 {
                    f64::INFINITY
                } else {
                    0.0
                };
                score = score.max(ele_score);
            }
        }
        score
    }
}

/// Distance in metres from a point to the segment start-end, and the
/// position of its projection along the segment (0..=1)
fn perpendicular_distance(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> (f64, f64) {
    let scale = start.lat.to_radians().cos();
    let project = |p: &GeoPoint| {
        (
            (p.lon - start.lon).to_radians() * scale * EARTH_RADIUS_M,
            (p.lat - start.lat).to_radians() * EARTH_RADIUS_M,
        )
    };
    let (px, py) = project(point);
    let (ex, ey) = project(end);

    let len_sq = ex * ex + ey * ey;
    if len_sq == 0.0 {
        return ((px * px + py * py).sqrt(), 0.0);
    }

    let t = ((px * ex + py * ey) / len_sq).clamp(0.0, 1.0);
    let dx = px - t * ex;
    let dy = py - t * ey;
    ((dx * dx + dy * dy).sqrt(), t)
}
