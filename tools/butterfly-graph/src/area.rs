//! Geographic area lookup
//!
//! Areas containing a way (countries, custom zones) contribute extra tags that
//! are merged into the way tags before encoding.

use crate::element::Tags;
use crate::geometry::GeoPoint;

pub trait AreaIndex {
    /// Tags of every area containing the point
    fn query(&self, point: &GeoPoint) -> Tags;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoAreas;

impl AreaIndex for NoAreas {
    fn query(&self, _point: &GeoPoint) -> Tags {
        Tags::new()
    }
}

/// Axis-aligned boxes with tags, first match wins per key
#[derive(Debug, Clone, Default)]
pub struct BoxAreas {
    areas: Vec<(GeoPoint, GeoPoint, Tags)>,
}

impl BoxAreas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, south_west: GeoPoint, north_east: GeoPoint, tags: Tags) {
        self.areas.push((south_west, north_east, tags));
    }
}

impl AreaIndex for BoxAreas {
    fn query(&self, point: &GeoPoint) -> Tags {
        let mut found = Tags::new();
        for (sw, ne, tags) in &self.areas {
            let inside = point.lat >= sw.lat
                && point.lat <= ne.lat
                && point.lon >= sw.lon
                && point.lon <= ne.lon;
            if !inside {
                continue;
            }
            for (k, v) in tags.iter() {
                if !found.has(k) {
                    found.insert(k, v);
                }
            }
        }
        found
    }
}

/// Way tags with area tags added; tags already on the way win
pub fn merge_area_tags(way_tags: &Tags, area_tags: &Tags) -> Tags {
    let mut merged = way_tags.clone();
    for (k, v) in area_tags.iter() {
        if !merged.has(k) {
            merged.insert(k, v);
        }
    }
    merged
}
