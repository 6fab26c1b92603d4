//! Tag encoding collaborator
//!
//! Decides which ways are routable, turns way tags into directional edge
//! flags and validates the tag combination of turn restriction relations.
//! `CarEncoder` is the reference implementation for motor cars.

use crate::element::{ReaderRelation, ReaderWay, Tags};
use crate::restriction::RestrictionType;

/// Route relation membership bits, accumulated per member way
pub type RelationFlags = u64;

pub mod relation_bits {
    pub const FERRY_ROUTE: u32 = 0;
    pub const ROAD_ROUTE: u32 = 1;
}

/// Bit positions of `EdgeFlags::class_bits`
pub mod class_bits {
    pub const LINK: u32 = 0;
    pub const RESIDENTIAL: u32 = 1;
    pub const SERVICE: u32 = 2;
    pub const LIVING_STREET: u32 = 3;
    pub const TOLL: u32 = 4;
    pub const TUNNEL: u32 = 5;
    pub const BRIDGE: u32 = 6;
    pub const FERRY: u32 = 7;
    pub const BARRIER: u32 = 8;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeFlags {
    pub forward: bool,
    pub backward: bool,
    pub speed_kmh: f64,
    pub class_bits: u32,
    pub relation_flags: RelationFlags,
}

impl EdgeFlags {
    pub fn both_ways(speed_kmh: f64) -> Self {
        Self {
            forward: true,
            backward: true,
            speed_kmh,
            ..Self::default()
        }
    }

    pub fn has_class(&self, bit: u32) -> bool {
        self.class_bits & (1 << bit) != 0
    }
}

/// A turn restriction whose tags make no sense
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("restriction tags rejected: {0}")]
pub struct TagRejection(pub String);

pub trait TagEncoder {
    /// Whether the way takes part in the graph at all
    fn accept_way(&self, way: &ReaderWay) -> bool;

    /// Fold one route relation into the flags of a member way
    fn handle_route_relation(
        &self,
        relation: &ReaderRelation,
        previous: RelationFlags,
    ) -> RelationFlags;

    /// Directional flags for an edge; `tags` already carry area tags
    fn encode_way(&self, tags: &Tags, relation_flags: RelationFlags) -> EdgeFlags;

    /// `Ok(None)` when the restriction does not apply to this vehicle
    fn restriction_type(&self, tags: &Tags) -> Result<Option<RestrictionType>, TagRejection>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CarEncoder;

impl CarEncoder {
    /// Speed (km/h) and accessibility of a highway value
    fn highway_speed(highway: &str) -> Option<f64> {
        let speed = match highway {
            // Motorways
            "motorway" => 110.0,
            "motorway_link" => 60.0,

            // Trunk roads
            "trunk" => 90.0,
            "trunk_link" => 50.0,

            // Primary roads
            "primary" => 70.0,
            "primary_link" => 40.0,

            "secondary" => 60.0,
            "secondary_link" => 40.0,

            "tertiary" => 50.0,
            "tertiary_link" => 30.0,

            // Unclassified and residential
            "unclassified" => 50.0,
            "residential" => 30.0,

            // Service roads
            "service" => 20.0,
            "living_street" => 10.0,
            "road" => 20.0,

            // Tracks, pedestrian/cyclist infrastructure, construction
            _ => return None,
        };
        Some(speed)
    }

    fn is_ferry(tags: &Tags) -> bool {
        tags.has_tag("route", "ferry")
    }
}

fn is_denied(value: Option<&str>) -> bool {
    matches!(value, Some("no") | Some("private"))
}

fn speed_from_maxspeed(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(mph) = value.strip_suffix("mph") {
        return mph.trim().parse::<f64>().ok().map(|v| v * 1.609_344);
    }
    value.parse::<f64>().ok().filter(|v| *v > 0.0)
}

impl TagEncoder for CarEncoder {
    fn accept_way(&self, way: &ReaderWay) -> bool {
        if way.nodes.len() < 2 {
            return false;
        }
        let tags = &way.tags;
        if is_denied(tags.get("motorcar"))
            || is_denied(tags.get("motor_vehicle"))
            || is_denied(tags.get("vehicle"))
            || is_denied(tags.get("access"))
        {
            return false;
        }
        if Self::is_ferry(tags) {
            return true;
        }
        tags.get("highway")
            .and_then(Self::highway_speed)
            .is_some()
    }

    fn handle_route_relation(
        &self,
        relation: &ReaderRelation,
        previous: RelationFlags,
    ) -> RelationFlags {
        match relation.tags.get("route") {
            Some("ferry") => previous | (1 << relation_bits::FERRY_ROUTE),
            Some("road") => previous | (1 << relation_bits::ROAD_ROUTE),
            _ => previous,
        }
    }

    fn encode_way(&self, tags: &Tags, relation_flags: RelationFlags) -> EdgeFlags {
        let mut flags = EdgeFlags {
            relation_flags,
            ..EdgeFlags::default()
        };

        let highway = tags.get("highway").unwrap_or("");
        let ferry = Self::is_ferry(tags) || relation_flags & (1 << relation_bits::FERRY_ROUTE) != 0;
        let base_speed = match Self::highway_speed(highway) {
            Some(speed) => speed,
            None if ferry => 20.0,
            None => return flags,
        };

        flags.forward = true;
        flags.backward = true;
        flags.speed_kmh = tags
            .get("maxspeed")
            .and_then(speed_from_maxspeed)
            .map(|max| max.min(base_speed * 1.2))
            .unwrap_or(base_speed);

        match tags.get("oneway") {
            Some("yes" | "1" | "true") => flags.backward = false,
            Some("-1" | "reverse") => flags.forward = false,
            Some(_) => {}
            // Motorways and roundabouts are oneway by default
            None => {
                if highway == "motorway"
                    || highway == "motorway_link"
                    || tags.has_tag("junction", "roundabout")
                {
                    flags.backward = false;
                }
            }
        }

        if highway.ends_with("_link") {
            flags.class_bits |= 1 << class_bits::LINK;
        }
        match highway {
            "residential" => flags.class_bits |= 1 << class_bits::RESIDENTIAL,
            "service" => flags.class_bits |= 1 << class_bits::SERVICE,
            "living_street" => flags.class_bits |= 1 << class_bits::LIVING_STREET,
            _ => {}
        }
        if tags.has_tag("toll", "yes") {
            flags.class_bits |= 1 << class_bits::TOLL;
        }
        if tags.has_tag("tunnel", "yes") {
            flags.class_bits |= 1 << class_bits::TUNNEL;
        }
        if tags.has_tag("bridge", "yes") {
            flags.class_bits |= 1 << class_bits::BRIDGE;
        }
        if ferry {
            flags.class_bits |= 1 << class_bits::FERRY;
        }
        flags
    }

    fn restriction_type(&self, tags: &Tags) -> Result<Option<RestrictionType>, TagRejection> {
        // Exceptions for cars void the whole restriction
        if let Some(except) = tags.get("except") {
            if except
                .split(';')
                .any(|v| matches!(v.trim(), "motorcar" | "motor_vehicle"))
            {
                return Ok(None);
            }
        }

        let value = match tags.get("restriction:motorcar").or_else(|| tags.get("restriction")) {
            Some(value) => value,
            // restricted for another vehicle type only
            None if tags.iter().any(|(k, _)| k.starts_with("restriction:")) => return Ok(None),
            None => return Err(TagRejection("missing restriction tag".to_string())),
        };

        if value.starts_with("no_") {
            Ok(Some(RestrictionType::No))
        } else if value.starts_with("only_") {
            Ok(Some(RestrictionType::Only))
        } else {
            Err(TagRejection(format!("unknown restriction value '{value}'")))
        }
    }
}
