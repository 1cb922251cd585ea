// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Compass state: position, heading, target, needle rotation and status.

use geo::{Bearing, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::destination::DestinationId;

const DISTANCE_FORMAT_MIN: f64 = 50.0;
const DISTANCE_SHOW_KILOS: f64 = 9999.0;
const DISTANCE_FORMAT_MAX: f64 = 30_000_000.0;

/// A position reported by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationFix {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Great-circle distance in meters.
pub fn distance_meters(from: Point<f64>, to: Point<f64>) -> f64 {
    Haversine.distance(from, to)
}

/// Initial bearing from `from` to `to`, degrees clockwise from north.
pub fn bearing_degrees(from: Point<f64>, to: Point<f64>) -> f64 {
    Haversine.bearing(from, to)
}

/// Needle angle relative to the phone's heading, in `[0, 360)`.
pub fn relative_bearing(bearing_to_target: f64, heading: f64) -> f64 {
    (bearing_to_target - heading + 720.0).rem_euclid(360.0)
}

/// Human-readable distance, empty when unknown.
pub fn format_distance(distance: Option<f64>) -> String {
    match distance {
        None => String::new(),
        Some(d) if d < 0.0 => String::new(),
        Some(d) if d < DISTANCE_FORMAT_MIN => format!("< {} m", DISTANCE_FORMAT_MIN as i64),
        Some(d) if d < DISTANCE_SHOW_KILOS => format!("{} m", d.round() as i64),
        Some(d) if d < DISTANCE_FORMAT_MAX => format!("{} km", (d / 1000.0).round() as i64),
        Some(_) => "error".to_string(),
    }
}

/// Turns a `[0, 360)` bearing stream into a continuous rotation so the
/// needle never spins the long way round when crossing north.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeedleRotation {
    offset: f64,
    current: f64,
}

impl NeedleRotation {
    pub fn update(&mut self, bearing: f64) -> f64 {
        if self.current > 180.0 && bearing < 180.0 && self.current - bearing > 180.0 {
            self.offset += 360.0;
        } else if self.current < 180.0 && bearing > 180.0 && self.current - bearing < -180.0 {
            self.offset -= 360.0;
        }
        self.current = bearing;
        self.rotation()
    }

    pub fn rotation(&self) -> f64 {
        self.offset + self.current
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Conditions that stop the compass from pointing anywhere.
///
/// Ordered by priority: the first variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassStatus {
    PermissionMissing,
    ProviderMissing,
    LocationMissing,
}

/// Live compass state.
#[derive(Debug, Clone, Default)]
pub struct Compass {
    position: Option<Point<f64>>,
    heading: f64,
    target: Option<DestinationId>,
    suspended_target: Option<DestinationId>,
    needle: NeedleRotation,
    statuses: BTreeSet<CompassStatus>,
}

impl Compass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<Point<f64>> {
        self.position
    }

    pub fn set_position(&mut self, position: Point<f64>) {
        self.position = Some(position);
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = heading.rem_euclid(360.0);
    }

    pub fn target(&self) -> Option<DestinationId> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<DestinationId>) {
        if self.statuses.is_empty() {
            self.target = target;
        } else {
            // Applied once the blocking status clears.
            self.suspended_target = target;
        }
        if self.target.is_none() {
            self.needle.reset();
        }
    }

    /// Point away from a deleted destination, whether it is the live target
    /// or one suspended behind a status. Returns true if anything changed.
    pub fn replace_target(
        &mut self,
        removed: DestinationId,
        replacement: Option<DestinationId>,
    ) -> bool {
        if self.suspended_target == Some(removed) {
            self.suspended_target = replacement;
            return true;
        }
        if self.target == Some(removed) {
            self.set_target(replacement);
            return true;
        }
        false
    }

    /// Highest-priority active status, if any.
    pub fn status(&self) -> Option<CompassStatus> {
        self.statuses.iter().next().copied()
    }

    /// Raise a status; the first one suspends the current target.
    pub fn raise(&mut self, status: CompassStatus) -> Option<CompassStatus> {
        if self.statuses.insert(status) && self.statuses.len() == 1 && self.target.is_some() {
            self.suspended_target = self.target.take();
            self.needle.reset();
        }
        tracing::debug!(status = ?status, "Compass status raised");
        self.status()
    }

    /// Clear a status; clearing the last one restores the suspended target.
    pub fn clear(&mut self, status: CompassStatus) -> Option<CompassStatus> {
        if self.statuses.remove(&status) && self.statuses.is_empty() {
            if let Some(target) = self.suspended_target.take() {
                self.target = Some(target);
            }
        }
        self.status()
    }

    /// Distance to `location` from the last fix.
    pub fn distance_to(&self, location: Point<f64>) -> Option<f64> {
        self.position.map(|p| distance_meters(p, location))
    }

    /// Update the needle for the target at `target_location`; returns the
    /// continuous rotation in degrees.
    pub fn update_needle(&mut self, target_location: Option<Point<f64>>) -> f64 {
        match (self.target, self.position, target_location) {
            (Some(_), Some(position), Some(location)) => {
                let bearing = relative_bearing(bearing_degrees(position, location), self.heading);
                self.needle.update(bearing)
            }
            _ => {
                self.needle.reset();
                0.0
            }
        }
    }
}
