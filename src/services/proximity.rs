// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription table mapping destinations to proximity listeners.

use crate::models::achievement::AchievementId;
use crate::models::destination::{Destination, DestinationId};
use std::collections::HashMap;

/// One (trigger radius, listener) pair on a destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Registration {
    /// Notify when the distance is at or below this many meters
    pub trigger_radius: f64,
    pub listener: AchievementId,
}

/// Who wants to hear about which destination, and at what radius.
#[derive(Debug, Default, Clone)]
pub struct ProximityTable {
    subscriptions: HashMap<DestinationId, Vec<Registration>>,
}

impl ProximityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration. The same listener may register several radii.
    pub fn register(
        &mut self,
        destination: DestinationId,
        listener: AchievementId,
        trigger_radius: f64,
    ) {
        self.subscriptions
            .entry(destination)
            .or_default()
            .push(Registration {
                trigger_radius,
                listener,
            });
    }

    /// Remove every registration of `listener` on `destination`.
    pub fn deregister(&mut self, destination: DestinationId, listener: AchievementId) {
        if let Some(registrations) = self.subscriptions.get_mut(&destination) {
            registrations.retain(|r| r.listener != listener);
            if registrations.is_empty() {
                self.subscriptions.remove(&destination);
            }
        }
    }

    /// Remove `listener` from every destination.
    pub fn deregister_all(&mut self, listener: AchievementId) {
        self.subscriptions.retain(|_, registrations| {
            registrations.retain(|r| r.listener != listener);
            !registrations.is_empty()
        });
    }

    /// Drop all registrations on a deleted destination.
    pub fn forget_destination(&mut self, destination: DestinationId) {
        self.subscriptions.remove(&destination);
    }

    pub fn registrations(&self, destination: DestinationId) -> &[Registration] {
        self.subscriptions
            .get(&destination)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_registered(&self, listener: AchievementId) -> bool {
        self.subscriptions
            .values()
            .flatten()
            .any(|r| r.listener == listener)
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Record the live distance and return every listener within range.
    ///
    /// A listener registered with several matching radii appears once per
    /// registration. There is no hysteresis: lingering inside the radius
    /// triggers on every update.
    pub fn update_distance(
        &self,
        destination: &mut Destination,
        distance: f64,
    ) -> Vec<AchievementId> {
        destination.distance = Some(distance);
        self.registrations(destination.id())
            .iter()
            .filter(|r| r.trigger_radius >= distance)
            .map(|r| r.listener)
            .collect()
    }
}
