// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement registry: definition table, wiring, dispatch and persistence.
//!
//! The registry owns the proximity table. A distance update on a destination
//! is turned into proximity events, each event is applied to its achievement,
//! and achievements that complete are removed from the table. State is only
//! written to the key/value store by [`AchievementRegistry::flush`].

use chrono::{DateTime, FixedOffset, TimeDelta};
use std::time::Duration;

use crate::db::{KeyValueStore, WriteBatch};
use crate::error::Result;
use crate::models::achievement::{
    Achievement, AchievementId, AchievementKind, AchievementView, CollectionVisit, Streak,
    VisitCounter,
};
use crate::models::destination::{Destination, DestinationId};
use crate::services::destinations::DestinationStore;
use crate::services::proximity::ProximityTable;

const HOURS_23: Duration = Duration::from_secs(23 * 60 * 60);
const HOURS_24: Duration = Duration::from_secs(24 * 60 * 60);

/// Policy and constants of a configured achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindDef {
    VisitCounter { debounce: Duration },
    /// `timeout: None` never expires a visit.
    CollectionVisit { timeout: Option<Duration> },
    DailyStreak,
    WeeklyStreak,
}

/// One row of the achievement configuration table.
#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon_id: &'static str,
    /// Watched destinations, by exact name
    pub destinations: &'static [&'static str],
    pub preconfigured_only: bool,
    pub target: u32,
    pub kind: KindDef,
}

const KB: &[&str] = &["KB"];
const LYNGBY_BARS: &[&str] = &["KB", "Hegnet", "Diamanten", "Diagonalen", "Etheren"];
const ALL_BARS: &[&str] = &["KB", "Hegnet", "Diamanten", "Diagonalen", "Etheren", "Verners"];

/// The campus achievement set.
pub const DEFAULT_ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        key: "achievement_visit_kb",
        name: "First round",
        description: "Visit KB.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 1,
        kind: KindDef::VisitCounter { debounce: HOURS_23 },
    },
    AchievementDef {
        key: "achievement_visit_kb2",
        name: "Regular",
        description: "Visit KB on 16 different days.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 16,
        kind: KindDef::VisitCounter { debounce: HOURS_23 },
    },
    AchievementDef {
        key: "achievement_visit_kb3",
        name: "Furniture",
        description: "Visit KB on 64 different days.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 64,
        kind: KindDef::VisitCounter { debounce: HOURS_23 },
    },
    AchievementDef {
        key: "achievement_visit_kb4",
        name: "Landmark",
        description: "Visit KB on 256 different days.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 256,
        kind: KindDef::VisitCounter { debounce: HOURS_23 },
    },
    AchievementDef {
        key: "achievement_year_kb",
        name: "A year of Fridays",
        description: "Visit KB every week for a year.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 52,
        kind: KindDef::WeeklyStreak,
    },
    AchievementDef {
        key: "achievement_visit_verners",
        name: "Road trip",
        description: "Visit Verners in Ballerup.",
        icon_id: "local_drink",
        destinations: &["Verners"],
        preconfigured_only: true,
        target: 1,
        kind: KindDef::VisitCounter { debounce: HOURS_23 },
    },
    AchievementDef {
        key: "achievement_visit_all",
        name: "Collector",
        description: "Visit every bar at least once.",
        icon_id: "sports_bar",
        destinations: ALL_BARS,
        preconfigured_only: true,
        target: 6,
        kind: KindDef::CollectionVisit { timeout: None },
    },
    AchievementDef {
        key: "achievement_crawl",
        name: "Bar crawl",
        description: "Visit all five Lyngby bars within 24 hours.",
        icon_id: "sports_bar",
        destinations: LYNGBY_BARS,
        preconfigured_only: true,
        target: 5,
        kind: KindDef::CollectionVisit {
            timeout: Some(HOURS_24),
        },
    },
    AchievementDef {
        key: "achievement_2week_kb",
        name: "Fortnight",
        description: "Visit KB fourteen days in a row.",
        icon_id: "local_bar",
        destinations: KB,
        preconfigured_only: true,
        target: 14,
        kind: KindDef::DailyStreak,
    },
];

fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

impl KindDef {
    fn build(self, slots: usize) -> AchievementKind {
        match self {
            KindDef::VisitCounter { debounce } => {
                AchievementKind::VisitCounter(VisitCounter::new(to_time_delta(debounce)))
            }
            KindDef::CollectionVisit { timeout } => AchievementKind::CollectionVisit(
                CollectionVisit::new(slots, timeout.map(to_time_delta)),
            ),
            KindDef::DailyStreak => AchievementKind::DailyStreak(Streak::default()),
            KindDef::WeeklyStreak => AchievementKind::WeeklyStreak(Streak::default()),
        }
    }
}

/// Owns the configured achievements and their proximity registrations.
#[derive(Debug, Clone)]
pub struct AchievementRegistry {
    achievements: Vec<Achievement>,
    proximity: ProximityTable,
    trigger_radius: f64,
}

impl AchievementRegistry {
    /// Build achievements from a definition table.
    ///
    /// Destination names missing from `destinations` are simply not watched.
    pub fn from_definitions(
        definitions: &[AchievementDef],
        destinations: &DestinationStore,
        trigger_radius: f64,
    ) -> Self {
        let achievements = definitions
            .iter()
            .enumerate()
            .map(|(index, def)| {
                let watched =
                    destinations.find_by_names(def.destinations, def.preconfigured_only);
                if watched.len() < def.destinations.len() {
                    tracing::debug!(
                        key = def.key,
                        expected = def.destinations.len(),
                        found = watched.len(),
                        "Achievement watches fewer destinations than configured"
                    );
                }
                let kind = def.kind.build(watched.len());
                Achievement::new(
                    AchievementId(index),
                    def.key,
                    def.name,
                    def.description,
                    def.icon_id,
                    watched,
                    def.target,
                    kind,
                )
            })
            .collect();

        Self {
            achievements,
            proximity: ProximityTable::new(),
            trigger_radius,
        }
    }

    /// Build the campus achievement set.
    pub fn with_defaults(destinations: &DestinationStore, trigger_radius: f64) -> Self {
        Self::from_definitions(DEFAULT_ACHIEVEMENTS, destinations, trigger_radius)
    }

    /// Load persisted state and register every achievement not yet completed.
    pub fn setup_all(&mut self, kv: &dyn KeyValueStore) {
        for index in 0..self.achievements.len() {
            let achievement = &mut self.achievements[index];
            let progress = kv.get_int(&achievement.progress_key(), 0);
            let data = kv.get_string(achievement.key(), "");
            achievement.load_state(progress, &data);
            self.sync_listener(index);
        }
        let completed = self.achievements.iter().filter(|a| a.is_complete()).count();
        tracing::info!(
            total = self.achievements.len(),
            completed,
            registrations = self.proximity.len(),
            "Achievements set up"
        );
    }

    /// Register or deregister an achievement to match its completion state.
    fn sync_listener(&mut self, index: usize) {
        let Some(achievement) = self.achievements.get_mut(index) else {
            return;
        };
        if achievement.is_complete() {
            if achievement.is_listening() {
                self.proximity.deregister_all(achievement.id());
                achievement.set_listening(false);
                tracing::info!(
                    key = achievement.key(),
                    name = achievement.name(),
                    "Achievement completed"
                );
            }
        } else if !achievement.is_listening() {
            for destination in achievement.destinations() {
                self.proximity
                    .register(*destination, achievement.id(), self.trigger_radius);
            }
            achievement.set_listening(true);
        }
    }

    /// Record a new live distance and apply the resulting proximity events.
    ///
    /// Returns the number of events delivered.
    pub fn update_distance(
        &mut self,
        destination: &mut Destination,
        distance: f64,
        now: &DateTime<FixedOffset>,
    ) -> usize {
        let listeners = self.proximity.update_distance(destination, distance);
        let mut delivered = 0;
        for listener in listeners {
            let Some(achievement) = self.achievements.get_mut(listener.0) else {
                continue;
            };
            // An earlier event in this batch may have completed it.
            if achievement.is_complete() {
                continue;
            }
            achievement.on_proximity(destination.id(), now);
            delivered += 1;
            self.sync_listener(listener.0);
        }
        if delivered > 0 {
            tracing::debug!(
                destination = %destination.name,
                distance,
                delivered,
                "Delivered proximity events"
            );
        }
        delivered
    }

    /// Re-evaluate time windows of every achievement not yet completed.
    pub fn recalculate_all(&mut self, now: &DateTime<FixedOffset>) {
        for index in 0..self.achievements.len() {
            let achievement = &mut self.achievements[index];
            if achievement.is_complete() {
                continue;
            }
            achievement.recalculate_progress(now);
            self.sync_listener(index);
        }
    }

    /// Reset one achievement by key. Returns false if no such key.
    pub fn clear(&mut self, key: &str) -> bool {
        let Some(index) = self.achievements.iter().position(|a| a.key() == key) else {
            return false;
        };
        self.achievements[index].clear_progress();
        self.sync_listener(index);
        true
    }

    /// Reset every achievement ("delete achievement data").
    pub fn clear_all(&mut self) {
        for index in 0..self.achievements.len() {
            self.achievements[index].clear_progress();
            self.sync_listener(index);
        }
        tracing::info!(count = self.achievements.len(), "Cleared achievement progress");
    }

    /// Drop registrations on a destination that was deleted.
    pub fn forget_destination(&mut self, destination: DestinationId) {
        self.proximity.forget_destination(destination);
    }

    /// Write every dirty achievement in one batch. Returns how many were written.
    pub fn flush(&mut self, kv: &mut dyn KeyValueStore) -> Result<usize> {
        let mut batch = WriteBatch::new();
        let mut written = 0;
        for achievement in self.achievements.iter().filter(|a| a.is_dirty()) {
            batch = batch
                .put_string(achievement.key(), achievement.progress_data_to_string())
                .put_int(
                    achievement.progress_key(),
                    i64::from(achievement.current_progress()),
                );
            written += 1;
        }
        if written == 0 {
            return Ok(0);
        }
        kv.apply(batch)?;
        self.achievements.iter_mut().for_each(Achievement::mark_clean);
        tracing::debug!(written, "Flushed achievement state");
        Ok(written)
    }

    pub fn get(&self, key: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter()
    }

    pub fn views(&self) -> Vec<AchievementView> {
        self.achievements.iter().map(Achievement::view).collect()
    }

    pub fn proximity(&self) -> &ProximityTable {
        &self.proximity
    }

    pub fn trigger_radius(&self) -> f64 {
        self.trigger_radius
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::destinations::DEFAULT_DESTINATIONS;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).expect("valid timestamp")
    }

    fn campus() -> (DestinationStore, AchievementRegistry) {
        let destinations = DestinationStore::from_encoded(DEFAULT_DESTINATIONS);
        let mut registry = AchievementRegistry::with_defaults(&destinations, 50.0);
        registry.setup_all(&MemoryStore::new());
        (destinations, registry)
    }

    #[test]
    fn test_default_table_wiring() {
        let (destinations, registry) = campus();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.get("achievement_visit_all").unwrap().destinations().len(), 6);
        assert_eq!(registry.get("achievement_crawl").unwrap().destinations().len(), 5);
        assert_eq!(registry.get("achievement_visit_kb").unwrap().destinations().len(), 1);

        // 4 counters + weekly + daily + crawl on KB, plus collect-all.
        let kb = destinations.find_by_name("KB").unwrap().id();
        assert_eq!(registry.proximity().registrations(kb).len(), 8);
    }

    #[test]
    fn test_missing_destination_watches_nothing() {
        let destinations = DestinationStore::new();
        let mut registry = AchievementRegistry::with_defaults(&destinations, 50.0);
        registry.setup_all(&MemoryStore::new());
        assert!(registry.iter().all(|a| a.destinations().is_empty()));
        assert!(registry.proximity().is_empty());
    }

    #[test]
    fn test_completion_deregisters() {
        let (mut destinations, mut registry) = campus();
        let now = at("2024-09-06T16:00:00+02:00");
        let kb = destinations.iter_mut().find(|d| d.name == "KB").unwrap();

        registry.update_distance(kb, 10.0, &now);

        let first = registry.get("achievement_visit_kb").unwrap();
        assert!(first.is_complete());
        assert!(!registry.proximity().is_registered(first.id()));

        let regular = registry.get("achievement_visit_kb2").unwrap();
        assert_eq!(regular.current_progress(), 1);
        assert!(registry.proximity().is_registered(regular.id()));
    }

    #[test]
    fn test_out_of_range_delivers_nothing() {
        let (mut destinations, mut registry) = campus();
        let kb = destinations.iter_mut().find(|d| d.name == "KB").unwrap();
        let delivered = registry.update_distance(kb, 50.5, &at("2024-09-06T16:00:00+02:00"));
        assert_eq!(delivered, 0);
        assert_eq!(kb.distance, Some(50.5));
    }

    #[test]
    fn test_flush_is_idempotent() {
        let (mut destinations, mut registry) = campus();
        let mut kv = MemoryStore::new();
        let kb = destinations.iter_mut().find(|d| d.name == "KB").unwrap();
        registry.update_distance(kb, 10.0, &at("2024-09-06T16:00:00+02:00"));

        let written = registry.flush(&mut kv).unwrap();
        assert_eq!(written, 8);
        assert_eq!(kv.get_int("achievement_visit_kb_p", 0), 1);
        assert_eq!(kv.batches_applied(), 1);

        assert_eq!(registry.flush(&mut kv).unwrap(), 0);
        assert_eq!(kv.batches_applied(), 1);
    }

    #[test]
    fn test_setup_restores_completed_without_listening() {
        let (mut destinations, mut registry) = campus();
        let mut kv = MemoryStore::new();
        let kb = destinations.iter_mut().find(|d| d.name == "KB").unwrap();
        registry.update_distance(kb, 10.0, &at("2024-09-06T16:00:00+02:00"));
        registry.flush(&mut kv).unwrap();

        let mut reloaded = AchievementRegistry::with_defaults(&destinations, 50.0);
        reloaded.setup_all(&kv);
        let first = reloaded.get("achievement_visit_kb").unwrap();
        assert!(first.is_complete());
        assert!(!reloaded.proximity().is_registered(first.id()));
        assert_eq!(
            reloaded.get("achievement_2week_kb").unwrap().current_progress(),
            1
        );
    }

    #[test]
    fn test_clear_all_reregisters() {
        let (mut destinations, mut registry) = campus();
        let kb = destinations.iter_mut().find(|d| d.name == "KB").unwrap();
        registry.update_distance(kb, 10.0, &at("2024-09-06T16:00:00+02:00"));
        let id = registry.get("achievement_visit_kb").unwrap().id();
        assert!(!registry.proximity().is_registered(id));

        registry.clear_all();
        assert!(registry.iter().all(|a| a.current_progress() == 0 && !a.is_complete()));
        assert!(registry.proximity().is_registered(id));
        assert!(registry.iter().all(Achievement::is_dirty));
    }

    #[test]
    fn test_clear_single_by_key() {
        let (_, mut registry) = campus();
        assert!(registry.clear("achievement_crawl"));
        assert!(!registry.clear("no_such_achievement"));
    }
}
