// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievements: shared progress bookkeeping plus four visiting policies.
//!
//! Every achievement carries the same [`Progress`] state; the policy that
//! turns proximity events and elapsed time into progress lives in
//! [`AchievementKind`]. Timestamps are kept as epoch milliseconds so the
//! persisted strings round-trip exactly.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::Serialize;
use std::fmt;

use crate::db::keys;
use crate::models::destination::DestinationId;
use crate::time_utils::{from_millis, is_previous_day, is_previous_week, is_same_day, is_same_week};

/// Index of an achievement inside its registry. Also its proximity listener id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AchievementId(pub usize);

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "achievement-{}", self.0)
    }
}

/// Progress counter shared by every achievement kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    current: u32,
    target: u32,
    completed: bool,
    dirty: bool,
}

impl Progress {
    fn new(target: u32) -> Self {
        Self {
            current: 0,
            target,
            completed: false,
            dirty: false,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Set progress, clamped to the target. Reaching the target completes.
    ///
    /// Ignored once completed. Returns whether anything changed.
    fn update(&mut self, value: u32) -> bool {
        if self.completed {
            return false;
        }
        let clamped = value.min(self.target);
        let changed = clamped != self.current;
        self.current = clamped;
        if self.current == self.target {
            self.completed = true;
            self.dirty = true;
            return true;
        }
        if changed {
            self.dirty = true;
        }
        changed
    }

    fn increment(&mut self) -> bool {
        self.update(self.current.saturating_add(1))
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Counts visits to any watched destination, at most one per debounce window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitCounter {
    debounce: TimeDelta,
    last_visit: Option<i64>,
}

impl VisitCounter {
    pub fn new(debounce: TimeDelta) -> Self {
        Self {
            debounce,
            last_visit: None,
        }
    }

    pub fn last_visit(&self) -> Option<i64> {
        self.last_visit
    }

    fn on_proximity(&mut self, progress: &mut Progress, now: &DateTime<FixedOffset>) {
        let now_ms = now.timestamp_millis();
        if let Some(last) = self.last_visit {
            if last > now_ms {
                // Clock went backwards; restart the window from now.
                self.last_visit = Some(now_ms);
                progress.mark_dirty();
                return;
            }
            if now_ms - last < self.debounce.num_milliseconds() {
                return;
            }
        }
        self.last_visit = Some(now_ms);
        progress.increment();
        progress.mark_dirty();
    }

    fn to_data_string(&self) -> String {
        self.last_visit.map(|t| t.to_string()).unwrap_or_default()
    }

    fn load_data_string(&mut self, data: &str) {
        self.last_visit = parse_timestamp(data);
    }

    fn reset(&mut self) {
        self.last_visit = None;
    }
}

/// Counts how many watched destinations were visited within a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionVisit {
    /// `None` means visits never expire.
    timeout: Option<TimeDelta>,
    visits: Vec<Option<i64>>,
}

impl CollectionVisit {
    pub fn new(slots: usize, timeout: Option<TimeDelta>) -> Self {
        Self {
            timeout,
            visits: vec![None; slots],
        }
    }

    pub fn visits(&self) -> &[Option<i64>] {
        &self.visits
    }

    fn on_proximity(
        &mut self,
        progress: &mut Progress,
        slot: usize,
        now: &DateTime<FixedOffset>,
    ) {
        if let Some(visit) = self.visits.get_mut(slot) {
            *visit = Some(now.timestamp_millis());
            progress.mark_dirty();
        }
        // Other slots may have expired since the last tick.
        self.recalculate(progress, now);
    }

    fn recalculate(&mut self, progress: &mut Progress, now: &DateTime<FixedOffset>) {
        let now_ms = now.timestamp_millis();
        let timeout_ms = self.timeout.map(|t| t.num_milliseconds());
        let mut count = 0u32;
        for visit in self.visits.iter_mut().flatten() {
            if *visit > now_ms {
                *visit = now_ms;
                progress.mark_dirty();
            }
            match timeout_ms {
                Some(timeout) if now_ms - *visit >= timeout => {}
                _ => count += 1,
            }
        }
        progress.update(count);
    }

    fn to_data_string(&self) -> String {
        self.visits
            .iter()
            .map(|v| v.unwrap_or(-1).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn load_data_string(&mut self, data: &str) {
        self.reset();
        if data.trim().is_empty() {
            return;
        }
        let parsed: Option<Vec<i64>> = data
            .split_whitespace()
            .map(|t| t.parse::<i64>().ok())
            .collect();
        match parsed {
            Some(values) if values.len() == self.visits.len() => {
                for (slot, value) in self.visits.iter_mut().zip(values) {
                    *slot = (value >= 0).then_some(value);
                }
            }
            _ => {
                tracing::debug!(data, slots = self.visits.len(), "Discarding malformed collection state");
            }
        }
    }

    fn reset(&mut self) {
        self.visits.iter_mut().for_each(|v| *v = None);
    }
}

/// Calendar granularity of a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakPeriod {
    Daily,
    Weekly,
}

impl StreakPeriod {
    fn same(self, now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
        match self {
            StreakPeriod::Daily => is_same_day(now, other),
            StreakPeriod::Weekly => is_same_week(now, other),
        }
    }

    fn previous(self, now: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
        match self {
            StreakPeriod::Daily => is_previous_day(now, other),
            StreakPeriod::Weekly => is_previous_week(now, other),
        }
    }
}

/// Consecutive days or weeks with at least one visit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Streak {
    last_visit: Option<i64>,
}

impl Streak {
    pub fn last_visit(&self) -> Option<i64> {
        self.last_visit
    }

    fn last_visit_at(&self, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        self.last_visit.and_then(|t| from_millis(t, now.offset()))
    }

    fn on_proximity(
        &mut self,
        period: StreakPeriod,
        progress: &mut Progress,
        now: &DateTime<FixedOffset>,
    ) {
        match self.last_visit_at(now) {
            Some(last) if last > *now => {
                self.last_visit = Some(now.timestamp_millis());
                progress.mark_dirty();
                return;
            }
            Some(last) if period.same(now, &last) => return,
            Some(last) if period.previous(now, &last) => {
                progress.increment();
            }
            _ => {
                progress.update(1);
            }
        }
        self.last_visit = Some(now.timestamp_millis());
        progress.mark_dirty();
    }

    fn recalculate(
        &mut self,
        period: StreakPeriod,
        progress: &mut Progress,
        now: &DateTime<FixedOffset>,
    ) {
        match self.last_visit_at(now) {
            Some(last) if last > *now => {
                self.last_visit = Some(now.timestamp_millis());
                progress.mark_dirty();
            }
            Some(last) if period.same(now, &last) || period.previous(now, &last) => {}
            Some(_) => {
                progress.update(0);
                self.last_visit = None;
                progress.mark_dirty();
            }
            None => {
                progress.update(0);
            }
        }
    }

    fn to_data_string(&self) -> String {
        self.last_visit.map(|t| t.to_string()).unwrap_or_default()
    }

    fn load_data_string(&mut self, data: &str) {
        self.last_visit = parse_timestamp(data);
    }

    fn reset(&mut self) {
        self.last_visit = None;
    }
}

fn parse_timestamp(data: &str) -> Option<i64> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    match data.parse::<i64>() {
        Ok(t) => Some(t),
        Err(_) => {
            tracing::debug!(data, "Discarding malformed timestamp state");
            None
        }
    }
}

/// The visiting policy of an achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AchievementKind {
    VisitCounter(VisitCounter),
    CollectionVisit(CollectionVisit),
    DailyStreak(Streak),
    WeeklyStreak(Streak),
}

impl AchievementKind {
    pub fn name(&self) -> &'static str {
        match self {
            AchievementKind::VisitCounter(_) => "visit_counter",
            AchievementKind::CollectionVisit(_) => "collection_visit",
            AchievementKind::DailyStreak(_) => "daily_streak",
            AchievementKind::WeeklyStreak(_) => "weekly_streak",
        }
    }
}

/// A configured achievement and its current progress.
#[derive(Debug, Clone)]
pub struct Achievement {
    id: AchievementId,
    key: String,
    name: String,
    description: String,
    icon_id: String,
    destinations: Vec<DestinationId>,
    progress: Progress,
    listening: bool,
    kind: AchievementKind,
}

impl Achievement {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AchievementId,
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        icon_id: impl Into<String>,
        destinations: Vec<DestinationId>,
        progress_for_completion: u32,
        kind: AchievementKind,
    ) -> Self {
        Self {
            id,
            key: key.into(),
            name: name.into(),
            description: description.into(),
            icon_id: icon_id.into(),
            destinations,
            progress: Progress::new(progress_for_completion),
            listening: false,
            kind,
        }
    }

    pub fn id(&self) -> AchievementId {
        self.id
    }

    /// Persistence key of the serialized variant state.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persistence key of the integer progress.
    pub fn progress_key(&self) -> String {
        format!("{}{}", self.key, keys::PROGRESS_SUFFIX)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon_id(&self) -> &str {
        &self.icon_id
    }

    pub fn destinations(&self) -> &[DestinationId] {
        &self.destinations
    }

    pub fn kind(&self) -> &AchievementKind {
        &self.kind
    }

    pub fn progress_for_completion(&self) -> u32 {
        self.progress.target()
    }

    pub fn current_progress(&self) -> u32 {
        self.progress.current()
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    /// Whether state changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.progress.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.progress.dirty = false;
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening
    }

    pub(crate) fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Set progress directly; clamped, and ignored once completed.
    pub fn update_progress(&mut self, value: u32) {
        self.progress.update(value);
    }

    /// Apply the policy's trigger rule for a proximity event at `destination`.
    pub fn on_proximity(&mut self, destination: DestinationId, now: &DateTime<FixedOffset>) {
        if self.progress.is_complete() {
            return;
        }
        let Some(slot) = self.destinations.iter().position(|d| *d == destination) else {
            return;
        };
        match &mut self.kind {
            AchievementKind::VisitCounter(v) => v.on_proximity(&mut self.progress, now),
            AchievementKind::CollectionVisit(c) => c.on_proximity(&mut self.progress, slot, now),
            AchievementKind::DailyStreak(s) => {
                s.on_proximity(StreakPeriod::Daily, &mut self.progress, now)
            }
            AchievementKind::WeeklyStreak(s) => {
                s.on_proximity(StreakPeriod::Weekly, &mut self.progress, now)
            }
        }
    }

    /// Re-evaluate time windows; progress may decrease. No-op once completed.
    pub fn recalculate_progress(&mut self, now: &DateTime<FixedOffset>) {
        if self.progress.is_complete() {
            return;
        }
        match &mut self.kind {
            AchievementKind::VisitCounter(_) => {}
            AchievementKind::CollectionVisit(c) => c.recalculate(&mut self.progress, now),
            AchievementKind::DailyStreak(s) => {
                s.recalculate(StreakPeriod::Daily, &mut self.progress, now)
            }
            AchievementKind::WeeklyStreak(s) => {
                s.recalculate(StreakPeriod::Weekly, &mut self.progress, now)
            }
        }
    }

    pub fn progress_data_to_string(&self) -> String {
        match &self.kind {
            AchievementKind::VisitCounter(v) => v.to_data_string(),
            AchievementKind::CollectionVisit(c) => c.to_data_string(),
            AchievementKind::DailyStreak(s) | AchievementKind::WeeklyStreak(s) => {
                s.to_data_string()
            }
        }
    }

    /// Restore variant state. Empty or malformed data loads as "no progress".
    pub fn progress_data_from_string(&mut self, data: &str) {
        match &mut self.kind {
            AchievementKind::VisitCounter(v) => v.load_data_string(data),
            AchievementKind::CollectionVisit(c) => c.load_data_string(data),
            AchievementKind::DailyStreak(s) | AchievementKind::WeeklyStreak(s) => {
                s.load_data_string(data)
            }
        }
    }

    /// Clear variant state only; progress and completion are left alone.
    pub fn progress_reset(&mut self) {
        match &mut self.kind {
            AchievementKind::VisitCounter(v) => v.reset(),
            AchievementKind::CollectionVisit(c) => c.reset(),
            AchievementKind::DailyStreak(s) | AchievementKind::WeeklyStreak(s) => s.reset(),
        }
    }

    /// Reset to zero progress, reopening a completed achievement.
    pub fn clear_progress(&mut self) {
        self.progress_reset();
        if self.progress.completed {
            self.progress.completed = false;
            self.progress.current = 0;
        } else {
            self.progress.update(0);
        }
        self.progress.mark_dirty();
    }

    /// Load persisted progress and variant state.
    pub(crate) fn load_state(&mut self, progress: i64, data: &str) {
        let target = self.progress.target;
        let current = u32::try_from(progress.max(0)).unwrap_or(u32::MAX).min(target);
        self.progress.current = current;
        self.progress.completed = current == target;
        self.progress_data_from_string(data);
        self.progress.dirty = false;
    }

    /// Snapshot for display.
    pub fn view(&self) -> AchievementView {
        AchievementView {
            key: self.key.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon_id: self.icon_id.clone(),
            kind: self.kind.name(),
            current_progress: self.current_progress(),
            progress_for_completion: self.progress_for_completion(),
            is_complete: self.is_complete(),
        }
    }
}

/// What the UI shows for one achievement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AchievementView {
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon_id: String,
    pub kind: &'static str,
    pub current_progress: u32,
    pub progress_for_completion: u32,
    pub is_complete: bool,
}
