// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The single owner of destinations, achievements, compass and storage.
//!
//! Every location fix, heading update and user command goes through one
//! [`Session`]. The async [`Session::run`] loop receives [`SessionCommand`]s
//! over a channel and, while the achievement view is visible, recalculates
//! time-windowed achievements on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::db::KeyValueStore;
use crate::error::{AppError, Result};
use crate::models::achievement::AchievementView;
use crate::models::destination::{Destination, DestinationDraft, DestinationId};
use crate::services::achievements::AchievementRegistry;
use crate::services::compass::{format_distance, Compass, CompassStatus, LocationFix};
use crate::services::destinations::DestinationStore;
use crate::time_utils::Clock;

/// Messages accepted by [`Session::run`].
#[derive(Debug)]
pub enum SessionCommand {
    LocationFix(LocationFix),
    /// Phone heading in degrees clockwise from north
    Heading(f64),
    SetTarget(Option<DestinationId>),
    SetAchievementsVisible(bool),
    Status {
        status: CompassStatus,
        active: bool,
    },
    ClearAchievements,
    Snapshot(oneshot::Sender<Vec<AchievementView>>),
    Shutdown,
}

pub struct Session {
    destinations: DestinationStore,
    registry: AchievementRegistry,
    compass: Compass,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    achievements_visible: bool,
}

impl Session {
    /// Load destinations and achievement state from `store`.
    ///
    /// Time windows are re-evaluated against the current time before the
    /// session is handed out. The compass starts pointing at the first
    /// destination and waits for a location fix.
    pub fn open(
        config: &Config,
        mut store: Box<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let destinations = DestinationStore::load(&mut *store)?;
        let mut registry =
            AchievementRegistry::with_defaults(&destinations, config.trigger_radius_m);
        registry.setup_all(&*store);
        registry.recalculate_all(&clock.now());
        registry.flush(&mut *store)?;

        let mut compass = Compass::new();
        compass.set_target(destinations.first().map(Destination::id));
        compass.raise(CompassStatus::LocationMissing);

        Ok(Self {
            destinations,
            registry,
            compass,
            store,
            clock,
            achievements_visible: false,
        })
    }

    /// Apply a location fix to every destination and persist what changed.
    ///
    /// Returns the number of proximity events delivered.
    pub fn on_location_fix(&mut self, fix: LocationFix) -> Result<usize> {
        let position = fix.point();
        self.compass.set_position(position);
        self.compass.clear(CompassStatus::LocationMissing);

        let now = self.clock.now();
        let mut delivered = 0;
        for destination in self.destinations.iter_mut() {
            let Some(distance) = self.compass.distance_to(destination.location) else {
                continue;
            };
            delivered += self.registry.update_distance(destination, distance, &now);
        }
        self.registry.flush(&mut *self.store)?;
        Ok(delivered)
    }

    /// Update the heading; returns the needle rotation in degrees.
    pub fn on_heading(&mut self, heading: f64) -> f64 {
        self.compass.set_heading(heading);
        self.update_needle()
    }

    fn update_needle(&mut self) -> f64 {
        let location = self
            .compass
            .target()
            .and_then(|id| self.destinations.get(id))
            .map(|d| d.location);
        self.compass.update_needle(location)
    }

    pub fn set_target(&mut self, target: Option<DestinationId>) -> Result<()> {
        if let Some(id) = target {
            if self.destinations.get(id).is_none() {
                return Err(AppError::NotFound(id.to_string()));
            }
        }
        self.compass.set_target(target);
        Ok(())
    }

    pub fn set_status(&mut self, status: CompassStatus, active: bool) -> Option<CompassStatus> {
        if active {
            self.compass.raise(status)
        } else {
            self.compass.clear(status)
        }
    }

    /// Show or hide the achievement view. Becoming visible recalculates once.
    pub fn set_achievements_visible(&mut self, visible: bool) -> Result<()> {
        let was_visible = std::mem::replace(&mut self.achievements_visible, visible);
        if visible && !was_visible {
            self.recalculate()?;
        }
        Ok(())
    }

    pub fn achievements_visible(&self) -> bool {
        self.achievements_visible
    }

    /// Re-evaluate time windows and persist what changed.
    pub fn recalculate(&mut self) -> Result<usize> {
        let now = self.clock.now();
        self.registry.recalculate_all(&now);
        self.registry.flush(&mut *self.store)
    }

    /// Delete all achievement progress.
    pub fn clear_achievements(&mut self) -> Result<()> {
        self.registry.clear_all();
        self.registry.flush(&mut *self.store)?;
        Ok(())
    }

    pub fn add_destination(&mut self, draft: DestinationDraft) -> Result<DestinationId> {
        let id = self.destinations.add(draft)?;
        self.destinations.save(&mut *self.store)?;
        Ok(id)
    }

    pub fn edit_destination(&mut self, id: DestinationId, draft: &DestinationDraft) -> Result<()> {
        self.destinations.edit(id, draft)?;
        self.destinations.save(&mut *self.store)
    }

    /// Delete a destination, its proximity registrations and, if it was the
    /// compass target, point at the first remaining destination instead.
    pub fn remove_destination(&mut self, id: DestinationId) -> Result<Destination> {
        let removed = self
            .destinations
            .remove(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        self.registry.forget_destination(id);
        self.compass
            .replace_target(id, self.destinations.first().map(Destination::id));
        self.destinations.save(&mut *self.store)?;
        tracing::info!(id = %id, name = %removed.name, "Removed destination");
        Ok(removed)
    }

    pub fn toggle_favorite(&mut self, id: DestinationId) -> Result<bool> {
        let favorite = self.destinations.toggle_favorite(id)?;
        self.destinations.save(&mut *self.store)?;
        Ok(favorite)
    }

    /// Formatted distance to a destination, empty before the first fix.
    pub fn distance_label(&self, id: DestinationId) -> String {
        format_distance(self.destinations.get(id).and_then(|d| d.distance))
    }

    pub fn views(&self) -> Vec<AchievementView> {
        self.registry.views()
    }

    pub fn destinations(&self) -> &DestinationStore {
        &self.destinations
    }

    pub fn registry(&self) -> &AchievementRegistry {
        &self.registry
    }

    pub fn compass(&self) -> &Compass {
        &self.compass
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        &*self.store
    }

    fn handle(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::LocationFix(fix) => {
                self.on_location_fix(fix)?;
                self.update_needle();
            }
            SessionCommand::Heading(heading) => {
                self.on_heading(heading);
            }
            SessionCommand::SetTarget(target) => self.set_target(target)?,
            SessionCommand::SetAchievementsVisible(visible) => {
                self.set_achievements_visible(visible)?
            }
            SessionCommand::Status { status, active } => {
                self.set_status(status, active);
            }
            SessionCommand::ClearAchievements => self.clear_achievements()?,
            SessionCommand::Snapshot(reply) => {
                // Receiver gone means nobody is waiting any more.
                let _ = reply.send(self.views());
            }
            SessionCommand::Shutdown => {}
        }
        Ok(())
    }

    /// Process commands until the channel closes or `Shutdown` arrives.
    ///
    /// The recalculation interval is only polled while the achievement view
    /// is visible, and restarts each time the view becomes visible. Returns
    /// the session so callers can inspect the final state.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        period: Duration,
    ) -> Self {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(?period, "Session started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if matches!(command, SessionCommand::Shutdown) {
                        break;
                    }
                    if matches!(command, SessionCommand::SetAchievementsVisible(true))
                        && !self.achievements_visible
                    {
                        ticker.reset();
                    }
                    if let Err(e) = self.handle(command) {
                        tracing::error!(error = %e, "Session command failed");
                    }
                }
                _ = ticker.tick(), if self.achievements_visible => {
                    if let Err(e) = self.recalculate() {
                        tracing::error!(error = %e, "Achievement recalculation failed");
                    }
                }
            }
        }

        if let Err(e) = self.registry.flush(&mut *self.store) {
            tracing::error!(error = %e, "Final achievement flush failed");
        }
        tracing::info!("Session stopped");
        self
    }
}
