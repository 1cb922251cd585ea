// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod achievements;
pub mod compass;
pub mod destinations;
pub mod proximity;
pub mod session;

pub use achievements::{AchievementDef, AchievementRegistry, KindDef, DEFAULT_ACHIEVEMENTS};
pub use compass::{Compass, CompassStatus, LocationFix};
pub use destinations::{DestinationStore, DEFAULT_DESTINATIONS};
pub use proximity::{ProximityTable, Registration};
pub use session::{Session, SessionCommand};
