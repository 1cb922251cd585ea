// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod achievement;
pub mod destination;

pub use achievement::{Achievement, AchievementId, AchievementKind, AchievementView};
pub use destination::{Destination, DestinationDraft, DestinationError, DestinationId};
