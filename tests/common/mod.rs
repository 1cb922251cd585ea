// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use campus_compass::config::Config;
use campus_compass::db::MemoryStore;
use campus_compass::services::{LocationFix, Session};
use campus_compass::time_utils::ManualClock;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

/// Parse an RFC3339 timestamp.
#[allow(dead_code)]
pub fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("valid timestamp")
}

/// A session over an empty in-memory store, driven by a manual clock.
#[allow(dead_code)]
pub fn campus_session(start: &str) -> (Session, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(at(start)));
    let session = Session::open(
        &Config::default(),
        Box::new(MemoryStore::new()),
        clock.clone(),
    )
    .expect("Failed to open session");
    (session, clock)
}

/// A location fix right on top of the named built-in destination.
#[allow(dead_code)]
pub fn fix_at(session: &Session, name: &str) -> LocationFix {
    let destination = session
        .destinations()
        .find_by_name(name)
        .unwrap_or_else(|| panic!("no destination named {name}"));
    LocationFix {
        latitude: destination.latitude(),
        longitude: destination.longitude(),
    }
}

/// A location fix well away from every built-in destination.
#[allow(dead_code)]
pub fn fix_far_away() -> LocationFix {
    LocationFix {
        latitude: 55.6761,
        longitude: 12.5683,
    }
}
