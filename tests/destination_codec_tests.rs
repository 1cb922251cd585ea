// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Destination list encoding and migration tests.
//!
//! Stored lists written by older app versions must keep loading, so these
//! pin down the exact text format and every migration step.

use campus_compass::db::{keys, KeyValueStore, MemoryStore, WriteBatch};
use campus_compass::models::destination::{
    format_coordinate, parse_coordinate, DIAMANTEN_V3, TARGET_VERSION_CODE,
};
use campus_compass::models::{Destination, DestinationDraft};
use campus_compass::services::{DestinationStore, DEFAULT_DESTINATIONS};
use validator::Validate;

#[test]
fn test_encoding_preserves_fields() {
    let mut d = Destination::new("Fri|day ¤bar", 55.786123, -12.5);
    d.address = "Street | 1".to_string();
    d.is_favorite = true;
    d.icon_id = "wine_bar".to_string();

    let decoded = Destination::from_token(&d.to_token()).expect("own encoding decodes");
    assert_eq!(decoded.name, "Friday bar");
    assert_eq!(decoded.address, "Street  1");
    assert_eq!(decoded.latitude(), d.latitude());
    assert_eq!(decoded.longitude(), d.longitude());
    assert_eq!(decoded.preconfigured, d.preconfigured);
    assert_eq!(decoded.is_favorite, d.is_favorite);
    assert_eq!(decoded.icon_id, d.icon_id);
    assert_eq!(decoded.version_code, TARGET_VERSION_CODE);
}

#[test]
fn test_whole_numbers_keep_decimal_point() {
    let d = Destination::new("Home", 12.0, -3.0);
    assert_eq!(d.to_token(), "3|false|Home|12.0|-3.0||false|local_drink");
}

#[test]
fn test_version_zero_preconfigured_becomes_favorite() {
    let d = Destination::from_token("0|true|KB|55.0|12.0||false|local_drink").unwrap();
    assert_eq!(d.version_code, TARGET_VERSION_CODE);
    assert!(d.is_favorite);
    assert_eq!(d.icon_id, "local_bar");

    let user = Destination::from_token("0|false|Home|55.0|12.0||false|home").unwrap();
    assert!(!user.is_favorite);
    assert_eq!(user.icon_id, "home");
}

#[test]
fn test_diamanten_relocated_in_v3() {
    let d = Destination::from_token("2|true|Diamanten|1.0|2.0||true|sports_bar").unwrap();
    assert_eq!(d.latitude(), DIAMANTEN_V3.0);
    assert_eq!(d.longitude(), DIAMANTEN_V3.1);

    // Already current: untouched.
    let d = Destination::from_token("3|true|Diamanten|1.0|2.0||true|sports_bar").unwrap();
    assert_eq!(d.latitude(), 1.0);
}

#[test]
fn test_version_token_whitespace_and_bool_case() {
    let d = Destination::from_token(" 3 |TRUE|KB|55.0|12.0||yes|local_bar").unwrap();
    assert!(d.preconfigured);
    assert!(!d.is_favorite);
}

#[test]
fn test_future_version_left_alone() {
    let d = Destination::from_token("7|true|KB|55.0|12.0||false|local_drink").unwrap();
    assert_eq!(d.version_code, 7);
    assert!(!d.is_favorite);
}

#[test]
fn test_bad_records_are_rejected() {
    assert!(Destination::from_token("3|true|KB|55.0|12.0").is_err());
    assert!(Destination::from_token("x|true|KB|55.0|12.0||true|local_bar").is_err());
    assert!(Destination::from_token("3|true|KB|north|12.0||true|local_bar").is_err());
}

#[test]
fn test_v1_list_upgrade_through_store() {
    let mut kv = MemoryStore::new();
    kv.apply(WriteBatch::new().put_string(
        keys::DESTINATIONS,
        "1|true|KB|55.78663|12.52429||true|local_drink¤1|true|Hegnet|55.78692|12.51971||true|local_drink",
    ))
    .unwrap();

    let store = DestinationStore::load(&mut kv).unwrap();
    let names: Vec<&str> = store.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["KB", "Hegnet", "Verners"]);
    assert!(store.iter().all(|d| d.version_code == TARGET_VERSION_CODE));
    assert_eq!(store.find_by_name("Hegnet").unwrap().icon_id, "sports_bar");

    // Saved back at the current version: no second Verners on reload.
    let reloaded = DestinationStore::load(&mut kv).unwrap();
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn test_default_list_round_trips() {
    let store = DestinationStore::from_encoded(DEFAULT_DESTINATIONS);
    let again = DestinationStore::from_encoded(&store.encode());
    assert_eq!(again.encode(), DEFAULT_DESTINATIONS);
}

#[test]
fn test_coordinate_text_format() {
    assert_eq!(parse_coordinate("55.786630"), Some(55.78663));
    assert_eq!(parse_coordinate("12,524290"), Some(12.52429));
    assert_eq!(parse_coordinate("-120.000000"), Some(-120.0));
    assert_eq!(parse_coordinate("121.000000"), None);
    assert_eq!(parse_coordinate("55.7866"), None);
    assert_eq!(parse_coordinate("55"), None);
    assert_eq!(format_coordinate(12.0), "12.000000");
}

#[test]
fn test_draft_validation() {
    let ok = DestinationDraft::from_text("Home", "", "55.000000", "12.000000", false, "home")
        .expect("well-formed text");
    assert!(ok.validate().is_ok());

    let mut long_name = ok.clone();
    long_name.name = "A name that is far too long".to_string();
    assert!(long_name.validate().is_err());

    let mut empty_name = ok.clone();
    empty_name.name.clear();
    assert!(empty_name.validate().is_err());

    // The editor accepts ±120 but a latitude must still be on the globe.
    let off_globe =
        DestinationDraft::from_text("Home", "", "100.000000", "12.000000", false, "home").unwrap();
    assert!(off_globe.validate().is_err());

    let mut bad_icon = ok;
    bad_icon.icon_id = "rocket".to_string();
    assert!(bad_icon.validate().is_err());
}
