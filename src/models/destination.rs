// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Destination model and its `|`-separated token encoding.

use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Schema version every decoded destination is migrated up to.
pub const TARGET_VERSION_CODE: i32 = 3;

/// Separates destination records in the persisted list.
pub const RECORD_SEPARATOR: char = '¤';

/// Separates fields inside one destination record.
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in an encoded destination record.
pub const FIELD_COUNT: usize = 8;

pub const DEFAULT_ICON_ID: &str = "local_drink";

/// Icon ids understood by the UI icon catalog.
pub const ICON_IDS: &[&str] = &[
    "default",
    "local_drink",
    "pedal_bike",
    "bus",
    "car",
    "home",
    "local_bar",
    "local_hotel",
    "pool",
    "city",
    "sports_bar",
    "baseball",
    "wine_bar",
    "grass",
    "icecream",
];

/// Where "Diamanten" moved to in schema version 3.
pub const DIAMANTEN_V3: (f64, f64) = (55.782960, 12.521320);

pub fn is_known_icon(icon_id: &str) -> bool {
    ICON_IDS.contains(&icon_id)
}

/// Opaque handle for a destination within one destination store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dest-{}", self.0)
    }
}

/// A point of interest the compass can point at.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub(crate) id: DestinationId,
    pub version_code: i32,
    /// Shipped with the app rather than added by the user
    pub preconfigured: bool,
    pub name: String,
    /// x = longitude, y = latitude (degrees)
    pub location: Point<f64>,
    pub address: String,
    pub is_favorite: bool,
    pub icon_id: String,
    /// Last seen distance from the user in meters
    pub distance: Option<f64>,
}

impl Destination {
    /// Create a user-added destination at the current schema version.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: DestinationId::default(),
            version_code: TARGET_VERSION_CODE,
            preconfigured: false,
            name: name.into(),
            location: Point::new(longitude, latitude),
            address: String::new(),
            is_favorite: false,
            icon_id: DEFAULT_ICON_ID.to_string(),
            distance: None,
        }
    }

    pub fn id(&self) -> DestinationId {
        self.id
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    pub fn set_location(&mut self, latitude: f64, longitude: f64) {
        self.location = Point::new(longitude, latitude);
    }

    /// Encode as `versionCode|preConfigured|name|latitude|longitude|address|isFavorite|iconId`.
    ///
    /// Separator characters are dropped from the name and address.
    pub fn to_token(&self) -> String {
        format!(
            "{}|{}|{}|{:?}|{:?}|{}|{}|{}",
            self.version_code,
            self.preconfigured,
            strip_separators(&self.name),
            self.latitude(),
            self.longitude(),
            strip_separators(&self.address),
            self.is_favorite,
            self.icon_id
        )
    }

    /// Decode one record and migrate it to [`TARGET_VERSION_CODE`].
    pub fn from_token(token: &str) -> Result<Self, DestinationError> {
        let fields: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(DestinationError::FieldCount {
                found: fields.len(),
            });
        }

        // Stored lists may carry whitespace from pretty-printed preference files.
        let version_token: String = fields[0].chars().filter(|c| !c.is_whitespace()).collect();
        let version_code = version_token
            .parse::<i32>()
            .map_err(|_| DestinationError::InvalidNumber {
                field: "versionCode",
                value: fields[0].to_string(),
            })?;
        let latitude = parse_f64("latitude", fields[3])?;
        let longitude = parse_f64("longitude", fields[4])?;

        let mut destination = Self {
            id: DestinationId::default(),
            version_code,
            preconfigured: parse_bool(fields[1]),
            name: fields[2].to_string(),
            location: Point::new(longitude, latitude),
            address: fields[5].to_string(),
            is_favorite: parse_bool(fields[6]),
            icon_id: fields[7].to_string(),
            distance: None,
        };
        destination.migrate();
        Ok(destination)
    }

    /// Apply schema migrations one version at a time until current.
    pub fn migrate(&mut self) {
        while self.version_code < TARGET_VERSION_CODE {
            match self.version_code {
                // v1: every preconfigured destination starts as a favorite.
                0 => {
                    if self.preconfigured {
                        self.is_favorite = true;
                    }
                }
                // v2: preconfigured bars get the bar icon, KB its own.
                1 => {
                    if self.preconfigured {
                        self.icon_id = "sports_bar".to_string();
                    }
                    if self.name == "KB" {
                        self.icon_id = "local_bar".to_string();
                    }
                }
                2 => {
                    if self.name == "Diamanten" {
                        self.set_location(DIAMANTEN_V3.0, DIAMANTEN_V3.1);
                    }
                }
                older => {
                    tracing::warn!(
                        name = %self.name,
                        version = older,
                        "Unknown destination schema version, upgrading without changes"
                    );
                    self.version_code = TARGET_VERSION_CODE;
                    break;
                }
            }
            self.version_code += 1;
        }
    }
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| *c != FIELD_SEPARATOR && *c != RECORD_SEPARATOR)
        .collect()
}

fn parse_bool(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case("true")
}

fn parse_f64(field: &'static str, value: &str) -> Result<f64, DestinationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DestinationError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// Errors decoding a single destination record.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("expected {} fields, found {found}", FIELD_COUNT)]
    FieldCount { found: usize },

    #[error("invalid number in field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// User input for creating or editing a destination.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct DestinationDraft {
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub is_favorite: bool,
    #[validate(custom(function = "validate_icon_id"))]
    pub icon_id: String,
}

fn validate_icon_id(icon_id: &str) -> Result<(), ValidationError> {
    if is_known_icon(icon_id) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_icon"))
    }
}

impl DestinationDraft {
    /// Build a draft from editor text fields.
    ///
    /// Returns `None` when a coordinate is not in `dd.dddddd` form.
    pub fn from_text(
        name: &str,
        address: &str,
        latitude: &str,
        longitude: &str,
        is_favorite: bool,
        icon_id: &str,
    ) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            address: address.to_string(),
            latitude: parse_coordinate(latitude)?,
            longitude: parse_coordinate(longitude)?,
            is_favorite,
            icon_id: icon_id.to_string(),
        })
    }

    /// Copy the draft's fields onto an existing destination.
    pub fn apply_to(&self, destination: &mut Destination) {
        destination.name = self.name.clone();
        destination.address = self.address.clone();
        destination.set_location(self.latitude, self.longitude);
        destination.is_favorite = self.is_favorite;
        destination.icon_id = self.icon_id.clone();
    }

    pub fn into_destination(self) -> Destination {
        let mut destination = Destination::new(self.name.clone(), self.latitude, self.longitude);
        self.apply_to(&mut destination);
        destination
    }
}

/// Parse a coordinate typed as `dd.dddddd` (a comma is accepted as the
/// decimal mark). Exactly six decimals; integer part within ±120.
pub fn parse_coordinate(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    let (int_part, frac_part) = normalized.split_once('.')?;
    if frac_part.len() != 6 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: i32 = int_part.parse().ok()?;
    if !(-120..=120).contains(&whole) {
        return None;
    }
    normalized.parse().ok()
}

/// Format a coordinate the way the editor shows it.
pub fn format_coordinate(value: f64) -> String {
    format!("{:.6}", value)
}
