// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Destination list loading, migration, editing and persistence.

use crate::db::{keys, KeyValueStore, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::destination::{
    Destination, DestinationDraft, DestinationId, FIELD_SEPARATOR, RECORD_SEPARATOR,
};
use validator::Validate;

/// Built-in destinations written on first start.
pub const DEFAULT_DESTINATIONS: &str = concat!(
    "3|true|KB|55.78663|12.52429|Anker Engelunds Vej 1, 2800 Kgs. Lyngby|true|local_bar",
    "¤3|true|Hegnet|55.78692|12.51971|Elektrovej 325, 2800 Kgs. Lyngby|true|sports_bar",
    "¤3|true|Diamanten|55.78296|12.52132|Diplomvej 381, 2800 Kgs. Lyngby|true|sports_bar",
    "¤3|true|Diagonalen|55.7853|12.5211|Anker Engelunds Vej 1, 2800 Kgs. Lyngby|true|sports_bar",
    "¤3|true|Etheren|55.78744|12.52256|Fysikvej 309, 2800 Kgs. Lyngby|true|sports_bar",
    "¤3|true|Verners|55.730752|12.400113|Lautrupvang 19, 2750 Ballerup|true|sports_bar",
);

/// Appended to lists saved by version 1 of the app, which predate this destination.
pub const LEGACY_V1_EXTRA_RECORD: &str =
    "1|true|Verners|55.730752|12.400113|Lautrupvang 19, 2750 Ballerup|true|local_drink";

/// The active destination list, in display order.
#[derive(Debug, Default, Clone)]
pub struct DestinationStore {
    destinations: Vec<Destination>,
    next_id: u64,
}

impl DestinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an encoded list, applying the legacy v1 rule and migrations.
    ///
    /// Malformed records are skipped and logged.
    pub fn from_encoded(blob: &str) -> Self {
        let mut store = Self::new();

        let mut blob = blob.to_string();
        if first_version_token(&blob) == Some("1") {
            tracing::info!("Upgrading v1 destination list");
            blob.push(RECORD_SEPARATOR);
            blob.push_str(LEGACY_V1_EXTRA_RECORD);
        }

        for (index, token) in blob
            .split(RECORD_SEPARATOR)
            .filter(|t| !t.trim().is_empty())
            .enumerate()
        {
            match Destination::from_token(token) {
                Ok(destination) => {
                    store.push(destination);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed destination record");
                }
            }
        }
        store
    }

    /// Load from the key/value store, seeding the built-in list when empty.
    ///
    /// The list is written back so migrations are persisted.
    pub fn load(kv: &mut dyn KeyValueStore) -> Result<Self> {
        let mut blob = kv.get_string(keys::DESTINATIONS, "");
        if blob.is_empty() {
            tracing::info!("No saved destinations, using built-in list");
            blob = DEFAULT_DESTINATIONS.to_string();
        }
        let store = Self::from_encoded(&blob);
        store.save(kv)?;
        tracing::info!(count = store.len(), "Loaded destinations");
        Ok(store)
    }

    /// Encode the whole list.
    pub fn encode(&self) -> String {
        self.destinations
            .iter()
            .map(Destination::to_token)
            .collect::<Vec<_>>()
            .join(&RECORD_SEPARATOR.to_string())
    }

    pub fn save(&self, kv: &mut dyn KeyValueStore) -> Result<()> {
        kv.apply(WriteBatch::new().put_string(keys::DESTINATIONS, self.encode()))
    }

    /// Forget the saved list; the built-in list is used on next load.
    pub fn purge(kv: &mut dyn KeyValueStore) -> Result<()> {
        tracing::info!("Purging saved destinations");
        kv.apply(WriteBatch::new().put_string(keys::DESTINATIONS, ""))
    }

    /// Append a destination and assign it an id.
    pub fn push(&mut self, mut destination: Destination) -> DestinationId {
        self.next_id += 1;
        destination.id = DestinationId(self.next_id);
        let id = destination.id;
        self.destinations.push(destination);
        id
    }

    /// Validate a draft and add it as a user destination.
    pub fn add(&mut self, draft: DestinationDraft) -> Result<DestinationId> {
        draft.validate()?;
        let id = self.push(draft.into_destination());
        tracing::info!(id = %id, "Added destination");
        Ok(id)
    }

    /// Validate a draft and apply it to an existing destination.
    pub fn edit(&mut self, id: DestinationId, draft: &DestinationDraft) -> Result<()> {
        draft.validate()?;
        let destination = self
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        draft.apply_to(destination);
        Ok(())
    }

    pub fn remove(&mut self, id: DestinationId) -> Option<Destination> {
        let index = self.destinations.iter().position(|d| d.id == id)?;
        Some(self.destinations.remove(index))
    }

    /// Flip the favorite flag; returns the new value.
    pub fn toggle_favorite(&mut self, id: DestinationId) -> Result<bool> {
        let destination = self
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        destination.is_favorite = !destination.is_favorite;
        Ok(destination.is_favorite)
    }

    pub fn get(&self, id: DestinationId) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DestinationId) -> Option<&mut Destination> {
        self.destinations.iter_mut().find(|d| d.id == id)
    }

    pub fn first(&self) -> Option<&Destination> {
        self.destinations.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Destination> {
        self.destinations.iter_mut()
    }

    pub fn favorites(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.iter().filter(|d| d.is_favorite)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.name == name)
    }

    /// Ids of destinations whose name is in `names`, in list order.
    pub fn find_by_names(&self, names: &[&str], preconfigured_only: bool) -> Vec<DestinationId> {
        self.destinations
            .iter()
            .filter(|d| !preconfigured_only || d.preconfigured)
            .filter(|d| names.contains(&d.name.as_str()))
            .map(|d| d.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

fn first_version_token(blob: &str) -> Option<&str> {
    blob.split(RECORD_SEPARATOR)
        .find(|t| !t.trim().is_empty())
        .and_then(|t| t.split(FIELD_SEPARATOR).next())
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::destination::TARGET_VERSION_CODE;

    #[test]
    fn test_default_list_decodes_cleanly() {
        let store = DestinationStore::from_encoded(DEFAULT_DESTINATIONS);
        assert_eq!(store.len(), 6);
        assert!(store.iter().all(|d| d.preconfigured && d.is_favorite));
        assert_eq!(store.encode(), DEFAULT_DESTINATIONS);
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let mut store = DestinationStore::from_encoded(DEFAULT_DESTINATIONS);
        let kb = store.find_by_name("KB").unwrap().id();
        let hegnet = store.find_by_name("Hegnet").unwrap().id();
        assert_ne!(kb, hegnet);

        store.remove(kb);
        assert_eq!(store.find_by_name("Hegnet").unwrap().id(), hegnet);
        assert!(store.get(kb).is_none());
    }

    #[test]
    fn test_legacy_v1_list_gets_extra_record() {
        let v1 = "1|true|KB|55.78663|12.52429||false|local_drink";
        let store = DestinationStore::from_encoded(v1);
        assert_eq!(store.len(), 2);

        let verners = store.find_by_name("Verners").expect("appended");
        assert_eq!(verners.version_code, TARGET_VERSION_CODE);
        assert_eq!(verners.icon_id, "sports_bar");

        let kb = store.find_by_name("KB").unwrap();
        assert_eq!(kb.icon_id, "local_bar");
    }

    #[test]
    fn test_v1_rule_only_applies_to_version_one() {
        let store = DestinationStore::from_encoded("10|false|Home|1.0|2.0||false|home");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_malformed_records_skipped() {
        let blob = "3|true|KB|55.0|12.0||true|local_bar¤garbage¤3|false|Home|x|2.0||false|home¤";
        let store = DestinationStore::from_encoded(blob);
        assert_eq!(store.len(), 1);
        assert_eq!(store.first().unwrap().name, "KB");
    }

    #[test]
    fn test_load_seeds_and_persists() {
        let mut kv = MemoryStore::new();
        let store = DestinationStore::load(&mut kv).unwrap();
        assert_eq!(store.len(), 6);
        assert_eq!(kv.get_string(keys::DESTINATIONS, ""), DEFAULT_DESTINATIONS);

        DestinationStore::purge(&mut kv).unwrap();
        assert_eq!(kv.get_string(keys::DESTINATIONS, "x"), "");
    }

    #[test]
    fn test_load_persists_migrations() {
        let mut kv = MemoryStore::new();
        kv.apply(WriteBatch::new().put_string(
            keys::DESTINATIONS,
            "0|true|Hegnet|55.0|12.0||false|local_drink",
        ))
        .unwrap();

        DestinationStore::load(&mut kv).unwrap();
        assert_eq!(
            kv.get_string(keys::DESTINATIONS, ""),
            "3|true|Hegnet|55.0|12.0||true|sports_bar"
        );
    }

    #[test]
    fn test_find_by_names_respects_preconfigured_filter() {
        let mut store = DestinationStore::from_encoded(DEFAULT_DESTINATIONS);
        let mut own_kb = Destination::new("KB", 1.0, 2.0);
        own_kb.preconfigured = false;
        let own_id = store.push(own_kb);

        let preconfigured = store.find_by_names(&["KB"], true);
        assert_eq!(preconfigured.len(), 1);
        assert_ne!(preconfigured[0], own_id);

        assert_eq!(store.find_by_names(&["KB"], false).len(), 2);
        assert!(store.find_by_names(&["Nowhere"], false).is_empty());
    }

    #[test]
    fn test_add_edit_toggle() {
        let mut store = DestinationStore::new();
        let draft = DestinationDraft::from_text("Home", "Main St 1", "55.700000", "12.500000", false, "home")
            .unwrap();
        let id = store.add(draft.clone()).unwrap();
        assert!(!store.get(id).unwrap().preconfigured);

        assert!(store.toggle_favorite(id).unwrap());
        assert_eq!(store.favorites().count(), 1);

        let mut renamed = draft;
        renamed.name = "Flat".to_string();
        store.edit(id, &renamed).unwrap();
        assert_eq!(store.get(id).unwrap().name, "Flat");

        renamed.name.clear();
        assert!(matches!(
            store.edit(id, &renamed),
            Err(AppError::InvalidDestination(_))
        ));
        assert!(matches!(
            store.toggle_favorite(DestinationId(999)),
            Err(AppError::NotFound(_))
        ));
    }
}
