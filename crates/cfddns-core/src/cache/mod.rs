//! In-memory mirror of the provider's zones and records
//!
//! Two views are kept over the same records:
//!
//! - `by_id`: record id → record
//! - per zone: `RecordKey (name, type, content)` → record id
//!
//! Every mutation updates both before returning. Update and delete go
//! through [`RecordCache::check_consistent`] first: a record that can be
//! found by id but not by its composite key (or under a different id) means
//! the cache has drifted, and the caller must stop rather than risk touching
//! the wrong record.

use crate::client::CloudflareClient;
use crate::error::{Error, Result};
use crate::resolver::normalize_name;
use crate::types::{DnsRecord, RecordKey, RecordType, Zone};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Cached zone and its record index
#[derive(Debug, Clone)]
pub struct ZoneEntry {
    /// Provider zone id
    pub id: String,
    /// Normalized zone name
    pub name: String,
    loaded: bool,
    records: BTreeMap<RecordKey, String>,
}

impl ZoneEntry {
    fn new(zone: &Zone) -> Self {
        Self {
            id: zone.id.clone(),
            name: normalize_name(&zone.name),
            loaded: false,
            records: BTreeMap::new(),
        }
    }

    /// Whether the zone's records have been fetched
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of indexed records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Zone and record cache owned by one session
#[derive(Debug, Default)]
pub struct RecordCache {
    zones: BTreeMap<String, ZoneEntry>,
    by_id: HashMap<String, DnsRecord>,
}

impl RecordCache {
    /// Create a cache over the given zones, with no records loaded
    pub fn from_zones(zones: &[Zone]) -> Self {
        let zones = zones
            .iter()
            .map(ZoneEntry::new)
            .filter(|entry| !entry.name.is_empty())
            .map(|entry| (entry.name.clone(), entry))
            .collect();

        Self {
            zones,
            by_id: HashMap::new(),
        }
    }

    /// Cached zone names, sorted
    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// Look up a zone
    pub fn zone(&self, zone: &str) -> Result<&ZoneEntry> {
        self.zones
            .get(&normalize_name(zone))
            .ok_or_else(|| Error::zone_not_found(format!("zone {zone:?} is not known")))
    }

    /// Provider id of a zone
    pub fn zone_id(&self, zone: &str) -> Result<&str> {
        self.zone(zone).map(|entry| entry.id.as_str())
    }

    /// Whether a zone's records have been fetched
    pub fn is_loaded(&self, zone: &str) -> bool {
        self.zone(zone).map(ZoneEntry::is_loaded).unwrap_or(false)
    }

    /// Fetch a zone's records unless they are already cached
    pub async fn ensure_zone_records_loaded(
        &mut self,
        client: &CloudflareClient,
        zone: &str,
    ) -> Result<()> {
        let entry = self.zone(zone)?;
        if entry.is_loaded() {
            return Ok(());
        }

        let zone_id = entry.id.clone();
        let zone_name = entry.name.clone();
        let records = client.list_all_records(&zone_id).await?;
        debug!("Loaded {} record(s) for zone {}", records.len(), zone_name);
        self.load_zone(&zone_name, records)
    }

    /// Replace a zone's records with a fetched listing and mark it loaded
    pub fn load_zone(&mut self, zone: &str, records: Vec<DnsRecord>) -> Result<()> {
        let zone_name = self.zone(zone)?.name.clone();

        let stale: Vec<String> = self
            .zones
            .get(&zone_name)
            .map(|entry| entry.records.values().cloned().collect())
            .unwrap_or_default();
        for id in stale {
            self.by_id.remove(&id);
        }
        if let Some(entry) = self.zones.get_mut(&zone_name) {
            entry.records.clear();
        }

        for record in records {
            self.insert(&zone_name, record)?;
        }
        if let Some(entry) = self.zones.get_mut(&zone_name) {
            entry.loaded = true;
        }
        Ok(())
    }

    /// Record by id
    pub fn record_by_id(&self, record_id: &str) -> Option<&DnsRecord> {
        self.by_id.get(record_id)
    }

    /// `content → record id` for one `(name, type)` pair
    pub fn records_for(
        &self,
        zone: &str,
        name: &str,
        record_type: &RecordType,
    ) -> Result<BTreeMap<String, String>> {
        let name = normalize_name(name);
        let start = RecordKey::new(name.as_str(), record_type.clone(), "");

        Ok(self
            .zone(zone)?
            .records
            .range(start..)
            .take_while(|(key, _)| key.name == name && key.record_type == *record_type)
            .map(|(key, id)| (key.content.clone(), id.clone()))
            .collect())
    }

    /// Every record at a name, any type, ordered by type then content
    pub fn records_at(&self, zone: &str, name: &str) -> Result<Vec<&DnsRecord>> {
        let name = normalize_name(name);
        Ok(self
            .zone(zone)?
            .records
            .iter()
            .filter(|(key, _)| key.name == name)
            .filter_map(|(_, id)| self.by_id.get(id))
            .collect())
    }

    /// Every record of a zone, ordered by name, type and content
    pub fn zone_records(&self, zone: &str) -> Result<Vec<&DnsRecord>> {
        Ok(self
            .zone(zone)?
            .records
            .values()
            .filter_map(|id| self.by_id.get(id))
            .collect())
    }

    /// Verify both views agree on a record before it is mutated
    pub fn check_consistent(&self, record_id: &str) -> Result<&DnsRecord> {
        let record = self.by_id.get(record_id).ok_or_else(|| {
            Error::record_not_found(format!("record id {record_id} is not in the local cache"))
        })?;

        let key = record.key();
        let indexed = self
            .zones
            .get(&record.zone_name)
            .and_then(|entry| entry.records.get(&key));

        match indexed {
            None => Err(Error::inconsistent(format!(
                "record {key} (id {record_id}) is missing from the zone index"
            ))),
            Some(id) if id != record_id => Err(Error::inconsistent(format!(
                "record {key} is indexed under id {id}, expected {record_id}"
            ))),
            Some(_) => Ok(record),
        }
    }

    /// Add a record to both views
    pub fn insert(&mut self, zone: &str, mut record: DnsRecord) -> Result<()> {
        let zone_name = self.zone(zone)?.name.clone();
        record.name = normalize_name(&record.name);
        record.zone_name = zone_name.clone();

        if let Some(entry) = self.zones.get_mut(&zone_name) {
            entry.records.insert(record.key(), record.id.clone());
        }
        self.by_id.insert(record.id.clone(), record);
        Ok(())
    }

    /// Replace a record after a successful update
    ///
    /// A content change moves the index entry to the new key.
    pub fn apply_update(&mut self, record_id: &str, mut updated: DnsRecord) -> Result<()> {
        let old = self.check_consistent(record_id)?.clone();

        updated.id = record_id.to_string();
        updated.name = normalize_name(&updated.name);
        updated.zone_name = old.zone_name.clone();

        if let Some(entry) = self.zones.get_mut(&old.zone_name) {
            entry.records.remove(&old.key());
            entry.records.insert(updated.key(), record_id.to_string());
        }
        self.by_id.insert(record_id.to_string(), updated);
        Ok(())
    }

    /// Drop a record from both views after a successful delete
    pub fn remove(&mut self, record_id: &str) -> Result<DnsRecord> {
        let key = self.check_consistent(record_id)?.key();

        let record = self.by_id.remove(record_id).ok_or_else(|| {
            Error::record_not_found(format!("record id {record_id} is not in the local cache"))
        })?;
        if let Some(entry) = self.zones.get_mut(&record.zone_name) {
            entry.records.remove(&key);
        }
        Ok(record)
    }

    #[cfg(test)]
    fn corrupt_index(&mut self, zone: &str, key: RecordKey, id: &str) {
        if let Some(entry) = self.zones.get_mut(zone) {
            entry.records.insert(key, id.to_string());
        }
    }
}
