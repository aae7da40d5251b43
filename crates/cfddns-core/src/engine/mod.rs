//! Reconciliation session
//!
//! A [`Session`] owns everything one invocation needs: the remote client,
//! the zone list fetched at connect time, the resolver built from it, and
//! the record cache filled lazily per zone. Nothing is shared between
//! sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ TargetState  │─── zone → prefix → type → content ───┐
//! └──────────────┘                                      │
//!                                                       ▼
//!                                              ┌──────────────┐
//!                                              │   Session    │
//!                                              └──────────────┘
//!                                                       │
//!         ┌─────────────────────────────┬───────────────┴─────────────┐
//!         │                             │                             │
//!         ▼                             ▼                             ▼
//! ┌──────────────┐             ┌────────────────┐            ┌─────────────────┐
//! │ RecordCache  │             │ build_payload  │            │CloudflareClient │
//! │ (diff, index)│             │ (ttl/proxied)  │            │ (HTTP calls)    │
//! └──────────────┘             └────────────────┘            └─────────────────┘
//! ```
//!
//! ## Update Flow (per `(zone, name, type)` group)
//!
//! 1. Load the zone's records into the cache (first touch only)
//! 2. Update existing contents whose ttl/proxied differ
//! 3. Delete contents present remotely but not desired
//! 4. Create desired contents not present remotely
//!
//! Each successful call is mirrored into the cache before the next one and
//! followed by the configured inter-call delay. A failing call stops its
//! group; the pass carries on with the next group and the failure lands in
//! the [`ReconcileReport`]. Cache inconsistencies abort the whole pass.

mod report;

pub use report::{Action, AppliedAction, FailedGroup, GroupRef, ReconcileReport, SkipReason, SkippedGroup};

use crate::cache::RecordCache;
use crate::client::CloudflareClient;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::payload::build_payload;
use crate::resolver::{full_name, ZoneResolver};
use crate::target::{ContentSet, RecordSpec, TargetState};
use crate::types::{DnsRecord, RecordType, Zone};
use tracing::{debug, error, info, warn};

/// Which mutation set a pass is allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Create missing contents, leave existing ones alone
    Create,
    /// Update, delete extras, create missing
    Update,
}

/// One reconciliation session against the provider
pub struct Session {
    client: CloudflareClient,
    config: SessionConfig,
    zones: Vec<Zone>,
    resolver: ZoneResolver,
    cache: RecordCache,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("zones", &self.zones.len())
            .finish()
    }
}

impl Session {
    /// Fetch the account's zones and open a session over them
    ///
    /// Fails when the zone listing fails or returns no zone at all.
    pub async fn connect(client: CloudflareClient, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let zones = client.list_all_zones().await?;
        if zones.is_empty() {
            return Err(Error::zone_not_found("the account has no zones"));
        }
        info!("Loaded {} zone(s)", zones.len());

        let resolver = ZoneResolver::new(zones.iter().map(|zone| zone.name.as_str()));
        let cache = RecordCache::from_zones(&zones);

        Ok(Self {
            client,
            config,
            zones,
            resolver,
            cache,
        })
    }

    pub fn resolver(&self) -> &ZoneResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Known zones in resolution order
    pub fn list_zones(&self) -> Vec<Zone> {
        self.resolver
            .zones()
            .iter()
            .filter_map(|name| {
                self.zones
                    .iter()
                    .find(|zone| zone.name.trim_matches('.').eq_ignore_ascii_case(name))
                    .map(|zone| Zone {
                        id: zone.id.clone(),
                        name: name.clone(),
                    })
            })
            .collect()
    }

    /// Records selected by a target tree
    ///
    /// A zone without prefixes selects the whole zone, a prefix without types
    /// selects every record at that name.
    pub async fn list_records(&mut self, target: &TargetState) -> Result<Vec<DnsRecord>> {
        self.check_zones(target)?;
        let mut records = Vec::new();

        for (zone, prefixes) in target.zones() {
            self.cache
                .ensure_zone_records_loaded(&self.client, zone)
                .await?;

            if prefixes.is_empty() {
                records.extend(self.cache.zone_records(zone)?.into_iter().cloned());
                continue;
            }

            for (prefix, types) in prefixes {
                let name = full_name(prefix, zone);
                if types.is_empty() {
                    records.extend(self.cache.records_at(zone, &name)?.into_iter().cloned());
                    continue;
                }
                for record_type in types.keys() {
                    for id in self.cache.records_for(zone, &name, record_type)?.values() {
                        if let Some(record) = self.cache.record_by_id(id) {
                            records.push(record.clone());
                        }
                    }
                }
            }
        }

        Ok(records)
    }

    /// Create every desired content that does not exist yet
    ///
    /// Existing contents are left untouched and reported as kept.
    pub async fn create_records(&mut self, target: &TargetState) -> Result<ReconcileReport> {
        self.reconcile(target, Mode::Create).await
    }

    /// Make each `(name, type)` group hold exactly the desired contents
    pub async fn update_records(&mut self, target: &TargetState) -> Result<ReconcileReport> {
        self.reconcile(target, Mode::Update).await
    }

    /// Delete the records a target tree selects
    ///
    /// A prefix without types deletes every record at that name, a type
    /// without contents deletes every record of that type, otherwise only
    /// the listed contents go. A zone without prefixes selects nothing.
    pub async fn delete_records(&mut self, target: &TargetState) -> Result<ReconcileReport> {
        self.check_zones(target)?;
        let mut report = ReconcileReport::default();

        for (zone, prefixes) in target.zones() {
            if prefixes.is_empty() {
                warn!("No names selected in zone {}; nothing to delete", zone);
                continue;
            }
            let zone_id = match self.load_zone(zone).await {
                Ok(zone_id) => zone_id,
                Err(e) => {
                    self.record_failure(&mut report, GroupRef::new(zone, None), e)?;
                    continue;
                }
            };

            for (prefix, types) in prefixes {
                let name = full_name(prefix, zone);

                if types.is_empty() {
                    let ids: Vec<String> = self
                        .cache
                        .records_at(zone, &name)?
                        .into_iter()
                        .map(|record| record.id.clone())
                        .collect();
                    let result = self.delete_ids(&zone_id, &ids, &mut report).await;
                    self.finish_group(&mut report, GroupRef::new(name, None), result)?;
                    continue;
                }

                for (record_type, contents) in types {
                    let ids: Vec<String> = self
                        .cache
                        .records_for(zone, &name, record_type)?
                        .into_iter()
                        .filter(|(content, _)| contents.is_empty() || contents.contains_key(content))
                        .map(|(_, id)| id)
                        .collect();
                    let result = self.delete_ids(&zone_id, &ids, &mut report).await;
                    let group = GroupRef::new(name.clone(), Some(record_type.clone()));
                    self.finish_group(&mut report, group, result)?;
                }
            }
        }

        Ok(report)
    }

    async fn reconcile(&mut self, target: &TargetState, mode: Mode) -> Result<ReconcileReport> {
        self.check_zones(target)?;
        check_managed_types(target)?;

        let mut report = ReconcileReport::default();
        refuse_multiple_cnames(target, &mut report);

        for (zone, prefixes) in target.zones() {
            let actionable = prefixes
                .values()
                .flat_map(|types| types.iter())
                .any(|(record_type, desired)| !is_multiple_cname(record_type, desired));
            if !actionable {
                continue;
            }

            let zone_id = match self.load_zone(zone).await {
                Ok(zone_id) => zone_id,
                Err(e) => {
                    self.record_failure(&mut report, GroupRef::new(zone, None), e)?;
                    continue;
                }
            };

            for (prefix, types) in prefixes {
                let name = full_name(prefix, zone);

                for (record_type, desired) in types {
                    let group = GroupRef::new(name.clone(), Some(record_type.clone()));
                    if is_multiple_cname(record_type, desired) {
                        continue;
                    }
                    if !desired.is_empty() && self.conflicts_with_cname(zone, &name, record_type)? {
                        warn!(
                            "WARNING! Skipping {}: {}",
                            group,
                            SkipReason::CnameConflict
                        );
                        report.skip(group, SkipReason::CnameConflict);
                        continue;
                    }

                    if mode == Mode::Create && self.holds_other_cname(zone, &name, record_type, desired)? {
                        warn!("WARNING! Skipping {}: {}", group, SkipReason::CnameTaken);
                        report.skip(group, SkipReason::CnameTaken);
                        continue;
                    }

                    let result = match mode {
                        Mode::Create => {
                            self.create_group(zone, &zone_id, &name, record_type, desired, &mut report)
                                .await
                        }
                        Mode::Update => {
                            self.update_group(zone, &zone_id, &name, record_type, desired, &mut report)
                                .await
                        }
                    };
                    self.finish_group(&mut report, group, result)?;
                }
            }
        }

        Ok(report)
    }

    async fn create_group(
        &mut self,
        zone: &str,
        zone_id: &str,
        name: &str,
        record_type: &RecordType,
        desired: &ContentSet,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let current = self.cache.records_for(zone, name, record_type)?;

        for (content, spec) in desired {
            match current.get(content) {
                Some(record_id) => {
                    let record = self.cache.check_consistent(record_id)?;
                    info!("Escape existing record {}", record.key());
                    report.kept.push(record.key());
                }
                None => {
                    self.create_one(zone, zone_id, name, record_type, content, spec, report)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn update_group(
        &mut self,
        zone: &str,
        zone_id: &str,
        name: &str,
        record_type: &RecordType,
        desired: &ContentSet,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let current = self.cache.records_for(zone, name, record_type)?;

        for (content, spec) in desired {
            let Some(record_id) = current.get(content) else {
                continue;
            };
            let payload = build_payload(
                name,
                record_type.clone(),
                content,
                spec.ttl,
                spec.proxied,
                &self.config,
            );

            let record = self.cache.check_consistent(record_id)?;
            if payload.matches(record) {
                debug!("Keep {} (ttl {}, proxied {})", record.key(), record.ttl, record.proxied);
                report.kept.push(record.key());
                continue;
            }

            let updated = self.client.update_record(zone_id, record_id, &payload).await?;
            self.cache.apply_update(record_id, updated)?;
            let record = self.applied_record(record_id)?;
            info!("Update for {} (ttl {}, proxied {})", record.key(), record.ttl, record.proxied);
            report.applied(Action::Updated, record);
            self.pause().await;
        }

        let extras: Vec<String> = current
            .iter()
            .filter(|(content, _)| !desired.contains_key(*content))
            .map(|(_, id)| id.clone())
            .collect();
        self.delete_ids(zone_id, &extras, report).await?;

        for (content, spec) in desired {
            if !current.contains_key(content) {
                self.create_one(zone, zone_id, name, record_type, content, spec, report)
                    .await?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_one(
        &mut self,
        zone: &str,
        zone_id: &str,
        name: &str,
        record_type: &RecordType,
        content: &str,
        spec: &RecordSpec,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let payload = build_payload(
            name,
            record_type.clone(),
            content,
            spec.ttl,
            spec.proxied,
            &self.config,
        );

        let created = self.client.create_record(zone_id, &payload).await?;
        let record_id = created.id.clone();
        self.cache.insert(zone, created)?;
        let record = self.applied_record(&record_id)?;
        info!("Create {} (ttl {}, proxied {})", record.key(), record.ttl, record.proxied);
        report.applied(Action::Created, record);
        self.pause().await;
        Ok(())
    }

    async fn delete_ids(
        &mut self,
        zone_id: &str,
        record_ids: &[String],
        report: &mut ReconcileReport,
    ) -> Result<()> {
        for record_id in record_ids {
            self.cache.check_consistent(record_id)?;
            self.client.delete_record(zone_id, record_id).await?;
            let record = self.cache.remove(record_id)?;
            info!("Delete {}", record.key());
            report.applied(Action::Deleted, record);
            self.pause().await;
        }
        Ok(())
    }

    /// Load a zone's records and return its id
    async fn load_zone(&mut self, zone: &str) -> Result<String> {
        self.cache
            .ensure_zone_records_loaded(&self.client, zone)
            .await?;
        Ok(self.cache.zone_id(zone)?.to_string())
    }

    fn applied_record(&self, record_id: &str) -> Result<DnsRecord> {
        self.cache
            .record_by_id(record_id)
            .cloned()
            .ok_or_else(|| Error::record_not_found(format!("record id {record_id} vanished from the cache")))
    }

    /// Whether a group would break the CNAME-exclusive rule at its name
    fn conflicts_with_cname(&self, zone: &str, name: &str, record_type: &RecordType) -> Result<bool> {
        let existing = self.cache.records_at(zone, name)?;
        Ok(match record_type {
            RecordType::Cname => existing
                .iter()
                .any(|record| matches!(record.record_type, RecordType::A | RecordType::Aaaa)),
            RecordType::A | RecordType::Aaaa => existing
                .iter()
                .any(|record| record.record_type == RecordType::Cname),
            RecordType::Other(_) => false,
        })
    }

    /// Whether a CNAME group would add a second CNAME at its name
    fn holds_other_cname(
        &self,
        zone: &str,
        name: &str,
        record_type: &RecordType,
        desired: &ContentSet,
    ) -> Result<bool> {
        if *record_type != RecordType::Cname {
            return Ok(false);
        }
        let current = self.cache.records_for(zone, name, record_type)?;
        Ok(current.keys().any(|content| !desired.contains_key(content)))
    }

    fn finish_group(&self, report: &mut ReconcileReport, group: GroupRef, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.record_failure(report, group, e),
        }
    }

    /// Note a failed group; fatal errors end the pass
    fn record_failure(&self, report: &mut ReconcileReport, group: GroupRef, e: Error) -> Result<()> {
        if e.is_fatal() {
            error!("Aborting pass at {}: {}", group, e);
            return Err(e);
        }
        error!("Failed {}: {}", group, e);
        report.fail(group, &e);
        Ok(())
    }

    fn check_zones(&self, target: &TargetState) -> Result<()> {
        for zone in target.zone_names() {
            self.cache.zone(zone)?;
        }
        Ok(())
    }

    async fn pause(&self) {
        let delay = self.config.inter_call_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_multiple_cname(record_type: &RecordType, desired: &ContentSet) -> bool {
    *record_type == RecordType::Cname && desired.len() > 1
}

/// Report every CNAME group with more than one content before any call
fn refuse_multiple_cnames(target: &TargetState, report: &mut ReconcileReport) {
    for (zone, prefixes) in target.zones() {
        for (prefix, types) in prefixes {
            for (record_type, desired) in types {
                if is_multiple_cname(record_type, desired) {
                    let group = GroupRef::new(full_name(prefix, zone), Some(record_type.clone()));
                    warn!(
                        "WARNING! Can't apply {} contents to {}: {}",
                        desired.len(),
                        group,
                        SkipReason::CnameMultiple
                    );
                    report.skip(group, SkipReason::CnameMultiple);
                }
            }
        }
    }
}

fn check_managed_types(target: &TargetState) -> Result<()> {
    for (_, prefixes) in target.zones() {
        for types in prefixes.values() {
            if let Some(record_type) = types.keys().find(|t| !t.is_managed()) {
                return Err(Error::validation(format!(
                    "invalid dns type {record_type} (expected A, AAAA or CNAME)"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_cname_detection() {
        let mut target = TargetState::new();
        target.add_record("example.com", "www", RecordType::Cname, "a.example.com", RecordSpec::default());
        target.add_record("example.com", "www", RecordType::Cname, "b.example.com", RecordSpec::default());
        target.add_record("example.com", "api", RecordType::Cname, "a.example.com", RecordSpec::default());
        target.add_record("example.com", "home", RecordType::A, "1.1.1.1", RecordSpec::default());
        target.add_record("example.com", "home", RecordType::A, "2.2.2.2", RecordSpec::default());

        let mut report = ReconcileReport::default();
        refuse_multiple_cnames(&target, &mut report);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].group.name, "www.example.com");
        assert_eq!(report.skipped[0].reason, SkipReason::CnameMultiple);
    }

    #[test]
    fn unmanaged_types_are_rejected() {
        let mut target = TargetState::new();
        target.add_type("example.com", "mail", RecordType::Other("MX".into()));
        assert!(matches!(check_managed_types(&target), Err(Error::Validation(_))));

        let mut target = TargetState::new();
        target.add_type("example.com", "home", RecordType::Aaaa);
        assert!(check_managed_types(&target).is_ok());
    }
}
