// Turning command-line inputs into a TargetState.
//
// Building happens in two steps. `Plan::from_cli` gathers and parses every
// value that needs no remote data (raw lines, files, record types). Once
// the zones are known, `Plan::build_target` resolves domains and zones and
// lays the values out as a TargetState.

use crate::cli::{Cli, Command};
use anyhow::Context;
use cfddns_core::target::{ContentSet, RawRecord, RecordSpec, split_content_list};
use cfddns_core::{Error, RecordType, Result, TargetState, ZoneResolver};
use std::net::IpAddr;
use std::path::Path;
use tracing::warn;

/// Everything a run needs besides the remote zone list
#[derive(Debug, Clone)]
pub struct Plan {
    pub command: Command,
    zones: Vec<String>,
    domains: Vec<String>,
    aliases: Vec<String>,
    ipv4: Vec<String>,
    ipv6: Vec<String>,
    cname: Option<String>,
    cname_alias: Option<String>,
    raw: Vec<RawRecord>,
    raw_alias: Vec<RawRecord>,
    dns_types: Vec<RecordType>,
    spec: RecordSpec,
}

impl Plan {
    /// Gather inputs from validated flags, reading raw files
    pub fn from_cli(cli: &Cli, command: Command) -> anyhow::Result<Self> {
        let mut raw_lines = split_lines(&cli.raw);
        if let Some(path) = &cli.raw_file {
            raw_lines.extend(read_raw_file(path).context("failed to read --raw-file")?);
        }
        let mut raw_alias_lines = split_lines(&cli.raw_alias);
        if let Some(path) = &cli.raw_alias_file {
            raw_alias_lines.extend(read_raw_file(path).context("failed to read --raw-alias-file")?);
        }

        let dns_types = split_content_list(&cli.dns_type)
            .iter()
            .map(|value| RecordType::parse_managed(value))
            .collect::<Result<Vec<_>>>()?;
        if !dns_types.is_empty() && !matches!(command, Command::ListRecords | Command::Delete) {
            warn!("--dns-type only applies to --list-record and --delete-record; ignoring it");
        }

        Ok(Self {
            command,
            zones: split_content_list(&cli.zone),
            domains: split_content_list(&cli.domain),
            aliases: split_content_list(&cli.alias),
            ipv4: split_content_list(&cli.ipv4),
            ipv6: split_content_list(&cli.ipv6),
            cname: cli.cname.clone(),
            cname_alias: cli.cname_alias.clone(),
            raw: parse_raw_lines(&raw_lines)?,
            raw_alias: parse_raw_lines(&raw_alias_lines)?,
            dns_types,
            spec: RecordSpec::new(Some(cli.ttl), Some(cli.proxied)),
        })
    }

    /// Add a discovered public address to the address lists
    pub fn add_address(&mut self, ip: IpAddr) {
        let list = match ip {
            IpAddr::V4(_) => &mut self.ipv4,
            IpAddr::V6(_) => &mut self.ipv6,
        };
        let ip = ip.to_string();
        if !list.contains(&ip) {
            list.push(ip);
        }
    }

    /// Lay the inputs out as a TargetState over the known zones
    ///
    /// A `--domain` must not be a zone itself and must belong to one;
    /// a `--zone` must be a known zone.
    pub fn build_target(&self, resolver: &ZoneResolver) -> Result<TargetState> {
        let mut target = TargetState::new();

        for domain in &self.domains {
            if resolver.is_zone(domain) {
                return Err(Error::validation(format!(
                    "{domain} is a zone; use --zone with --alias instead of --domain"
                )));
            }
            if !resolver.has_root_zone(domain) {
                return Err(Error::zone_not_found(format!(
                    "{domain} has no root zone in this account"
                )));
            }
            let (prefix, zone) = resolver.split_domain(domain)?;
            target.add_prefix(&zone, &prefix);
        }

        for zone in &self.zones {
            if !resolver.is_zone(zone) {
                return Err(Error::zone_not_found(format!(
                    "{zone} is not a zone in this account"
                )));
            }
            target.add_zone(zone);
            for alias in &self.aliases {
                target.add_prefix(zone, alias);
            }
        }

        if target.is_empty() {
            return Err(Error::validation("no valid domain provided"));
        }

        if !self.ipv4.is_empty() {
            target.set_type_everywhere(RecordType::A, &self.contents(&self.ipv4));
        }
        if !self.ipv6.is_empty() {
            target.set_type_everywhere(RecordType::Aaaa, &self.contents(&self.ipv6));
        }

        let zones: Vec<(String, Vec<String>)> = target
            .zones()
            .map(|(zone, prefixes)| (zone.to_string(), prefixes.keys().cloned().collect()))
            .collect();

        for (zone, prefixes) in &zones {
            let cname = match (&self.cname, &self.cname_alias) {
                (Some(cname), _) => Some(cname.clone()),
                (None, Some(alias)) => Some(format!("{alias}.{zone}")),
                (None, None) => None,
            };
            if let Some(cname) = cname {
                for prefix in prefixes {
                    let contents = target.add_type(zone, prefix, RecordType::Cname);
                    contents.clear();
                    contents.insert(cname.clone(), self.spec);
                }
            }

            for raw in &self.raw {
                target.add_record(zone, &raw.prefix, raw.record_type.clone(), &raw.to_content(zone, false), raw.spec());
            }
            for raw in &self.raw_alias {
                target.add_record(zone, &raw.prefix, raw.record_type.clone(), &raw.to_content(zone, true), raw.spec());
            }
        }

        if matches!(self.command, Command::ListRecords | Command::Delete) {
            for record_type in &self.dns_types {
                target.select_type_everywhere(record_type.clone());
            }
        }

        Ok(target)
    }

    fn contents(&self, values: &[String]) -> ContentSet {
        values.iter().map(|value| (value.clone(), self.spec)).collect()
    }
}

/// Raw values given on the command line, one record each
fn split_lines(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn read_raw_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse raw lines, dropping exact duplicates
fn parse_raw_lines(lines: &[String]) -> Result<Vec<RawRecord>> {
    let mut records: Vec<RawRecord> = Vec::new();
    for line in lines {
        let record = RawRecord::parse(line)?;
        if !records.contains(&record) {
            records.push(record);
        }
    }
    Ok(records)
}
