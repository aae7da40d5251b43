//! Desired record state
//!
//! A [`TargetState`] is the tree `zone → prefix → type → content → spec`
//! handed to one reconciliation pass. Empty levels carry meaning for the
//! delete and list actions: a zone with no prefixes means "the whole zone",
//! a prefix with no types means "every type at this name", and a type with
//! no contents means "every record of this type".

use crate::error::{Error, Result};
use crate::resolver::normalize_name;
use crate::types::RecordType;
use std::collections::BTreeMap;

/// Per-content ttl and proxied settings
///
/// `None` defers to the session defaults when the payload is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSpec {
    pub ttl: Option<u32>,
    pub proxied: Option<bool>,
}

impl RecordSpec {
    pub fn new(ttl: Option<u32>, proxied: Option<bool>) -> Self {
        Self { ttl, proxied }
    }
}

/// content → settings
pub type ContentSet = BTreeMap<String, RecordSpec>;

/// type → contents
pub type TypeSet = BTreeMap<RecordType, ContentSet>;

/// prefix → types
pub type PrefixSet = BTreeMap<String, TypeSet>;

/// Desired state for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetState {
    zones: BTreeMap<String, PrefixSet>,
}

impl TargetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no zone has been added
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones in order with their prefixes
    pub fn zones(&self) -> impl Iterator<Item = (&str, &PrefixSet)> {
        self.zones.iter().map(|(zone, prefixes)| (zone.as_str(), prefixes))
    }

    /// Zone names in order
    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// Add a zone (no prefixes)
    pub fn add_zone(&mut self, zone: &str) -> &mut PrefixSet {
        self.zones.entry(normalize_name(zone)).or_default()
    }

    /// Add a prefix under a zone (no types)
    pub fn add_prefix(&mut self, zone: &str, prefix: &str) -> &mut TypeSet {
        self.add_zone(zone)
            .entry(normalize_name(prefix))
            .or_default()
    }

    /// Add a type under a prefix (no contents)
    pub fn add_type(&mut self, zone: &str, prefix: &str, record_type: RecordType) -> &mut ContentSet {
        self.add_prefix(zone, prefix).entry(record_type).or_default()
    }

    /// Add one desired record
    pub fn add_record(
        &mut self,
        zone: &str,
        prefix: &str,
        record_type: RecordType,
        content: &str,
        spec: RecordSpec,
    ) {
        self.add_type(zone, prefix, record_type)
            .insert(content.trim().to_string(), spec);
    }

    /// Set the contents of one type on every prefix already present
    ///
    /// Replaces whatever contents that type held before.
    pub fn set_type_everywhere(&mut self, record_type: RecordType, contents: &ContentSet) {
        for prefixes in self.zones.values_mut() {
            for types in prefixes.values_mut() {
                types.insert(record_type.clone(), contents.clone());
            }
        }
    }

    /// Add a type with no contents to every prefix already present
    pub fn select_type_everywhere(&mut self, record_type: RecordType) {
        for prefixes in self.zones.values_mut() {
            for types in prefixes.values_mut() {
                types.insert(record_type.clone(), ContentSet::new());
            }
        }
    }
}

/// Split a list value on `;`, `,`, `|` and whitespace
///
/// Empty pieces are dropped and duplicates removed, keeping first-seen order.
pub fn split_content(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for piece in value.split(|c: char| c == ';' || c == ',' || c == '|' || c.is_whitespace()) {
        if !piece.is_empty() && !items.iter().any(|item| item == piece) {
            items.push(piece.to_string());
        }
    }
    items
}

/// [`split_content`] over several values, deduplicated across all of them
pub fn split_content_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items: Vec<String> = Vec::new();
    for value in values {
        for piece in split_content(value.as_ref()) {
            if !items.contains(&piece) {
                items.push(piece);
            }
        }
    }
    items
}

/// Parse a yes/no style flag value
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        other => Err(Error::validation(format!("boolean value expected, got {other:?}"))),
    }
}

/// One `name,type,content,ttl,proxied` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub prefix: String,
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RawRecord {
    /// Parse a raw line; fields may be separated like [`split_content`] lists
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line
            .split(|c: char| c == ';' || c == ',' || c == '|' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .collect();

        let [prefix, record_type, content, ttl, proxied] = fields.as_slice() else {
            return Err(Error::validation(format!(
                "invalid raw content {line:?}: expected name,type,content,ttl,proxied"
            )));
        };

        let ttl = ttl
            .parse::<u32>()
            .map_err(|_| Error::validation(format!("invalid ttl {ttl:?} in raw content {line:?}")))?;

        Ok(Self {
            prefix: prefix.to_string(),
            record_type: RecordType::parse_managed(record_type)?,
            content: content.to_string(),
            ttl,
            proxied: parse_bool(proxied)?,
        })
    }

    /// Content to use in a zone
    ///
    /// Alias-style lines name a target relative to the zone.
    pub fn to_content(&self, zone: &str, alias: bool) -> String {
        if alias {
            format!("{}.{}", self.content, normalize_name(zone))
        } else {
            self.content.clone()
        }
    }

    pub fn spec(&self) -> RecordSpec {
        RecordSpec::new(Some(self.ttl), Some(self.proxied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_content_handles_all_separators() {
        assert_eq!(
            split_content("1.1.1.1, 2.2.2.2;3.3.3.3|4.4.4.4  5.5.5.5"),
            vec!["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4", "5.5.5.5"]
        );
        assert_eq!(split_content("a,,a; b"), vec!["a", "b"]);
        assert!(split_content(" ,; ").is_empty());
    }

    #[test]
    fn split_content_list_dedups_across_values() {
        assert_eq!(
            split_content_list(["a,b", "b c", "a"]),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for yes in ["yes", "True", "t", "Y", "1"] {
            assert!(parse_bool(yes).unwrap());
        }
        for no in ["no", "FALSE", "f", "n", "0"] {
            assert!(!parse_bool(no).unwrap());
        }
        assert!(matches!(parse_bool("maybe"), Err(Error::Validation(_))));
    }

    #[test]
    fn raw_record_parses_five_fields() {
        let raw = RawRecord::parse("ww1,A,1.1.1.1,60,false").unwrap();
        assert_eq!(raw.prefix, "ww1");
        assert_eq!(raw.record_type, RecordType::A);
        assert_eq!(raw.content, "1.1.1.1");
        assert_eq!(raw.ttl, 60);
        assert!(!raw.proxied);
        assert_eq!(raw.spec(), RecordSpec::new(Some(60), Some(false)));
    }

    #[test]
    fn raw_record_rejects_bad_lines() {
        assert!(matches!(RawRecord::parse("ww1,A,1.1.1.1,60"), Err(Error::Validation(_))));
        assert!(matches!(
            RawRecord::parse("ww1,A,1.1.1.1,60,false,extra"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(RawRecord::parse("ww1,MX,mail,60,false"), Err(Error::Validation(_))));
        assert!(matches!(RawRecord::parse("ww1,A,1.1.1.1,soon,false"), Err(Error::Validation(_))));
    }

    #[test]
    fn raw_alias_expands_against_zone() {
        let raw = RawRecord::parse("ww2 CNAME w1 60 true").unwrap();
        assert_eq!(raw.to_content("Example.com", true), "w1.example.com");
        assert_eq!(raw.to_content("example.com", false), "w1");
    }

    #[test]
    fn target_tree_keeps_empty_levels() {
        let mut target = TargetState::new();
        target.add_zone("Example.com.");
        target.add_prefix("example.com", "home");
        target.add_record(
            "example.org",
            "www",
            RecordType::A,
            " 1.2.3.4 ",
            RecordSpec::new(Some(300), None),
        );

        let zones: Vec<_> = target.zone_names().collect();
        assert_eq!(zones, vec!["example.com", "example.org"]);

        let (_, prefixes) = target.zones().next().unwrap();
        assert!(prefixes["home"].is_empty());

        let (_, prefixes) = target.zones().nth(1).unwrap();
        assert!(prefixes["www"][&RecordType::A].contains_key("1.2.3.4"));
    }

    #[test]
    fn set_type_everywhere_replaces_contents() {
        let mut target = TargetState::new();
        target.add_prefix("example.com", "a");
        target.add_prefix("example.com", "b");
        target.add_record("example.com", "a", RecordType::A, "9.9.9.9", RecordSpec::default());

        let mut contents = ContentSet::new();
        contents.insert("1.1.1.1".into(), RecordSpec::new(Some(60), Some(false)));
        target.set_type_everywhere(RecordType::A, &contents);
        target.select_type_everywhere(RecordType::Cname);

        let (_, prefixes) = target.zones().next().unwrap();
        for prefix in ["a", "b"] {
            assert_eq!(prefixes[prefix][&RecordType::A], contents);
            assert!(prefixes[prefix][&RecordType::Cname].is_empty());
        }
    }
}
