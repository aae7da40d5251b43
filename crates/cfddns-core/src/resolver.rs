//! Domain resolution against the known zone list
//!
//! Zones are kept sorted by label count (most specific first), then
//! lexicographically, so the first suffix match is always the longest one
//! and ties resolve deterministically.

use crate::error::{Error, Result};

/// Prefix spellings that address the zone apex
const APEX_PREFIXES: [&str; 2] = ["", "@"];

/// Lower-case a name and strip surrounding whitespace and dots
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_matches('.').trim().to_ascii_lowercase()
}

/// Whether a prefix addresses the zone apex
pub fn is_apex(prefix: &str) -> bool {
    APEX_PREFIXES.contains(&prefix.trim())
}

/// Fully-qualified name for a prefix within a zone
pub fn full_name(prefix: &str, zone: &str) -> String {
    let prefix = normalize_name(prefix);
    let zone = normalize_name(zone);
    if is_apex(&prefix) {
        zone
    } else {
        format!("{prefix}.{zone}")
    }
}

/// Sort and deduplicate zone names, most specific first
pub fn sort_zones<I, S>(zones: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = zones
        .into_iter()
        .map(|zone| normalize_name(zone.as_ref()))
        .filter(|zone| !zone.is_empty())
        .collect();

    sorted.sort_by(|a, b| {
        label_count(b)
            .cmp(&label_count(a))
            .then_with(|| a.cmp(b))
    });
    sorted.dedup();
    sorted
}

fn label_count(name: &str) -> usize {
    name.split('.').count()
}

/// Maps domains to their owning zone
#[derive(Debug, Clone, Default)]
pub struct ZoneResolver {
    zones: Vec<String>,
}

impl ZoneResolver {
    /// Create a resolver over a set of zone names
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            zones: sort_zones(zones),
        }
    }

    /// Known zones in resolution order
    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    /// Whether the domain is itself a known zone
    pub fn is_zone(&self, domain: &str) -> bool {
        let domain = normalize_name(domain);
        self.zones.iter().any(|zone| *zone == domain)
    }

    /// Whether some known zone is a proper suffix of the domain
    pub fn has_root_zone(&self, domain: &str) -> bool {
        let domain = normalize_name(domain);
        self.zones
            .iter()
            .any(|zone| domain.ends_with(&format!(".{zone}")))
    }

    /// Split a domain into `(prefix, zone)`
    ///
    /// A domain equal to a zone yields an empty prefix. Callers that need a
    /// sub-domain must reject that case themselves.
    pub fn split_domain(&self, domain: &str) -> Result<(String, String)> {
        let domain = normalize_name(domain);

        for zone in &self.zones {
            if domain == *zone {
                return Ok((String::new(), zone.clone()));
            }
            if let Some(prefix) = domain.strip_suffix(&format!(".{zone}")) {
                return Ok((prefix.trim_matches('.').to_string(), zone.clone()));
            }
        }

        Err(Error::zone_not_found(format!(
            "no known zone owns domain {domain:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(["example.com", "b.example.com", "a.example.com", "example.org."])
    }

    #[test]
    fn zones_sorted_by_label_count_then_name() {
        assert_eq!(
            resolver().zones(),
            &["a.example.com", "b.example.com", "example.com", "example.org"]
        );
    }

    #[test]
    fn sort_zones_deduplicates() {
        assert_eq!(
            sort_zones(["Example.com", "example.com.", " example.com "]),
            vec!["example.com"]
        );
        assert!(sort_zones(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn split_prefers_longest_zone() {
        let resolver = resolver();
        assert_eq!(
            resolver.split_domain("www.a.example.com").unwrap(),
            ("www".to_string(), "a.example.com".to_string())
        );
        assert_eq!(
            resolver.split_domain("deep.www.example.com").unwrap(),
            ("deep.www".to_string(), "example.com".to_string())
        );
        assert_eq!(
            resolver.split_domain("HOME.Example.ORG.").unwrap(),
            ("home".to_string(), "example.org".to_string())
        );
    }

    #[test]
    fn split_zone_itself_has_empty_prefix() {
        assert_eq!(
            resolver().split_domain("example.com").unwrap(),
            (String::new(), "example.com".to_string())
        );
    }

    #[test]
    fn split_unknown_domain_fails() {
        let err = resolver().split_domain("example.net").unwrap_err();
        assert!(matches!(err, Error::ZoneNotFound(_)));

        // suffix must fall on a label boundary
        let err = resolver().split_domain("notexample.com").unwrap_err();
        assert!(matches!(err, Error::ZoneNotFound(_)));
    }

    #[test]
    fn zone_predicates() {
        let resolver = resolver();
        assert!(resolver.is_zone("example.com"));
        assert!(!resolver.is_zone("www.example.com"));
        assert!(resolver.has_root_zone("www.example.com"));
        assert!(!resolver.has_root_zone("example.com"));
        assert!(!resolver.has_root_zone("example.net"));
    }

    #[test]
    fn full_name_handles_apex() {
        assert_eq!(full_name("home", "example.com"), "home.example.com");
        assert_eq!(full_name("", "example.com"), "example.com");
        assert_eq!(full_name("@", "example.com"), "example.com");
        assert!(is_apex("@"));
        assert!(!is_apex("www"));
    }
}
