//! Update targets and the subdomain specification parser.
//!
//! A specification is a comma-separated list of entries, each a subdomain
//! label optionally followed by a record type in braces:
//!
//! ```text
//! vpn,nas{AAAA},@{A}
//! ```
//!
//! Empty entries (trailing or doubled commas) are skipped with a warning.
//! Any malformed entry invalidates the whole specification.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name used for the parent domain itself.
pub const APEX: &str = "@";

/// DNS record types the updater manages.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    AAAA,
}

/// Address family of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl RecordType {
    pub fn family(self) -> AddressFamily {
        match self {
            RecordType::A => AddressFamily::V4,
            RecordType::AAAA => AddressFamily::V6,
        }
    }

    /// Case-insensitive parse, as accepted inside `name{type}` entries.
    pub fn parse_lenient(s: &str) -> std::result::Result<Self, String> {
        s.trim().to_ascii_uppercase().parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            other => Err(format!("unsupported record type '{}' (expected A or AAAA)", other)),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// One (name, record type) pair to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub name: String,
    pub record_type: RecordType,
}

impl Target {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
        }
    }

    /// Whether this target addresses the parent domain itself.
    pub fn is_apex(&self) -> bool {
        is_apex(&self.name)
    }

    /// Fully-qualified name of this target under `domain`.
    pub fn fqdn(&self, domain: &str) -> String {
        qualify(domain, &self.name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.record_type)
    }
}

pub(crate) fn is_apex(name: &str) -> bool {
    name.is_empty() || name == APEX
}

/// Join a subdomain onto its parent domain; the apex maps to the domain.
pub fn qualify(domain: &str, subdomain: &str) -> String {
    if is_apex(subdomain) {
        domain.to_string()
    } else {
        format!("{}.{}", subdomain, domain)
    }
}

/// Parse a subdomain specification, logging and discarding malformed input.
///
/// Returns an empty list when any entry is malformed.
pub fn parse_targets(spec: &str, default_record_type: RecordType) -> Vec<Target> {
    match try_parse_targets(spec, default_record_type) {
        Ok(targets) => targets,
        Err(e) => {
            tracing::error!("Invalid value for SUBDOMAIN: {}", e);
            Vec::new()
        }
    }
}

/// Parse a subdomain specification, failing on the first malformed entry.
pub fn try_parse_targets(spec: &str, default_record_type: RecordType) -> Result<Vec<Target>> {
    tracing::debug!(
        "Parsing subdomain specification {:?} with default record type {}",
        spec,
        default_record_type
    );

    if spec.trim().is_empty() {
        tracing::debug!("Subdomain specification empty, using the parent domain");
        return Ok(vec![Target::new(APEX, default_record_type)]);
    }

    let mut targets = Vec::new();
    for token in spec.split(',') {
        match parse_token(token, default_record_type)? {
            Some(target) => {
                tracing::debug!("Parsed {:?} as {}", token, target);
                targets.push(target);
            }
            None => {
                tracing::warn!(
                    "Ignoring empty entry in SUBDOMAIN; entries must not be empty and the list must not end with a comma"
                );
            }
        }
    }

    Ok(targets)
}

/// Parse one `name` or `name{TYPE}` entry. `Ok(None)` means the name is empty.
fn parse_token(token: &str, default_record_type: RecordType) -> Result<Option<Target>> {
    let entry = token.trim();
    let (name, record_type) = match entry.find('{') {
        None => {
            if entry.contains('}') {
                return Err(malformed(token, "closing brace without opening brace"));
            }
            (entry, None)
        }
        Some(open) => {
            let name = &entry[..open];
            let Some(inner) = entry[open + 1..].strip_suffix('}') else {
                return Err(malformed(
                    token,
                    "record type must be closed by '}' at the end of the entry",
                ));
            };
            if name.contains('}') || inner.contains(['{', '}']) {
                return Err(malformed(token, "unbalanced braces"));
            }
            (name, Some(inner))
        }
    };

    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }

    let record_type = match record_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => RecordType::parse_lenient(t).map_err(|reason| malformed(token, reason))?,
        None => default_record_type,
    };

    Ok(Some(Target::new(name, record_type)))
}

fn malformed(token: &str, reason: impl Into<String>) -> DdnsError {
    DdnsError::Parse {
        token: token.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::RecordType::{A, AAAA};

    fn targets(pairs: &[(&str, RecordType)]) -> Vec<Target> {
        pairs.iter().map(|(n, t)| Target::new(*n, *t)).collect()
    }

    #[test]
    fn test_empty_spec_targets_apex() {
        assert_eq!(parse_targets("", A), targets(&[("@", A)]));
        assert_eq!(parse_targets("", AAAA), targets(&[("@", AAAA)]));
    }

    #[test]
    fn test_name_without_record_type() {
        assert_eq!(parse_targets("test", A), targets(&[("test", A)]));
        assert_eq!(parse_targets("test", AAAA), targets(&[("test", AAAA)]));
    }

    #[test]
    fn test_name_with_record_type() {
        assert_eq!(parse_targets("test{AAAA}", A), targets(&[("test", AAAA)]));
        assert_eq!(parse_targets("test{A}", AAAA), targets(&[("test", A)]));
    }

    #[test]
    fn test_multiple_entries() {
        let spec = "testa{AAAA},testb{A},testc{AAAA},testd";
        assert_eq!(
            parse_targets(spec, A),
            targets(&[("testa", AAAA), ("testb", A), ("testc", AAAA), ("testd", A)])
        );
        assert_eq!(
            parse_targets(spec, AAAA),
            targets(&[("testa", AAAA), ("testb", A), ("testc", AAAA), ("testd", AAAA)])
        );
    }

    #[test]
    fn test_trailing_comma_dropped() {
        assert_eq!(parse_targets("test,", A), targets(&[("test", A)]));
    }

    #[test]
    fn test_double_comma_dropped() {
        assert_eq!(
            parse_targets("testa,,testb", A),
            targets(&[("testa", A), ("testb", A)])
        );
    }

    #[test]
    fn test_empty_braces_use_default() {
        assert_eq!(parse_targets("vpn{}", AAAA), targets(&[("vpn", AAAA)]));
    }

    #[test]
    fn test_lowercase_record_type_in_braces() {
        assert_eq!(
            parse_targets("vpn{aaaa},nas{a}", A),
            targets(&[("vpn", AAAA), ("nas", A)])
        );
    }

    #[test]
    fn test_apex_with_override() {
        assert_eq!(
            parse_targets("@{AAAA},www", A),
            targets(&[("@", AAAA), ("www", A)])
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            parse_targets(" vpn { AAAA } , nas", A),
            targets(&[("vpn", AAAA), ("nas", A)])
        );
        assert_eq!(parse_targets("vpn,  ,nas", A), targets(&[("vpn", A), ("nas", A)]));
    }

    #[test]
    fn test_unmatched_open_brace_discards_everything() {
        assert!(parse_targets("testa,testb{AAAA", A).is_empty());
        assert!(parse_targets("testa{", A).is_empty());
    }

    #[test]
    fn test_stray_closing_brace_discards_everything() {
        assert!(parse_targets("testa}", A).is_empty());
        assert!(parse_targets("good,te}st{A}", A).is_empty());
    }

    #[test]
    fn test_nested_braces_rejected() {
        assert!(parse_targets("test{{A}}", A).is_empty());
        assert!(parse_targets("test{A}{AAAA}", A).is_empty());
    }

    #[test]
    fn test_text_after_record_type_rejected() {
        assert!(parse_targets("a{A}x", A).is_empty());
    }

    #[test]
    fn test_unknown_record_type_rejected() {
        let err = try_parse_targets("vpn,mail{MX}", A).unwrap_err();
        match err {
            DdnsError::Parse { token, .. } => assert_eq!(token, "mail{MX}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_targets("vpn,mail{MX}", A).is_empty());
    }

    #[test]
    fn test_empty_name_skipped_before_type_check() {
        assert_eq!(parse_targets("{MX},vpn", A), targets(&[("vpn", A)]));
    }

    #[test]
    fn test_only_commas_yields_nothing() {
        assert!(parse_targets(",,", A).is_empty());
    }

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("A".parse::<RecordType>(), Ok(A));
        assert_eq!("AAAA".parse::<RecordType>(), Ok(AAAA));
        assert!("aaaa".parse::<RecordType>().is_err());
        assert!("a".parse::<RecordType>().is_err());
        assert_eq!(RecordType::parse_lenient("aaaa"), Ok(AAAA));
        assert!("CNAME".parse::<RecordType>().is_err());
        assert_eq!(AAAA.to_string(), "AAAA");
        assert_eq!(A.family(), AddressFamily::V4);
        assert_eq!(AAAA.family(), AddressFamily::V6);
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(Target::new("@", A).fqdn("example.com"), "example.com");
        assert_eq!(Target::new("vpn", A).fqdn("example.com"), "vpn.example.com");
        assert_eq!(qualify("example.com", ""), "example.com");
        assert!(Target::new("@", AAAA).is_apex());
    }
}
