//! Server capability resolution
//!
//! `pg_stat_statements` grew optional columns over time. The capability
//! matrix maps a server version to the column groups the rest of the
//! pipeline may rely on, so query construction never splices fragments
//! based on ad hoc version checks.

use crate::error::{configuration_error, SnapError};
use std::fmt;

/// Server version as (major, minor), e.g. 9.6 or 14.2.
///
/// Parsed from the `server_version` setting; patch levels and vendor
/// suffixes ("9.6.24", "14.2 (Debian 14.2-1)") are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the `server_version` text reported by the server.
    pub fn parse(text: &str) -> Result<Self, SnapError> {
        let token = text.trim().split_whitespace().next().unwrap_or("");
        let mut parts = token.split('.');

        let major = leading_number(parts.next().unwrap_or(""))
            .ok_or_else(|| configuration_error(format!("unrecognized server version: {text:?}")))?;
        // "10beta1" reports no minor component at all
        let minor = parts.next().and_then(leading_number).unwrap_or(0);

        Ok(Self { major, minor })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parse the leading decimal digits of a version component, tolerating
/// suffixes like "6beta1".
fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// `queryid` (stable statement hash) appeared in 9.4.
const STATEMENT_ID_SINCE: ServerVersion = ServerVersion::new(9, 4);

/// `blks_dirtied` and block I/O timing columns appeared in 9.2.
const DIRTIED_AND_TIMING_SINCE: ServerVersion = ServerVersion::new(9, 2);

/// The set of optional statistic columns available on the connected server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityMatrix {
    /// Server exposes `queryid`; when false, the raw query text is the
    /// statement identity.
    pub has_statement_id: bool,
    /// Server exposes `blks_dirtied`, `blk_read_time` and `blk_write_time`.
    pub has_dirtied_and_timing: bool,
}

impl CapabilityMatrix {
    /// Resolve the matrix for a server version. Never fails; unknown or
    /// future versions resolve to the highest tier.
    pub fn resolve(version: ServerVersion) -> Self {
        Self {
            has_statement_id: version >= STATEMENT_ID_SINCE,
            has_dirtied_and_timing: version >= DIRTIED_AND_TIMING_SINCE,
        }
    }

    /// Whether the server is new enough for `track_io_timing` to matter.
    pub fn supports_io_timing(version: ServerVersion) -> bool {
        version >= DIRTIED_AND_TIMING_SINCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_version() {
        let v = ServerVersion::parse("9.6.24").unwrap();
        assert_eq!(v, ServerVersion::new(9, 6));
    }

    #[test]
    fn test_parse_vendor_suffix() {
        let v = ServerVersion::parse("14.2 (Debian 14.2-1.pgdg110+1)").unwrap();
        assert_eq!(v, ServerVersion::new(14, 2));
    }

    #[test]
    fn test_parse_beta_version() {
        let v = ServerVersion::parse("10beta1").unwrap();
        assert_eq!(v, ServerVersion::new(10, 0));
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(ServerVersion::parse("not a version").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(ServerVersion::new(9, 4) > ServerVersion::new(9, 2));
        assert!(ServerVersion::new(10, 0) > ServerVersion::new(9, 6));
        assert!(ServerVersion::new(9, 2) >= ServerVersion::new(9, 2));
    }

    #[test]
    fn test_resolve_oldest_tier() {
        let m = CapabilityMatrix::resolve(ServerVersion::new(9, 1));
        assert!(!m.has_statement_id);
        assert!(!m.has_dirtied_and_timing);
    }

    #[test]
    fn test_resolve_middle_tier() {
        let m = CapabilityMatrix::resolve(ServerVersion::new(9, 2));
        assert!(!m.has_statement_id);
        assert!(m.has_dirtied_and_timing);

        let m = CapabilityMatrix::resolve(ServerVersion::new(9, 3));
        assert!(!m.has_statement_id);
        assert!(m.has_dirtied_and_timing);
    }

    #[test]
    fn test_resolve_full_tier() {
        let m = CapabilityMatrix::resolve(ServerVersion::new(9, 4));
        assert!(m.has_statement_id);
        assert!(m.has_dirtied_and_timing);
    }

    #[test]
    fn test_future_versions_resolve_to_highest_tier() {
        let m = CapabilityMatrix::resolve(ServerVersion::new(42, 0));
        assert!(m.has_statement_id);
        assert!(m.has_dirtied_and_timing);
    }
}
