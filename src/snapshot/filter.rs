//! Result post-filter
//!
//! The executor interleaves command tags and informational rows with the
//! actual result table. Only the content from the header row onward is the
//! real table, so everything before it is discarded.

/// First field of the row that starts the real result table.
pub const HEADER_TOKEN: &str = "USER";

/// Drop every row preceding the header row; the header itself is kept.
/// When no header is present at all, nothing survives.
pub fn filter_preamble(raw: Vec<Vec<String>>) -> Vec<Vec<String>> {
    match raw
        .iter()
        .position(|row| row.first().map(String::as_str) == Some(HEADER_TOKEN))
    {
        Some(start) => raw.into_iter().skip(start).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_preamble_is_dropped_header_onward_kept() {
        let input = rows(&[
            &["noise"],
            &["CREATE TABLE AS"],
            &["USER", "DBNAME", "QUERY"],
            &["alice", "appdb", "SELECT 1"],
        ]);
        let expected = rows(&[
            &["USER", "DBNAME", "QUERY"],
            &["alice", "appdb", "SELECT 1"],
        ]);
        assert_eq!(filter_preamble(input), expected);
    }

    #[test]
    fn test_no_preamble_passes_through_unchanged() {
        let input = rows(&[&["USER", "DBNAME"], &["bob", "appdb"]]);
        assert_eq!(filter_preamble(input.clone()), input);
    }

    #[test]
    fn test_missing_header_yields_nothing() {
        let input = rows(&[&["noise"], &["more noise"]]);
        assert!(filter_preamble(input).is_empty());
    }

    #[test]
    fn test_header_match_is_first_field_only() {
        let input = rows(&[&["x", "USER"], &["USER", "DBNAME"], &["carol", "appdb"]]);
        let expected = rows(&[&["USER", "DBNAME"], &["carol", "appdb"]]);
        assert_eq!(filter_preamble(input), expected);
    }
}
