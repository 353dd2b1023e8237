//! SQL construction for the snapshot pipeline
//!
//! All statement text is built here, as pure functions of the capability
//! matrix. Nothing in this module talks to a server, so every shape the
//! builder can emit is testable offline.

use crate::capability::CapabilityMatrix;

/// Bookkeeping tag carried by every statement the tool issues against
/// `pg_stat_statements`, so the diff can exclude the tool's own activity.
pub const SNAP_TAG: &str = "/*SNAP*/";

/// Temp table holding the first capture.
pub const BEFORE_TABLE: &str = "snap_before";

/// Temp table holding the second capture.
pub const AFTER_TABLE: &str = "snap_after";

/// Rows listed when no top-N is requested.
pub const DEFAULT_TOP: u32 = 10000;

/// Query text is truncated to this many characters for display only.
pub const QUERY_DISPLAY_WIDTH: usize = 30;

/// Does the view exist? Expects a count of exactly 1.
pub const CHECK_VIEW_QUERY: &str = "\
SELECT count(*) AS \"pg_stat_statements\"
  FROM pg_class c
       LEFT OUTER JOIN pg_namespace n ON c.relnamespace = n.oid
 WHERE n.nspname = 'public'
   AND c.relname = 'pg_stat_statements'";

/// Is block I/O timing collection enabled? Expects a count of 1 when on.
pub const CHECK_IO_TIMING_QUERY: &str = "\
SELECT count(*) AS \"track_io_timing\"
  FROM pg_settings
 WHERE name = 'track_io_timing'
   AND setting = 'on'";

pub const RESET_QUERY: &str = "SELECT pg_stat_statements_reset()";

/// Column name the reset acknowledgement must carry.
pub const RESET_ACK: &str = "pg_stat_statements_reset";

/// Build the capture statement materializing one aggregated snapshot of
/// `pg_stat_statements` under `target_name`.
///
/// The aggregate groups by the full grouping key (user, database, statement
/// identity) and folds shared/local/temp block counters together the same
/// way for both captures, so the later subtraction is column-for-column.
pub fn build_capture_query(matrix: &CapabilityMatrix, target_name: &str) -> String {
    let queryid_col = if matrix.has_statement_id {
        "queryid,\n           "
    } else {
        ""
    };

    let mut optional_sums = String::new();
    if matrix.has_dirtied_and_timing {
        optional_sums.push_str(
            "sum(shared_blks_dirtied) + sum(local_blks_dirtied) AS blks_dirtied,\n           ",
        );
    }

    let mut timing_sums = String::new();
    if matrix.has_dirtied_and_timing {
        timing_sums.push_str(",\n           sum(blk_read_time) AS blk_read_time");
        timing_sums.push_str(",\n           sum(blk_write_time) AS blk_write_time");
    }

    format!(
        "{SNAP_TAG} CREATE TEMP TABLE {target_name} AS
    SELECT userid,
           dbid,
           {queryid_col}query,
           sum(calls) AS calls,
           sum(total_time) AS total_time,
           sum(rows) AS rows,
           sum(shared_blks_hit) + sum(local_blks_hit) AS blks_hit,
           sum(shared_blks_read) + sum(local_blks_read)
             + sum(temp_blks_read) AS blks_read,
           {optional_sums}sum(shared_blks_written) + sum(local_blks_written)
             + sum(temp_blks_written) AS blks_written{timing_sums}
      FROM pg_stat_statements
     GROUP BY userid, dbid, {queryid_col}query"
    )
}

/// Build the diff-and-rank statement joining the after-capture to the
/// before-capture.
///
/// The join is null-safe: a key present only in the after-capture gets
/// zeroed before-values via coalesce. Statements with no new calls in the
/// window are dropped, which also swallows negative deltas from a
/// mid-window statistics reset. The tool's own tagged statements are
/// excluded so it never measures itself.
pub fn build_diff_query(matrix: &CapabilityMatrix, limit: Option<u32>) -> String {
    let queryid_select = if matrix.has_statement_id {
        format!("to_hex({AFTER_TABLE}.queryid) AS \"QUERYID\",\n       ")
    } else {
        String::new()
    };
    let queryid_join = if matrix.has_statement_id {
        format!("\n           AND {AFTER_TABLE}.queryid = {BEFORE_TABLE}.queryid")
    } else {
        String::new()
    };

    let dirtied_select = if matrix.has_dirtied_and_timing {
        format!(
            "({AFTER_TABLE}.blks_dirtied - coalesce({BEFORE_TABLE}.blks_dirtied, 0)) \
             AS \"B_DIRT\",\n       "
        )
    } else {
        String::new()
    };

    let mut timing_select = String::new();
    if matrix.has_dirtied_and_timing {
        timing_select.push_str(&format!(
            ",\n       round(({AFTER_TABLE}.blk_read_time - \
             coalesce({BEFORE_TABLE}.blk_read_time, 0))::numeric, 1) AS \"R_TIME\""
        ));
        timing_select.push_str(&format!(
            ",\n       round(({AFTER_TABLE}.blk_write_time - \
             coalesce({BEFORE_TABLE}.blk_write_time, 0))::numeric, 1) AS \"W_TIME\""
        ));
    }

    let limit = limit.unwrap_or(DEFAULT_TOP);

    format!(
        "SELECT u.usename AS \"USER\",
       d.datname AS \"DBNAME\",
       {queryid_select}substring({AFTER_TABLE}.query, 1, {QUERY_DISPLAY_WIDTH}) AS \"QUERY\",
       ({AFTER_TABLE}.calls - coalesce({BEFORE_TABLE}.calls, 0)) AS \"CALLS\",
       ({AFTER_TABLE}.total_time - coalesce({BEFORE_TABLE}.total_time, 0))::integer AS \"T_TIME\",
       ({AFTER_TABLE}.rows - coalesce({BEFORE_TABLE}.rows, 0)) AS \"ROWS\",
       ({AFTER_TABLE}.blks_hit - coalesce({BEFORE_TABLE}.blks_hit, 0)) AS \"B_HIT\",
       ({AFTER_TABLE}.blks_read - coalesce({BEFORE_TABLE}.blks_read, 0)) AS \"B_READ\",
       {dirtied_select}({AFTER_TABLE}.blks_written - coalesce({BEFORE_TABLE}.blks_written, 0)) \
AS \"B_WRTN\"{timing_select}
  FROM {AFTER_TABLE}
       LEFT OUTER JOIN {BEFORE_TABLE} ON {AFTER_TABLE}.userid = {BEFORE_TABLE}.userid
           AND {AFTER_TABLE}.dbid = {BEFORE_TABLE}.dbid{queryid_join}
           AND {AFTER_TABLE}.query = {BEFORE_TABLE}.query
       LEFT OUTER JOIN pg_database d ON {AFTER_TABLE}.dbid = d.oid
       LEFT OUTER JOIN pg_user u ON {AFTER_TABLE}.userid = u.usesysid
 WHERE ({AFTER_TABLE}.calls - coalesce({BEFORE_TABLE}.calls, 0)) > 0
   AND {AFTER_TABLE}.query NOT LIKE '--%'
   AND {AFTER_TABLE}.query NOT LIKE '{SNAP_TAG} %'
 ORDER BY \"B_READ\" DESC
 LIMIT {limit}"
    )
}
