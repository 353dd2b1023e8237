//! Delta & rank engine
//!
//! In-memory implementation of the semantics the diff query encodes in SQL:
//! join the after-capture to the before-capture on the grouping key,
//! subtract every counter, drop statements with no new calls, rank by
//! blocks read, and cap at top-N. Having the algorithm here keeps the
//! ranking behavior testable without a live server.

use crate::snapshot::query::{DEFAULT_TOP, QUERY_DISPLAY_WIDTH, SNAP_TAG};
use std::collections::HashMap;
use std::ops::Sub;

/// Cumulative execution counters for one statement.
///
/// Counters the server does not expose for the connected version stay at
/// their zero default; the capability matrix gates only which columns the
/// SQL touches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub calls: i64,
    pub total_time_ms: f64,
    pub rows: i64,
    pub blocks_hit: i64,
    pub blocks_read: i64,
    pub blocks_dirtied: i64,
    pub blocks_written: i64,
    pub block_read_time_ms: f64,
    pub block_write_time_ms: f64,
}

impl Sub for Counters {
    type Output = Counters;

    fn sub(self, rhs: Counters) -> Counters {
        Counters {
            calls: self.calls - rhs.calls,
            total_time_ms: self.total_time_ms - rhs.total_time_ms,
            rows: self.rows - rhs.rows,
            blocks_hit: self.blocks_hit - rhs.blocks_hit,
            blocks_read: self.blocks_read - rhs.blocks_read,
            blocks_dirtied: self.blocks_dirtied - rhs.blocks_dirtied,
            blocks_written: self.blocks_written - rhs.blocks_written,
            block_read_time_ms: self.block_read_time_ms - rhs.block_read_time_ms,
            block_write_time_ms: self.block_write_time_ms - rhs.block_write_time_ms,
        }
    }
}

/// One aggregated record per distinct (user, database, statement identity)
/// at a point in time. The source pre-aggregates, so the grouping key is
/// unique within a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementSnapshotRow {
    pub user_id: u32,
    pub database_id: u32,
    /// Stable statement hash when the server exposes one; otherwise the
    /// query text alone is the identity.
    pub statement_id: Option<i64>,
    pub query_text: String,
    pub counters: Counters,
}

impl StatementSnapshotRow {
    fn key(&self) -> (u32, u32, Option<i64>, &str) {
        (
            self.user_id,
            self.database_id,
            self.statement_id,
            self.query_text.as_str(),
        )
    }
}

/// Per-key counter difference over the sampling window. Derived, never
/// persisted; lives only within one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub user_id: u32,
    pub database_id: u32,
    pub statement_id: Option<i64>,
    /// Truncated for display at this final stage, never during aggregation.
    pub query_text: String,
    pub counters: Counters,
}

/// Statements the tool issues for its own bookkeeping are excluded from the
/// ranking so the sampler never measures itself.
fn is_bookkeeping(query_text: &str) -> bool {
    query_text.starts_with("--") || query_text.starts_with(&format!("{SNAP_TAG} "))
}

fn truncate_for_display(text: &str) -> String {
    text.chars().take(QUERY_DISPLAY_WIDTH).collect()
}

/// The engine comparing two statement snapshots.
pub struct DeltaEngine;

impl DeltaEngine {
    /// Compute ranked deltas between two snapshots.
    ///
    /// For every key in `after`, before-values default to zero when the key
    /// is absent from `before` (a newly-appeared statement). Keys with no
    /// new calls are dropped, which also excludes negative deltas from a
    /// mid-window statistics reset. The result is sorted descending by the
    /// blocks-read delta (stable on ties) and capped at `top_n`
    /// (10000 when unset).
    pub fn diff(
        before: &[StatementSnapshotRow],
        after: &[StatementSnapshotRow],
        top_n: Option<u32>,
    ) -> Vec<DeltaRow> {
        let before_map: HashMap<_, &Counters> =
            before.iter().map(|r| (r.key(), &r.counters)).collect();

        let mut deltas: Vec<DeltaRow> = after
            .iter()
            .map(|row| {
                let prior = before_map
                    .get(&row.key())
                    .copied()
                    .copied()
                    .unwrap_or_default();
                DeltaRow {
                    user_id: row.user_id,
                    database_id: row.database_id,
                    statement_id: row.statement_id,
                    query_text: truncate_for_display(&row.query_text),
                    counters: row.counters - prior,
                }
            })
            .filter(|d| d.counters.calls > 0 && !is_bookkeeping(&d.query_text))
            .collect();

        // Vec::sort_by is stable, so ties keep their input order.
        deltas.sort_by(|a, b| b.counters.blocks_read.cmp(&a.counters.blocks_read));
        deltas.truncate(top_n.unwrap_or(DEFAULT_TOP) as usize);
        deltas
    }
}
