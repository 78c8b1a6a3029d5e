// Auxiliary per-component metrics: size and line coverage.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::HarvestSection;
use crate::source::RemoteSource;
use crate::types::{ComponentStats, Metric, MetricQuery, MetricRow};

/// Runs the aggregate queries in parallel and merges them per id.
#[derive(Debug)]
pub struct StatsCollector<'a> {
    source: &'a dyn RemoteSource,
    call_timeout: Duration,
}

#[derive(Debug, Default)]
struct Accumulator {
    size: Option<i64>,
    covered: i64,
    uncovered: i64,
    has_lines: bool,
}

impl<'a> StatsCollector<'a> {
    pub fn new(source: &'a dyn RemoteSource) -> Self {
        Self {
            source,
            call_timeout: Duration::from_secs(HarvestSection::default().call_timeout_secs),
        }
    }

    /// Deadline for each aggregate query. A query that misses it contributes nothing.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// One record per id seen by any query. A failed query contributes nothing.
    pub async fn fetch(&self) -> Vec<ComponentStats> {
        let (class_sizes, trigger_sizes, coverage) = tokio::join!(
            self.run(MetricQuery::ClassSize),
            self.run(MetricQuery::TriggerSize),
            self.run(MetricQuery::Coverage),
        );
        let merged = merge_metrics(class_sizes.into_iter().chain(trigger_sizes).chain(coverage));
        info!(components = merged.len(), "Stats collected");
        merged
    }

    async fn run(&self, query: MetricQuery) -> Vec<MetricRow> {
        match tokio::time::timeout(self.call_timeout, self.source.aggregate(query)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                warn!(query = %query, error = %e, "Aggregate query failed, skipping");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    query = %query,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Aggregate query timed out, skipping"
                );
                Vec::new()
            }
        }
    }
}

/// Fold metric rows into one stats record per id.
///
/// Sizes: the last non-null value wins. Lines: summed across rows, then
/// turned into a 0-100 percentage when there is anything to cover. Rows with
/// negative counts, or whose counts would overflow the running sum, are
/// malformed and skipped without touching the rest of the id's record.
pub fn merge_metrics(rows: impl IntoIterator<Item = MetricRow>) -> Vec<ComponentStats> {
    let mut by_id: BTreeMap<String, Accumulator> = BTreeMap::new();
    for row in rows {
        if row.id.is_empty() {
            continue;
        }
        match row.metric {
            Metric::Size(size) => by_id.entry(row.id).or_default().size = Some(size),
            Metric::Lines { covered, uncovered } => {
                if covered < 0 || uncovered < 0 {
                    warn!(id = %row.id, covered, uncovered, "Negative line counts, skipping row");
                    continue;
                }
                let acc = by_id.entry(row.id).or_default();
                match (
                    acc.covered.checked_add(covered),
                    acc.uncovered.checked_add(uncovered),
                ) {
                    (Some(c), Some(u)) => {
                        acc.covered = c;
                        acc.uncovered = u;
                        acc.has_lines = true;
                    }
                    _ => warn!(covered, uncovered, "Line counts overflow, skipping row"),
                }
            }
        }
    }

    by_id
        .into_iter()
        .map(|(id, acc)| ComponentStats {
            id,
            size: acc.size,
            coverage: if acc.has_lines {
                coverage_percent(acc.covered, acc.uncovered)
            } else {
                None
            },
        })
        .collect()
}

/// `round(covered / (covered + uncovered) * 100)`.
///
/// `None` with nothing to cover, with a negative count, or when the total
/// does not fit in an `i64`.
pub fn coverage_percent(covered: i64, uncovered: i64) -> Option<i64> {
    if covered < 0 || uncovered < 0 {
        return None;
    }
    let total = covered.checked_add(uncovered)?;
    if total == 0 {
        return None;
    }
    Some((covered as f64 / total as f64 * 100.0).round() as i64)
}
