//! Dashboard analytics over the whole record set

use crate::export::coordinates::lat_lon;
use fibertrack_common::db::models::FaultRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Root causes listed on the dashboard
pub const TOP_ROOT_CAUSES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaStats {
    pub total: usize,
    pub breached: usize,
    pub breached_percentage: f64,
}

/// Unknown answers count as unsolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionStats {
    pub solved: usize,
    pub unsolved: usize,
    pub solution_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateStats {
    pub with_coordinates: usize,
    pub without_coordinates: usize,
    pub coverage_percentage: f64,
}

/// Fault durations in hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub samples: usize,
    pub avg_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
    pub median_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub region_distribution: Vec<CountEntry>,
    pub top_root_causes: Vec<CountEntry>,
    pub sla: SlaStats,
    pub solutions: SolutionStats,
    pub coordinates: CoordinateStats,
    /// `None` until some record has both timestamps
    pub duration: Option<DurationStats>,
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Counts per value, largest first, ties by name. Blank values are ignored.
fn distribution<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(value).or_default() += 1;
    }

    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(name, count)| CountEntry {
            name: name.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

fn duration_stats(records: &[FaultRecord]) -> Option<DurationStats> {
    let mut hours: Vec<f64> = records
        .iter()
        .filter_map(|r| {
            let (start, end) = (r.fields.start_time?, r.fields.end_time?);
            (end >= start).then(|| (end - start).num_seconds() as f64 / 3600.0)
        })
        .collect();

    if hours.is_empty() {
        return None;
    }
    hours.sort_by(|a, b| a.total_cmp(b));

    let n = hours.len();
    let median = if n % 2 == 1 {
        hours[n / 2]
    } else {
        (hours[n / 2 - 1] + hours[n / 2]) / 2.0
    };

    Some(DurationStats {
        samples: n,
        avg_hours: hours.iter().sum::<f64>() / n as f64,
        min_hours: hours[0],
        max_hours: hours[n - 1],
        median_hours: median,
    })
}

pub fn analyze(records: &[FaultRecord]) -> Analytics {
    let total = records.len();

    let breached = records
        .iter()
        .filter(|r| r.fields.sla_breached == Some(true))
        .count();
    let solved = records
        .iter()
        .filter(|r| r.fields.permanent_solution == Some(true))
        .count();
    let with_coordinates = records.iter().filter(|r| lat_lon(r).is_some()).count();

    let mut top_root_causes = distribution(
        records
            .iter()
            .filter_map(|r| r.fields.root_cause.as_deref()),
    );
    top_root_causes.truncate(TOP_ROOT_CAUSES);

    Analytics {
        region_distribution: distribution(records.iter().map(|r| r.fields.region.as_str())),
        top_root_causes,
        sla: SlaStats {
            total,
            breached,
            breached_percentage: percentage(breached, total),
        },
        solutions: SolutionStats {
            solved,
            unsolved: total - solved,
            solution_rate: percentage(solved, total),
        },
        coordinates: CoordinateStats {
            with_coordinates,
            without_coordinates: total - with_coordinates,
            coverage_percentage: percentage(with_coordinates, total),
        },
        duration: duration_stats(records),
    }
}
