use serde::Serialize;
use std::collections::BTreeMap;

use crate::analytics::utility::{pct, weighted_mean};
use crate::models::SpeedRecord;

/// Histogram edges in km/h. The first bin is closed at 0, every bin is
/// closed on the right: `[0,20], (20,30], ..., (100,200]`.
pub const SPEED_BIN_EDGES: [i32; 10] = [0, 20, 30, 40, 50, 60, 80, 90, 100, 200];

/// Aggregated observations falling in one histogram bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeedBin {
    pub lower: i32,
    pub upper: i32,
    pub label: String,
    pub count: u64,
}

/// Three-way split of observations against the regulated limit and its
/// 10% tolerance margin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceSplit {
    pub regulated_limit: u32,
    pub margin: f64,
    pub within_limit: u64,
    pub within_tolerance: u64,
    pub over_tolerance: u64,
    pub within_limit_pct: f64,
    pub within_tolerance_pct: f64,
    pub over_tolerance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedSummary {
    pub max_speed: Option<i32>,
    pub mode_speed: Option<i32>,
    pub mean_speed: Option<f64>,
    pub total_count: u64,
    pub tolerance: Option<ToleranceSplit>,
    pub histogram: Vec<SpeedBin>,
    /// One record per distinct speed, ascending.
    pub distribution: Vec<SpeedRecord>,
}

/// Where a speed falls relative to the regulated limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compliance {
    WithinLimit,
    WithinTolerance,
    OverTolerance,
}

/// Classifies `speed` against `limit`. The tolerance boundary
/// (`limit + 10%`) is inclusive and compared in integer arithmetic.
pub fn classify(speed: i32, limit: u32) -> Compliance {
    let speed = i64::from(speed);
    let limit = i64::from(limit);
    if speed <= limit {
        Compliance::WithinLimit
    } else if speed * 10 <= limit * 11 {
        Compliance::WithinTolerance
    } else {
        Compliance::OverTolerance
    }
}

/// Index of the histogram bin holding `speed`, if any.
pub fn bin_index(speed: i32) -> Option<usize> {
    let last = SPEED_BIN_EDGES[SPEED_BIN_EDGES.len() - 1];
    if !(SPEED_BIN_EDGES[0]..=last).contains(&speed) {
        return None;
    }
    SPEED_BIN_EDGES
        .windows(2)
        .position(|edge| speed <= edge[1])
}

/// Sums observations into the fixed speed bins. Speeds outside `[0,200]`
/// are dropped.
pub fn histogram(records: &[SpeedRecord]) -> Vec<SpeedBin> {
    let mut bins: Vec<SpeedBin> = SPEED_BIN_EDGES
        .windows(2)
        .map(|edge| SpeedBin {
            lower: edge[0],
            upper: edge[1],
            label: format!("{}-{}", edge[0], edge[1]),
            count: 0,
        })
        .collect();

    for record in records {
        if let Some(idx) = bin_index(record.speed) {
            bins[idx].count += record.count;
        }
    }

    bins
}

/// Splits observations into within-limit, within-tolerance and
/// over-tolerance counts with their share of the total.
pub fn tolerance_split(records: &[SpeedRecord], regulated_limit: u32) -> ToleranceSplit {
    let mut within_limit = 0;
    let mut within_tolerance = 0;
    let mut total = 0;

    for record in records {
        total += record.count;
        match classify(record.speed, regulated_limit) {
            Compliance::WithinLimit => within_limit += record.count,
            Compliance::WithinTolerance => within_tolerance += record.count,
            Compliance::OverTolerance => {}
        }
    }
    let over_tolerance = total - within_limit - within_tolerance;

    ToleranceSplit {
        regulated_limit,
        margin: f64::from(regulated_limit) * 0.10,
        within_limit,
        within_tolerance,
        over_tolerance,
        within_limit_pct: pct(within_limit, total),
        within_tolerance_pct: pct(within_tolerance, total),
        over_tolerance_pct: pct(over_tolerance, total),
    }
}

/// Computes the speed statistics for one equipment and date range.
///
/// Rows sharing a speed value are merged first. Speeds with a zero count do
/// not count as observed, so they never become the max or the mode. Ties for
/// the mode resolve to the smallest speed.
pub fn summarize(records: &[SpeedRecord], regulated_limit: Option<u32>) -> SpeedSummary {
    let mut merged: BTreeMap<i32, u64> = BTreeMap::new();
    for record in records {
        *merged.entry(record.speed).or_default() += record.count;
    }
    let merged: Vec<SpeedRecord> = merged
        .into_iter()
        .map(|(speed, count)| SpeedRecord::new(speed, count))
        .collect();

    let observed = merged.iter().filter(|r| r.count > 0);

    let max_speed = observed.clone().map(|r| r.speed).max();

    // ascending speed order, so a strict comparison keeps the smallest tie
    let mode_speed = observed
        .fold(None::<&SpeedRecord>, |best, r| match best {
            Some(b) if b.count >= r.count => Some(b),
            _ => Some(r),
        })
        .map(|r| r.speed);

    let total_count = merged.iter().map(|r| r.count).sum();
    let mean_speed = weighted_mean(merged.iter().map(|r| (f64::from(r.speed), r.count)));

    SpeedSummary {
        max_speed,
        mode_speed,
        mean_speed,
        total_count,
        tolerance: regulated_limit.map(|limit| tolerance_split(&merged, limit)),
        histogram: histogram(&merged),
        distribution: merged,
    }
}

/// OCR capture rate: observed speed readings as a percentage of the total
/// traffic volume. Zero when no traffic was recorded.
pub fn capture_rate(observed: u64, traffic_volume: u64) -> f64 {
    pct(observed, traffic_volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(i32, u64)]) -> Vec<SpeedRecord> {
        pairs.iter().map(|&(s, c)| SpeedRecord::new(s, c)).collect()
    }

    #[test]
    fn test_mode_ties_pick_smallest_speed() {
        let summary = summarize(&records(&[(50, 10), (60, 10), (55, 3)]), None);
        assert_eq!(summary.mode_speed, Some(50));
        assert_eq!(summary.max_speed, Some(60));
        assert_eq!(summary.total_count, 23);
    }

    #[test]
    fn test_mode_ignores_input_order() {
        let summary = summarize(&records(&[(60, 10), (55, 3), (50, 10)]), None);
        assert_eq!(summary.mode_speed, Some(50));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        assert_eq!(classify(60, 60), Compliance::WithinLimit);
        assert_eq!(classify(66, 60), Compliance::WithinTolerance);
        assert_eq!(classify(67, 60), Compliance::OverTolerance);
        assert_eq!(classify(33, 30), Compliance::WithinTolerance);
        assert_eq!(classify(34, 30), Compliance::OverTolerance);
    }

    #[test]
    fn test_tolerance_split_percentages() {
        let split = tolerance_split(&records(&[(50, 2), (66, 1), (67, 1)]), 60);
        assert_eq!(split.within_limit, 2);
        assert_eq!(split.within_tolerance, 1);
        assert_eq!(split.over_tolerance, 1);
        assert_eq!(split.within_limit_pct, 50.0);
        assert_eq!(split.within_tolerance_pct, 25.0);
        assert_eq!(split.over_tolerance_pct, 25.0);
        assert!((split.margin - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let split = tolerance_split(
            &records(&[(12, 7), (41, 13), (44, 3), (45, 1), (90, 11)]),
            40,
        );
        let sum = split.within_limit_pct + split.within_tolerance_pct + split.over_tolerance_pct;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let summary = summarize(&[], Some(60));
        assert_eq!(summary.max_speed, None);
        assert_eq!(summary.mode_speed, None);
        assert_eq!(summary.mean_speed, None);
        assert_eq!(summary.total_count, 0);
        let split = summary.tolerance.unwrap();
        assert_eq!(split.within_limit_pct, 0.0);
        assert_eq!(split.within_tolerance_pct, 0.0);
        assert_eq!(split.over_tolerance_pct, 0.0);
        assert!(summary.histogram.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_mean_is_count_weighted() {
        let summary = summarize(&records(&[(40, 1), (60, 3)]), None);
        assert_eq!(summary.mean_speed, Some(55.0));
    }

    #[test]
    fn test_histogram_bins_are_right_inclusive() {
        assert_eq!(bin_index(0), Some(0));
        assert_eq!(bin_index(20), Some(0));
        assert_eq!(bin_index(21), Some(1));
        assert_eq!(bin_index(60), Some(4));
        assert_eq!(bin_index(61), Some(5));
        assert_eq!(bin_index(200), Some(8));
        assert_eq!(bin_index(201), None);
        assert_eq!(bin_index(-1), None);
    }

    #[test]
    fn test_histogram_drops_out_of_range_speeds() {
        let input = records(&[(-5, 2), (15, 4), (75, 6), (150, 1), (250, 9)]);
        let summary = summarize(&input, None);
        let binned: u64 = summary.histogram.iter().map(|b| b.count).sum();
        assert_eq!(binned, summary.total_count - 2 - 9);
        assert_eq!(summary.histogram.len(), 9);
        assert_eq!(summary.histogram[5].label, "60-80");
        assert_eq!(summary.histogram[5].count, 6);
    }

    #[test]
    fn test_duplicate_speed_rows_are_merged() {
        let summary = summarize(&records(&[(50, 4), (70, 5), (50, 4)]), None);
        assert_eq!(summary.mode_speed, Some(50));
        assert_eq!(summary.total_count, 13);
        assert_eq!(
            summary.distribution,
            vec![SpeedRecord::new(50, 8), SpeedRecord::new(70, 5)]
        );
    }

    #[test]
    fn test_zero_count_rows_are_not_observed() {
        let summary = summarize(&records(&[(50, 3), (120, 0)]), None);
        assert_eq!(summary.max_speed, Some(50));
    }

    #[test]
    fn test_capture_rate_guards_zero_volume() {
        assert_eq!(capture_rate(10, 0), 0.0);
        assert_eq!(capture_rate(25, 100), 25.0);
    }
}
