use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{EquipmentId, TrafficBucket};

/// Shortest zero-traffic run, in hours, that counts as inoperability.
pub const MIN_INOPERATIVE_HOURS: u32 = 25;

/// A maximal run of consecutive zero-volume hours for one equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InoperabilityInterval {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    /// Start of the first zero-volume hour.
    pub start: NaiveDateTime,
    /// Start of the last zero-volume hour.
    pub end: NaiveDateTime,
    pub hours: u32,
}

/// Total qualifying inoperative hours for one equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentDowntime {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    pub total_inoperative_hours: u32,
}

/// Finds every zero-volume run, regardless of length.
///
/// Buckets are grouped per equipment and ordered by timestamp. A run only
/// continues when the next bucket starts exactly one hour after the previous
/// one; a missing hour ends it. Output is ordered by equipment name, then id,
/// then run start.
pub fn detect_runs(buckets: &[TrafficBucket]) -> Vec<InoperabilityInterval> {
    let mut per_equipment: HashMap<&EquipmentId, Vec<&TrafficBucket>> = HashMap::new();
    for bucket in buckets {
        per_equipment
            .entry(&bucket.equipment_id)
            .or_default()
            .push(bucket);
    }

    let mut runs = Vec::new();
    for series in per_equipment.values_mut() {
        series.sort_by_key(|b| b.hour_start);
        runs.extend(zero_runs(series));
    }

    runs.sort_by(|a, b| {
        a.equipment_name
            .cmp(&b.equipment_name)
            .then_with(|| a.equipment_id.cmp(&b.equipment_id))
            .then_with(|| a.start.cmp(&b.start))
    });
    runs
}

fn zero_runs(series: &[&TrafficBucket]) -> Vec<InoperabilityInterval> {
    let mut runs = Vec::new();
    let mut current: Option<InoperabilityInterval> = None;

    for bucket in series {
        if bucket.vehicle_count != 0 {
            runs.extend(current.take());
            continue;
        }

        match current.as_mut() {
            Some(run) if bucket.hour_start == run.end + Duration::hours(1) => {
                run.end = bucket.hour_start;
                run.hours += 1;
            }
            _ => {
                runs.extend(current.take());
                current = Some(InoperabilityInterval {
                    equipment_id: bucket.equipment_id.clone(),
                    equipment_name: bucket.equipment_name.clone(),
                    start: bucket.hour_start,
                    end: bucket.hour_start,
                    hours: 1,
                });
            }
        }
    }

    runs.extend(current);
    runs
}

/// Zero-volume runs lasting at least [`MIN_INOPERATIVE_HOURS`].
pub fn inoperability_intervals(buckets: &[TrafficBucket]) -> Vec<InoperabilityInterval> {
    detect_runs(buckets)
        .into_iter()
        .filter(|run| run.hours >= MIN_INOPERATIVE_HOURS)
        .collect()
}

/// Sums the qualifying runs per equipment, sorted by equipment name.
///
/// Only runs that reach [`MIN_INOPERATIVE_HOURS`] on their own are summed;
/// shorter runs never add up to a qualifying total.
pub fn inoperability_report(buckets: &[TrafficBucket]) -> Vec<EquipmentDowntime> {
    let mut report: Vec<EquipmentDowntime> = Vec::new();

    // intervals arrive grouped by equipment, so consecutive merging is enough
    for interval in inoperability_intervals(buckets) {
        match report.last_mut() {
            Some(last) if last.equipment_id == interval.equipment_id => {
                last.total_inoperative_hours += interval.hours;
            }
            _ => report.push(EquipmentDowntime {
                equipment_id: interval.equipment_id,
                equipment_name: interval.equipment_name,
                total_inoperative_hours: interval.hours,
            }),
        }
    }

    report
}
