//! Typed rows for the entities read from the store.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::{DataError, FromRow, RowRef, Value};

/// Opaque equipment key. Integer ids from the store are kept in text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(pub String);

impl EquipmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Active,
    Inactive,
}

impl EquipmentStatus {
    /// Interprets the loosely typed status column (numeric flag or label).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "a" | "active" | "ativo" | "on" | "online" | "true" => EquipmentStatus::Active,
            _ => EquipmentStatus::Inactive,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Int(v) => {
                if *v != 0 {
                    EquipmentStatus::Active
                } else {
                    EquipmentStatus::Inactive
                }
            }
            Value::Text(s) => Self::parse(s),
            _ => EquipmentStatus::Inactive,
        }
    }
}

/// A speed-enforcement device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: EquipmentStatus,
    /// Regulated speed limit in km/h.
    pub regulated_speed_limit: Option<u32>,
}

impl Equipment {
    /// Equipment can be placed on the map only when both coordinates are non-zero.
    pub fn is_mappable(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

impl FromRow for Equipment {
    fn from_row(row: &RowRef<'_>) -> Result<Self, DataError> {
        let regulated_speed_limit = match row.opt_i64("regulated_speed_limit")? {
            Some(v) => Some(u32::try_from(v).map_err(|_| {
                DataError::decode("regulated_speed_limit", format!("invalid limit {v}"))
            })?),
            None => None,
        };

        Ok(Equipment {
            id: EquipmentId(row.text("id")?),
            name: row.text("name")?,
            address: row.opt_text("address")?,
            latitude: coordinate(row, "latitude")?,
            longitude: coordinate(row, "longitude")?,
            status: EquipmentStatus::from_value(row.get("status")?),
            regulated_speed_limit,
        })
    }
}

// Null coordinates decode as 0.0, which marks the equipment as unmappable.
fn coordinate(row: &RowRef<'_>, column: &str) -> Result<f64, DataError> {
    if row.get(column)?.is_null() {
        return Ok(0.0);
    }
    row.f64(column)
}

/// Number of observations recorded at one speed value (km/h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedRecord {
    pub speed: i32,
    pub count: u64,
}

impl SpeedRecord {
    pub fn new(speed: i32, count: u64) -> Self {
        Self { speed, count }
    }
}

impl FromRow for SpeedRecord {
    fn from_row(row: &RowRef<'_>) -> Result<Self, DataError> {
        let speed = row.i64("speed")?;
        let count = row.i64("observations")?;
        Ok(SpeedRecord {
            speed: i32::try_from(speed)
                .map_err(|_| DataError::decode("speed", format!("speed {speed} out of range")))?,
            count: u64::try_from(count)
                .map_err(|_| DataError::decode("observations", "negative count"))?,
        })
    }
}

/// Vehicle volume seen by one equipment during one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficBucket {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    /// Start of the hour the bucket covers.
    pub hour_start: NaiveDateTime,
    pub vehicle_count: u64,
}

impl TrafficBucket {
    pub fn new(
        equipment_id: EquipmentId,
        equipment_name: impl Into<String>,
        date: NaiveDate,
        hour: u32,
        vehicle_count: u64,
    ) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        Some(Self {
            equipment_id,
            equipment_name: equipment_name.into(),
            hour_start: date.and_time(time),
            vehicle_count,
        })
    }

    pub fn hour_end(&self) -> NaiveDateTime {
        self.hour_start + Duration::hours(1)
    }
}

impl FromRow for TrafficBucket {
    fn from_row(row: &RowRef<'_>) -> Result<Self, DataError> {
        let hour = row.i64("hour")?;
        let count = row.i64("vehicle_count")?;
        let count = u64::try_from(count)
            .map_err(|_| DataError::decode("vehicle_count", "negative vehicle count"))?;
        let hour = u32::try_from(hour)
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| DataError::decode("hour", format!("hour {hour} outside 0..=23")))?;

        TrafficBucket::new(
            EquipmentId(row.text("equipment_id")?),
            row.text("equipment_name")?,
            row.date("date")?,
            hour,
            count,
        )
        .ok_or_else(|| DataError::decode("hour", "invalid hour"))
    }
}

/// Error raised when a date range is not ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("start date {start} must be on or before end date {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start > end {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

/// First and last dates with speed observations for one equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationBounds(pub Option<DateRange>);

impl FromRow for ObservationBounds {
    fn from_row(row: &RowRef<'_>) -> Result<Self, DataError> {
        let first = row.opt_date("first_date")?;
        let last = row.opt_date("last_date")?;
        Ok(match (first, last) {
            (Some(first), Some(last)) => ObservationBounds(DateRange::new(first, last).ok()),
            _ => ObservationBounds(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Table;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn equipment_table(lat: f64, lon: f64) -> Table {
        Table::from_rows(
            &[
                "id",
                "name",
                "address",
                "latitude",
                "longitude",
                "status",
                "regulated_speed_limit",
            ],
            vec![vec![
                Value::Int(12),
                Value::Text("RAD-012".into()),
                Value::Null,
                Value::Float(lat),
                Value::Float(lon),
                Value::Text("Ativo".into()),
                Value::Int(60),
            ]],
        )
    }

    #[test]
    fn test_equipment_decodes_integer_id_and_status() {
        let eq: Vec<Equipment> = equipment_table(-22.37, -41.78).decode().unwrap();
        assert_eq!(eq[0].id, EquipmentId::new("12"));
        assert_eq!(eq[0].status, EquipmentStatus::Active);
        assert_eq!(eq[0].regulated_speed_limit, Some(60));
        assert!(eq[0].is_mappable());
    }

    #[test]
    fn test_zero_coordinate_is_not_mappable() {
        let eq: Vec<Equipment> = equipment_table(0.0, -41.78).decode().unwrap();
        assert!(!eq[0].is_mappable());
        let eq: Vec<Equipment> = equipment_table(-22.37, 0.0).decode().unwrap();
        assert!(!eq[0].is_mappable());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(EquipmentStatus::parse("1"), EquipmentStatus::Active);
        assert_eq!(EquipmentStatus::parse(" ACTIVE "), EquipmentStatus::Active);
        assert_eq!(EquipmentStatus::parse("inativo"), EquipmentStatus::Inactive);
        assert_eq!(EquipmentStatus::parse(""), EquipmentStatus::Inactive);
    }

    #[test]
    fn test_traffic_bucket_rejects_bad_hour() {
        let table = Table::from_rows(
            &["equipment_id", "equipment_name", "date", "hour", "vehicle_count"],
            vec![vec![
                Value::Int(1),
                Value::Text("R1".into()),
                Value::Date(day(2024, 1, 1)),
                Value::Int(24),
                Value::Int(0),
            ]],
        );
        assert!(table.decode::<TrafficBucket>().is_err());
    }

    #[test]
    fn test_traffic_bucket_timestamp() {
        let bucket =
            TrafficBucket::new(EquipmentId::new("1"), "R1", day(2024, 1, 1), 23, 4).unwrap();
        assert_eq!(bucket.hour_start.to_string(), "2024-01-01 23:00:00");
        assert_eq!(bucket.hour_end().to_string(), "2024-01-02 00:00:00");
    }

    #[test]
    fn test_date_range_rejects_reversed_dates() {
        assert!(DateRange::new(day(2024, 2, 1), day(2024, 1, 1)).is_err());
        let range = DateRange::new(day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        assert!(range.contains(day(2024, 1, 1)));
        assert!(!range.contains(day(2024, 1, 2)));
    }

    #[test]
    fn test_bounds_with_no_rows_are_empty() {
        let table = Table::from_rows(
            &["first_date", "last_date"],
            vec![vec![Value::Null, Value::Null]],
        );
        let bounds: Vec<ObservationBounds> = table.decode().unwrap();
        assert_eq!(bounds[0], ObservationBounds(None));
    }
}
