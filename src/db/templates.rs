//! Read-only query templates.
//!
//! Placeholders use the `:name` form understood by [`Query`](super::Query).
//! Numeric columns and aggregates are cast to `SIGNED`/`DOUBLE` so no decimal
//! decoding is needed.

/// Radar equipment on the monitored lane with known coordinates.
pub const EQUIPMENT: &str = "
SELECT
    id,
    name,
    address,
    CAST(latitude AS DOUBLE) AS latitude,
    CAST(longitude AS DOUBLE) AS longitude,
    status,
    CAST(regulated_speed_limit AS SIGNED) AS regulated_speed_limit
FROM equipment
WHERE equipment_type = 'radar'
  AND monitored_lane = 'A'
  AND latitude IS NOT NULL
  AND longitude IS NOT NULL
ORDER BY name, monitored_lane
";

/// Observation count per speed value for one equipment and date range.
pub const SPEED_DISTRIBUTION: &str = "
SELECT
    CAST(speed AS SIGNED) AS speed,
    COUNT(*) AS observations
FROM speed_observations
WHERE equipment_id = :equipment_id
  AND date BETWEEN :start_date AND :end_date
GROUP BY speed
ORDER BY speed
";

/// Total vehicle volume for one equipment and date range.
pub const TRAFFIC_VOLUME: &str = "
SELECT
    CAST(COALESCE(SUM(vehicle_count), 0) AS SIGNED) AS total_volume
FROM traffic_volume
WHERE equipment_id = :equipment_id
  AND date BETWEEN :start_date AND :end_date
";

/// First and last observation date for one equipment.
pub const OBSERVATION_BOUNDS: &str = "
SELECT
    MIN(date) AS first_date,
    MAX(date) AS last_date
FROM speed_observations
WHERE equipment_id = :equipment_id
";

/// Hourly traffic volume for every equipment in a date range.
pub const HOURLY_TRAFFIC: &str = "
SELECT
    eq.id AS equipment_id,
    eq.name AS equipment_name,
    tv.date AS date,
    tv.hour AS hour,
    CAST(SUM(tv.vehicle_count) AS SIGNED) AS vehicle_count
FROM traffic_volume tv
JOIN equipment eq ON tv.equipment_id = eq.id
WHERE tv.date BETWEEN :start_date AND :end_date
GROUP BY eq.id, eq.name, tv.date, tv.hour
ORDER BY eq.name, tv.date, tv.hour
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Query;
    use chrono::NaiveDate;

    #[test]
    fn test_templates_bind_without_leftover_placeholders() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        for template in [SPEED_DISTRIBUTION, TRAFFIC_VOLUME, OBSERVATION_BOUNDS, HOURLY_TRAFFIC] {
            let query = Query::new(template)
                .bind("equipment_id", "1")
                .bind("start_date", day)
                .bind("end_date", day);
            let (sql, _) = query.bind_positional().unwrap();
            assert!(!sql.contains(':'), "unbound placeholder in {sql}");
        }
    }

    #[test]
    fn test_equipment_query_has_no_params() {
        let (sql, params) = Query::new(EQUIPMENT).bind_positional().unwrap();
        assert!(params.is_empty());
        assert!(sql.contains("'radar'"));
    }

    #[test]
    fn test_numeric_columns_are_cast() {
        assert!(EQUIPMENT.contains("CAST(latitude AS DOUBLE)"));
        assert!(EQUIPMENT.contains("CAST(regulated_speed_limit AS SIGNED)"));
        assert!(SPEED_DISTRIBUTION.contains("CAST(speed AS SIGNED) AS speed"));
        assert!(TRAFFIC_VOLUME.contains("AS SIGNED) AS total_volume"));
        assert!(HOURLY_TRAFFIC.contains("AS SIGNED) AS vehicle_count"));
    }
}
