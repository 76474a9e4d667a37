use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

use super::RadarStore;
use crate::db::DataError;
use crate::models::{
    DateRange, Equipment, EquipmentId, EquipmentStatus, SpeedRecord, TrafficBucket,
};

/// One raw speed reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeedObservation {
    pub equipment_id: EquipmentId,
    pub date: NaiveDate,
    pub speed: i32,
}

/// Vehicle count reported by one equipment for one hour of one day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrafficVolume {
    pub equipment_id: EquipmentId,
    pub date: NaiveDate,
    pub hour: u32,
    pub vehicle_count: u64,
}

/// Row layout of `equipment.csv`.
#[derive(Debug, Deserialize)]
struct EquipmentRecord {
    id: EquipmentId,
    name: String,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    regulated_speed_limit: Option<u32>,
}

impl From<EquipmentRecord> for Equipment {
    fn from(r: EquipmentRecord) -> Self {
        Equipment {
            id: r.id,
            name: r.name,
            address: r.address.filter(|a| !a.is_empty()),
            latitude: r.latitude.unwrap_or(0.0),
            longitude: r.longitude.unwrap_or(0.0),
            status: EquipmentStatus::parse(&r.status),
            regulated_speed_limit: r.regulated_speed_limit,
        }
    }
}

/// [`RadarStore`] over rows held in memory.
#[derive(Debug, Default, Clone)]
pub struct LocalStore {
    equipment: Vec<Equipment>,
    observations: Vec<SpeedObservation>,
    traffic: Vec<TrafficVolume>,
}

impl LocalStore {
    pub fn new(
        mut equipment: Vec<Equipment>,
        observations: Vec<SpeedObservation>,
        traffic: Vec<TrafficVolume>,
    ) -> Self {
        equipment.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            equipment,
            observations,
            traffic,
        }
    }

    /// Loads `equipment.csv`, `speed_observations.csv` and
    /// `traffic_volume.csv` from `dir`. Missing observation or traffic files
    /// are treated as empty.
    pub fn load_csv_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let equipment: Vec<EquipmentRecord> = read_csv(&dir.join("equipment.csv"))?
            .context("equipment.csv is required")?;
        let observations: Vec<SpeedObservation> =
            read_csv(&dir.join("speed_observations.csv"))?.unwrap_or_default();
        let traffic: Vec<TrafficVolume> =
            read_csv(&dir.join("traffic_volume.csv"))?.unwrap_or_default();

        info!(
            dir = %dir.display(),
            equipment = equipment.len(),
            observations = observations.len(),
            traffic_rows = traffic.len(),
            "Loaded local data"
        );

        Ok(Self::new(
            equipment.into_iter().map(Equipment::from).collect(),
            observations,
            traffic,
        ))
    }
}

fn read_csv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("parsing {}", path.display()))?;
        rows.push(record);
    }

    Ok(Some(rows))
}

#[async_trait]
impl RadarStore for LocalStore {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, DataError> {
        Ok(self.equipment.clone())
    }

    async fn speed_distribution(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<Vec<SpeedRecord>, DataError> {
        let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
        for obs in &self.observations {
            if &obs.equipment_id == equipment && range.contains(obs.date) {
                *counts.entry(obs.speed).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(speed, count)| SpeedRecord::new(speed, count))
            .collect())
    }

    async fn traffic_volume(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<u64, DataError> {
        Ok(self
            .traffic
            .iter()
            .filter(|t| &t.equipment_id == equipment && range.contains(t.date))
            .map(|t| t.vehicle_count)
            .sum())
    }

    async fn observation_bounds(
        &self,
        equipment: &EquipmentId,
    ) -> Result<Option<DateRange>, DataError> {
        let dates = self
            .observations
            .iter()
            .filter(|o| &o.equipment_id == equipment)
            .map(|o| o.date);
        let first = dates.clone().min();
        let last = dates.max();
        Ok(match (first, last) {
            (Some(first), Some(last)) => DateRange::new(first, last).ok(),
            _ => None,
        })
    }

    async fn hourly_traffic(&self, range: DateRange) -> Result<Vec<TrafficBucket>, DataError> {
        let names: BTreeMap<&EquipmentId, &str> = self
            .equipment
            .iter()
            .map(|e| (&e.id, e.name.as_str()))
            .collect();

        let mut hourly: BTreeMap<(&str, &EquipmentId, NaiveDate, u32), u64> = BTreeMap::new();
        for row in &self.traffic {
            if !range.contains(row.date) {
                continue;
            }
            // inner join: traffic for unknown equipment is ignored
            let Some(name) = names.get(&row.equipment_id) else {
                continue;
            };
            *hourly
                .entry((*name, &row.equipment_id, row.date, row.hour))
                .or_default() += row.vehicle_count;
        }

        hourly
            .into_iter()
            .map(|((name, id, date, hour), count)| {
                TrafficBucket::new(id.clone(), name, date, hour, count)
                    .ok_or_else(|| DataError::decode("hour", format!("hour {hour} outside 0..=23")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn march() -> DateRange {
        DateRange::new(day(1), day(31)).unwrap()
    }

    fn radar(id: &str, name: &str) -> Equipment {
        Equipment {
            id: EquipmentId::new(id),
            name: name.to_string(),
            address: None,
            latitude: -22.37,
            longitude: -41.78,
            status: EquipmentStatus::Active,
            regulated_speed_limit: Some(60),
        }
    }

    fn obs(id: &str, d: u32, speed: i32) -> SpeedObservation {
        SpeedObservation {
            equipment_id: EquipmentId::new(id),
            date: day(d),
            speed,
        }
    }

    #[tokio::test]
    async fn test_speed_distribution_groups_by_speed_within_range() {
        let store = LocalStore::new(
            vec![radar("1", "R1")],
            vec![obs("1", 1, 50), obs("1", 2, 50), obs("1", 2, 42), obs("2", 2, 50)],
            vec![],
        );
        let range = DateRange::new(day(2), day(2)).unwrap();
        let records = store
            .speed_distribution(&EquipmentId::new("1"), range)
            .await
            .unwrap();
        assert_eq!(records, vec![SpeedRecord::new(42, 1), SpeedRecord::new(50, 1)]);
    }

    #[tokio::test]
    async fn test_observation_bounds() {
        let store = LocalStore::new(vec![], vec![obs("1", 9, 50), obs("1", 3, 40)], vec![]);
        let bounds = store.observation_bounds(&EquipmentId::new("1")).await.unwrap();
        assert_eq!(bounds, Some(DateRange::new(day(3), day(9)).unwrap()));
        assert_eq!(store.observation_bounds(&EquipmentId::new("2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hourly_traffic_sums_and_orders_by_name() {
        let traffic = vec![
            TrafficVolume {
                equipment_id: EquipmentId::new("2"),
                date: day(1),
                hour: 0,
                vehicle_count: 3,
            },
            TrafficVolume {
                equipment_id: EquipmentId::new("1"),
                date: day(1),
                hour: 1,
                vehicle_count: 4,
            },
            TrafficVolume {
                equipment_id: EquipmentId::new("1"),
                date: day(1),
                hour: 1,
                vehicle_count: 5,
            },
            TrafficVolume {
                equipment_id: EquipmentId::new("9"),
                date: day(1),
                hour: 1,
                vehicle_count: 5,
            },
        ];
        let store = LocalStore::new(vec![radar("2", "B"), radar("1", "A")], vec![], traffic);

        let buckets = store.hourly_traffic(march()).await.unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].equipment_name, "A");
        assert_eq!(buckets[0].vehicle_count, 9);
        assert_eq!(buckets[1].equipment_name, "B");

        assert_eq!(store.traffic_volume(&EquipmentId::new("1"), march()).await.unwrap(), 9);
    }

    #[test]
    fn test_load_csv_dir() {
        let dir = std::env::temp_dir().join("radar_dashboard_local_store_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("equipment.csv"),
            "id,name,address,latitude,longitude,status,regulated_speed_limit\n\
             10,RAD-10,Av. Central,-22.37,-41.78,ativo,60\n\
             11,RAD-11,,0,0,inativo,\n",
        )
        .unwrap();
        fs::write(
            dir.join("speed_observations.csv"),
            "equipment_id,date,speed\n10,2024-03-01,55\n",
        )
        .unwrap();

        let store = LocalStore::load_csv_dir(&dir).unwrap();
        assert_eq!(store.equipment.len(), 2);
        assert_eq!(store.equipment[0].status, EquipmentStatus::Active);
        assert_eq!(store.equipment[1].regulated_speed_limit, None);
        assert_eq!(store.equipment[1].address, None);
        assert_eq!(store.observations.len(), 1);
        assert!(store.traffic.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_equipment_csv_is_an_error() {
        let dir = std::env::temp_dir().join("radar_dashboard_local_store_missing");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        assert!(LocalStore::load_csv_dir(&dir).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
