//! Typed access to equipment, speed and traffic data.
//!
//! [`RadarStore`] is what the dashboard talks to. [`SqlStore`] answers it
//! with the query templates over any [`Executor`]; [`LocalStore`] answers it
//! from rows held in memory, typically loaded from CSV files.

mod local;

pub use local::{LocalStore, SpeedObservation, TrafficVolume};

use async_trait::async_trait;
use tracing::debug;

use crate::db::{DataError, Executor, Query, templates};
use crate::models::{
    DateRange, Equipment, EquipmentId, ObservationBounds, SpeedRecord, TrafficBucket,
};

#[async_trait]
pub trait RadarStore: Send + Sync {
    /// Radar equipment, ordered by name.
    async fn list_equipment(&self) -> Result<Vec<Equipment>, DataError>;

    /// Observation count per speed value, ordered by speed.
    async fn speed_distribution(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<Vec<SpeedRecord>, DataError>;

    /// Total vehicle volume for one equipment.
    async fn traffic_volume(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<u64, DataError>;

    /// First and last observation dates, or `None` without observations.
    async fn observation_bounds(
        &self,
        equipment: &EquipmentId,
    ) -> Result<Option<DateRange>, DataError>;

    /// Hourly volume buckets for every equipment in the range.
    async fn hourly_traffic(&self, range: DateRange) -> Result<Vec<TrafficBucket>, DataError>;
}

/// [`RadarStore`] that runs the SQL templates through an [`Executor`].
pub struct SqlStore<E> {
    executor: E,
}

impl<E: Executor> SqlStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

fn ranged(template: &'static str, range: DateRange) -> Query {
    Query::new(template)
        .bind("start_date", range.start())
        .bind("end_date", range.end())
}

#[async_trait]
impl<E: Executor> RadarStore for SqlStore<E> {
    #[tracing::instrument(skip_all)]
    async fn list_equipment(&self) -> Result<Vec<Equipment>, DataError> {
        let table = self.executor.execute(&Query::new(templates::EQUIPMENT)).await?;
        let equipment: Vec<Equipment> = table.decode()?;
        debug!(count = equipment.len(), "Equipment loaded");
        Ok(equipment)
    }

    #[tracing::instrument(skip_all, fields(equipment = %equipment, range = %range))]
    async fn speed_distribution(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<Vec<SpeedRecord>, DataError> {
        let query = ranged(templates::SPEED_DISTRIBUTION, range)
            .bind("equipment_id", equipment.as_str());
        self.executor.execute(&query).await?.decode()
    }

    #[tracing::instrument(skip_all, fields(equipment = %equipment, range = %range))]
    async fn traffic_volume(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<u64, DataError> {
        let query = ranged(templates::TRAFFIC_VOLUME, range)
            .bind("equipment_id", equipment.as_str());
        let table = self.executor.execute(&query).await?;
        let Some(row) = table.rows().next() else {
            return Ok(0);
        };
        let total = row.opt_i64("total_volume")?.unwrap_or(0);
        u64::try_from(total).map_err(|_| DataError::decode("total_volume", "negative volume"))
    }

    #[tracing::instrument(skip_all, fields(equipment = %equipment))]
    async fn observation_bounds(
        &self,
        equipment: &EquipmentId,
    ) -> Result<Option<DateRange>, DataError> {
        let query = Query::new(templates::OBSERVATION_BOUNDS)
            .bind("equipment_id", equipment.as_str());
        let bounds: Vec<ObservationBounds> = self.executor.execute(&query).await?.decode()?;
        Ok(bounds.into_iter().next().and_then(|b| b.0))
    }

    #[tracing::instrument(skip_all, fields(range = %range))]
    async fn hourly_traffic(&self, range: DateRange) -> Result<Vec<TrafficBucket>, DataError> {
        let buckets: Vec<TrafficBucket> = self
            .executor
            .execute(&ranged(templates::HOURLY_TRAFFIC, range))
            .await?
            .decode()?;
        debug!(buckets = buckets.len(), "Hourly traffic loaded");
        Ok(buckets)
    }
}

#[async_trait]
impl<S: RadarStore + ?Sized> RadarStore for Box<S> {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, DataError> {
        (**self).list_equipment().await
    }

    async fn speed_distribution(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<Vec<SpeedRecord>, DataError> {
        (**self).speed_distribution(equipment, range).await
    }

    async fn traffic_volume(
        &self,
        equipment: &EquipmentId,
        range: DateRange,
    ) -> Result<u64, DataError> {
        (**self).traffic_volume(equipment, range).await
    }

    async fn observation_bounds(
        &self,
        equipment: &EquipmentId,
    ) -> Result<Option<DateRange>, DataError> {
        (**self).observation_bounds(equipment).await
    }

    async fn hourly_traffic(&self, range: DateRange) -> Result<Vec<TrafficBucket>, DataError> {
        (**self).hourly_traffic(range).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Param, Table, Value};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Returns a canned table per template and records the queries it saw.
    struct ScriptedExecutor {
        responses: Vec<(&'static str, Result<Table, DataError>)>,
        seen: Mutex<Vec<Query>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<(&'static str, Result<Table, DataError>)>) -> Self {
            Self {
                responses,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(&self, query: &Query) -> Result<Table, DataError> {
            self.seen.lock().unwrap().push(query.clone());
            match self.responses.iter().find(|(t, _)| *t == query.template()) {
                Some((_, Ok(table))) => Ok(table.clone()),
                Some((_, Err(DataError::Connection(m)))) => Err(DataError::Connection(m.clone())),
                Some((_, Err(e))) => Err(DataError::Query(e.to_string())),
                None => Ok(Table::default()),
            }
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_speed_distribution_binds_equipment_and_dates() {
        let table = Table::from_rows(
            &["speed", "observations"],
            vec![
                vec![Value::Int(40), Value::Int(3)],
                vec![Value::Int(55), Value::Int(9)],
            ],
        );
        let store = SqlStore::new(ScriptedExecutor::new(vec![(
            templates::SPEED_DISTRIBUTION,
            Ok(table),
        )]));

        let records = store
            .speed_distribution(&EquipmentId::new("7"), january())
            .await
            .unwrap();
        assert_eq!(records, vec![SpeedRecord::new(40, 3), SpeedRecord::new(55, 9)]);

        let seen = store.executor.seen.lock().unwrap();
        assert_eq!(seen[0].param("equipment_id"), Some(&Param::Text("7".into())));
        assert_eq!(seen[0].param("start_date"), Some(&Param::Date(january().start())));
        assert_eq!(seen[0].param("end_date"), Some(&Param::Date(january().end())));
    }

    #[tokio::test]
    async fn test_zero_rows_is_empty_not_error() {
        let store = SqlStore::new(ScriptedExecutor::new(vec![]));
        let records = store
            .speed_distribution(&EquipmentId::new("7"), january())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(store.traffic_volume(&EquipmentId::new("7"), january()).await.unwrap(), 0);
        assert_eq!(store.observation_bounds(&EquipmentId::new("7")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connection_error_propagates() {
        let store = SqlStore::new(ScriptedExecutor::new(vec![(
            templates::EQUIPMENT,
            Err(DataError::Connection("refused".into())),
        )]));
        let err = store.list_equipment().await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_traffic_volume_reads_total() {
        let table = Table::from_rows(&["total_volume"], vec![vec![Value::Int(1200)]]);
        let store = SqlStore::new(ScriptedExecutor::new(vec![(
            templates::TRAFFIC_VOLUME,
            Ok(table),
        )]));
        assert_eq!(
            store.traffic_volume(&EquipmentId::new("7"), january()).await.unwrap(),
            1200
        );
    }

    #[tokio::test]
    async fn test_observation_bounds_decode() {
        let table = Table::from_rows(
            &["first_date", "last_date"],
            vec![vec![
                Value::Date(january().start()),
                Value::Date(january().end()),
            ]],
        );
        let store = SqlStore::new(ScriptedExecutor::new(vec![(
            templates::OBSERVATION_BOUNDS,
            Ok(table),
        )]));
        assert_eq!(
            store.observation_bounds(&EquipmentId::new("7")).await.unwrap(),
            Some(january())
        );
    }
}
