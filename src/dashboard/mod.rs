//! One render pass of the dashboard.
//!
//! [`Dashboard::render`] reads the session state, fetches what it needs from
//! the [`RadarStore`] one query at a time, derives the metrics and returns a
//! [`DashboardView`]. Store failures never escape a render: they become
//! banners on the view.

pub mod view;

use tracing::{error, info, warn};

use crate::analytics::inoperability::{inoperability_intervals, inoperability_report};
use crate::analytics::speed::{capture_rate, summarize};
use crate::config::DashboardDefaults;
use crate::models::{DateRange, Equipment, EquipmentId};
use crate::session::SelectionState;
use crate::store::RadarStore;
use view::{
    Banner, DashboardView, DonutSlice, InoperabilityTable, MapMarker, MapView, SpeedBar,
    SpeedPanel, SummaryCards,
};

pub struct Dashboard<S> {
    store: S,
    defaults: DashboardDefaults,
}

impl<S: RadarStore> Dashboard<S> {
    pub fn new(store: S, defaults: DashboardDefaults) -> Self {
        Self { store, defaults }
    }

    /// Renders the dashboard for the current session state.
    ///
    /// Consumes a pending inoperability request; nothing else in `state`
    /// is modified.
    #[tracing::instrument(skip_all)]
    pub async fn render(&self, state: &mut SelectionState) -> DashboardView {
        let mut view = DashboardView::default();

        let equipment = match self.store.list_equipment().await {
            Ok(equipment) => equipment,
            Err(e) => {
                error!(error = %e, "Failed to load equipment");
                view.banners
                    .push(Banner::error(format!("Could not load equipment: {e}")));
                // a failed render still answers the trigger
                state.take_inoperability_request();
                return view;
            }
        };

        let mappable: Vec<&Equipment> = equipment.iter().filter(|e| e.is_mappable()).collect();
        if mappable.is_empty() {
            warn!(total = equipment.len(), "No mappable equipment");
            view.banners.push(Banner::error(
                "No valid equipment with non-zero latitude/longitude found.",
            ));
        } else {
            view.map = Some(build_map(&mappable, state.selected(), self.defaults.zoom));
        }

        match state.selected() {
            None => view
                .banners
                .push(Banner::info("Click a radar on the map to begin.")),
            Some(id) => match equipment.iter().find(|e| &e.id == id) {
                Some(selected) => {
                    view.banners
                        .push(Banner::success(format!("Selected equipment: {}", selected.name)));
                    let range = self.resolve_range(state, selected, &mut view).await;
                    self.render_speed(selected, range, &mut view).await;
                }
                None => view.banners.push(Banner::warning(format!(
                    "Equipment {id} is not in the equipment list."
                ))),
            },
        }

        if state.take_inoperability_request() {
            let range = state.date_range().unwrap_or(self.defaults.date_range);
            self.render_inoperability(range, &mut view).await;
        }

        view
    }

    /// The picked range, else the equipment's observation span, else the
    /// configured default.
    async fn resolve_range(
        &self,
        state: &SelectionState,
        equipment: &Equipment,
        view: &mut DashboardView,
    ) -> DateRange {
        if let Some(range) = state.date_range() {
            return range;
        }

        match self.store.observation_bounds(&equipment.id).await {
            Ok(Some(bounds)) => bounds,
            Ok(None) => self.defaults.date_range,
            Err(e) => {
                warn!(error = %e, "Failed to load observation bounds");
                view.banners.push(Banner::warning(format!(
                    "Could not determine available dates: {e}"
                )));
                self.defaults.date_range
            }
        }
    }

    #[tracing::instrument(skip_all, fields(equipment = %equipment.id, range = %range))]
    async fn render_speed(
        &self,
        equipment: &Equipment,
        range: DateRange,
        view: &mut DashboardView,
    ) {
        let records = match self.store.speed_distribution(&equipment.id, range).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load speed distribution");
                view.banners
                    .push(Banner::error(format!("Could not load speed data: {e}")));
                return;
            }
        };

        if records.is_empty() {
            view.banners.push(Banner::warning(
                "No data found for the selected period and equipment.",
            ));
            return;
        }

        let summary = summarize(&records, equipment.regulated_speed_limit);

        let traffic_volume = match self.store.traffic_volume(&equipment.id, range).await {
            Ok(volume) => volume,
            Err(e) => {
                warn!(error = %e, "Failed to load traffic volume");
                view.banners
                    .push(Banner::warning(format!("Traffic volume unavailable: {e}")));
                0
            }
        };

        info!(
            total = summary.total_count,
            traffic_volume,
            "Speed distribution rendered"
        );

        let tolerance_donut = summary
            .tolerance
            .as_ref()
            .map(|split| {
                vec![
                    DonutSlice {
                        label: format!("Within limit (<= {} km/h)", split.regulated_limit),
                        count: split.within_limit,
                        percent: split.within_limit_pct,
                    },
                    DonutSlice {
                        label: "Within 10% tolerance".to_string(),
                        count: split.within_tolerance,
                        percent: split.within_tolerance_pct,
                    },
                    DonutSlice {
                        label: "Over tolerance".to_string(),
                        count: split.over_tolerance,
                        percent: split.over_tolerance_pct,
                    },
                ]
            })
            .unwrap_or_default();

        view.speed = Some(SpeedPanel {
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            range,
            title: format!("Speed distribution ({range})"),
            cards: SummaryCards {
                max_speed: summary.max_speed,
                mean_speed: summary.mean_speed,
                mode_speed: summary.mode_speed,
                total_count: summary.total_count,
                traffic_volume,
                capture_rate_pct: capture_rate(summary.total_count, traffic_volume),
            },
            speed_bars: summary
                .distribution
                .iter()
                .map(|r| SpeedBar {
                    speed: r.speed,
                    count: r.count,
                })
                .collect(),
            tolerance: summary.tolerance,
            tolerance_donut,
            speed_ranges: summary.histogram,
        });
    }

    #[tracing::instrument(skip_all, fields(range = %range))]
    async fn render_inoperability(&self, range: DateRange, view: &mut DashboardView) {
        let buckets = match self.store.hourly_traffic(range).await {
            Ok(buckets) => buckets,
            Err(e) => {
                error!(error = %e, "Failed to load hourly traffic");
                view.banners
                    .push(Banner::error(format!("Could not load traffic data: {e}")));
                return;
            }
        };

        let rows = inoperability_report(&buckets);
        let intervals = inoperability_intervals(&buckets);
        info!(
            buckets = buckets.len(),
            inoperative = rows.len(),
            "Inoperability computed"
        );

        if rows.is_empty() {
            view.banners.push(Banner::info(format!(
                "No equipment was inoperative for 25 hours or more ({range})."
            )));
        }

        view.inoperability = Some(InoperabilityTable {
            range,
            rows,
            intervals,
        });
    }
}

fn build_map(mappable: &[&Equipment], selected: Option<&EquipmentId>, zoom: u8) -> MapView {
    let n = mappable.len() as f64;
    let center = (
        mappable.iter().map(|e| e.latitude).sum::<f64>() / n,
        mappable.iter().map(|e| e.longitude).sum::<f64>() / n,
    );

    let markers = mappable
        .iter()
        .map(|e| MapMarker {
            equipment_id: e.id.clone(),
            latitude: e.latitude,
            longitude: e.longitude,
            tooltip: e.name.clone(),
            popup: format!("{}\n{}", e.name, e.id),
            icon: e.status.into(),
            selected: selected == Some(&e.id),
        })
        .collect();

    MapView {
        center,
        zoom,
        markers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EquipmentStatus;

    fn radar(id: &str, lat: f64, lon: f64) -> Equipment {
        Equipment {
            id: EquipmentId::new(id),
            name: format!("RAD-{id}"),
            address: None,
            latitude: lat,
            longitude: lon,
            status: EquipmentStatus::Inactive,
            regulated_speed_limit: None,
        }
    }

    #[test]
    fn test_map_centers_on_mean_coordinate() {
        let a = radar("1", -22.0, -41.0);
        let b = radar("2", -23.0, -42.0);
        let map = build_map(&[&a, &b], Some(&EquipmentId::new("2")), 12);
        assert_eq!(map.center, (-22.5, -41.5));
        assert_eq!(map.zoom, 12);
        assert!(!map.markers[0].selected);
        assert!(map.markers[1].selected);
        assert_eq!(map.markers[0].icon, view::MarkerIcon::RadarInactive);
        assert_eq!(map.markers[0].popup, "RAD-1\n1");
    }
}
