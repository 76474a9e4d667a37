//! Serializable view model produced by one render pass.
//!
//! These are the values a map widget and chart widgets would be fed; the
//! CLI prints them as text or JSON.

use serde::Serialize;

use crate::analytics::inoperability::{EquipmentDowntime, InoperabilityInterval};
use crate::analytics::speed::{SpeedBin, ToleranceSplit};
use crate::models::{DateRange, EquipmentId, EquipmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible message shown above the dashboard content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
}

impl Banner {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    RadarActive,
    RadarInactive,
}

impl From<EquipmentStatus> for MarkerIcon {
    fn from(status: EquipmentStatus) -> Self {
        match status {
            EquipmentStatus::Active => MarkerIcon::RadarActive,
            EquipmentStatus::Inactive => MarkerIcon::RadarInactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub equipment_id: EquipmentId,
    pub latitude: f64,
    pub longitude: f64,
    pub tooltip: String,
    pub popup: String,
    pub icon: MarkerIcon,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
}

/// One bar of the speed-vs-count chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeedBar {
    pub speed: i32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonutSlice {
    pub label: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCards {
    pub max_speed: Option<i32>,
    pub mean_speed: Option<f64>,
    pub mode_speed: Option<i32>,
    pub total_count: u64,
    pub traffic_volume: u64,
    pub capture_rate_pct: f64,
}

/// Charts and cards for the selected equipment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedPanel {
    pub equipment_id: EquipmentId,
    pub equipment_name: String,
    pub range: DateRange,
    pub title: String,
    pub cards: SummaryCards,
    pub speed_bars: Vec<SpeedBar>,
    pub tolerance: Option<ToleranceSplit>,
    pub tolerance_donut: Vec<DonutSlice>,
    pub speed_ranges: Vec<SpeedBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InoperabilityTable {
    pub range: DateRange,
    pub rows: Vec<EquipmentDowntime>,
    pub intervals: Vec<InoperabilityInterval>,
}

/// Everything one render pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub banners: Vec<Banner>,
    pub map: Option<MapView>,
    pub speed: Option<SpeedPanel>,
    pub inoperability: Option<InoperabilityTable>,
}

impl DashboardView {
    pub fn markers(&self) -> &[MapMarker] {
        self.map.as_ref().map(|m| m.markers.as_slice()).unwrap_or(&[])
    }

    pub fn has_error(&self) -> bool {
        self.banners.iter().any(|b| b.level == BannerLevel::Error)
    }
}
