//! Per-session selection state and the interactive input that mutates it.
//!
//! The state is an explicit value owned by the session loop and handed to
//! each render pass. It changes only through [`SelectionState::click`],
//! [`SelectionState::pick_dates`] and the inoperability trigger.

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use tracing::debug;

use crate::dashboard::view::MapMarker;
use crate::models::{DateRange, EquipmentId, InvalidDateRange};

/// Maximum distance, in degrees on each axis, between a click and a marker.
pub const CLICK_TOLERANCE_DEG: f64 = 1e-4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Selected(EquipmentId),
}

/// A click on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapClick {
    /// A coordinate on the map surface.
    Point { latitude: f64, longitude: f64 },
    /// A marker identified by its tooltip text.
    Tooltip(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selection: Selection,
    date_range: Option<DateRange>,
    inoperability_requested: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected(&self) -> Option<&EquipmentId> {
        match &self.selection {
            Selection::Selected(id) => Some(id),
            Selection::None => None,
        }
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    /// Applies a map click. Returns `true` when the click hit a marker.
    ///
    /// Clicks that match no marker leave the selection untouched.
    pub fn click(&mut self, click: &MapClick, markers: &[MapMarker]) -> bool {
        let hit = match click {
            MapClick::Point {
                latitude,
                longitude,
            } => markers
                .iter()
                .filter(|m| {
                    (m.latitude - latitude).abs() <= CLICK_TOLERANCE_DEG
                        && (m.longitude - longitude).abs() <= CLICK_TOLERANCE_DEG
                })
                .min_by(|a, b| {
                    let da = (a.latitude - latitude).powi(2) + (a.longitude - longitude).powi(2);
                    let db = (b.latitude - latitude).powi(2) + (b.longitude - longitude).powi(2);
                    da.total_cmp(&db)
                }),
            MapClick::Tooltip(name) => markers.iter().find(|m| &m.tooltip == name),
        };

        match hit {
            Some(marker) => {
                debug!(equipment = %marker.equipment_id, "Equipment selected");
                self.selection = Selection::Selected(marker.equipment_id.clone());
                true
            }
            None => false,
        }
    }

    /// Selects equipment directly by id, as the CLI does for reports.
    pub fn select(&mut self, id: EquipmentId) {
        self.selection = Selection::Selected(id);
    }

    /// Applies the date picker. A reversed range is rejected and the
    /// previous range kept.
    pub fn pick_dates(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DateRange, InvalidDateRange> {
        let range = DateRange::new(start, end)?;
        self.date_range = Some(range);
        Ok(range)
    }

    /// Asks the next render pass to compute the inoperability table.
    pub fn request_inoperability(&mut self) {
        self.inoperability_requested = true;
    }

    /// Consumes a pending inoperability request.
    pub fn take_inoperability_request(&mut self) -> bool {
        std::mem::take(&mut self.inoperability_requested)
    }
}

/// Parses `YYYY-MM-DD` or `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("invalid date `{raw}`, expected YYYY-MM-DD or DD/MM/YYYY"))
}

/// A line of input in the interactive console.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Click(MapClick),
    Range(NaiveDate, NaiveDate),
    Inoperability,
    Show,
    Json,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  click <lat> <lon>      click the map at a coordinate
  select <name>          click the marker with this name
  range <start> <end>    pick the date range (YYYY-MM-DD or DD/MM/YYYY)
  inoperability          query inoperability for the current range
  show                   redraw the dashboard
  json                   print the dashboard as JSON
  help                   show this message
  quit                   leave the session";

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            bail!("empty command");
        };

        let command = match cmd.to_ascii_lowercase().as_str() {
            "click" => {
                let lat = parts.next().ok_or_else(|| anyhow!("usage: click <lat> <lon>"))?;
                let lon = parts.next().ok_or_else(|| anyhow!("usage: click <lat> <lon>"))?;
                SessionCommand::Click(MapClick::Point {
                    latitude: lat.parse().with_context(|| format!("invalid latitude `{lat}`"))?,
                    longitude: lon.parse().with_context(|| format!("invalid longitude `{lon}`"))?,
                })
            }
            "select" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    bail!("usage: select <name>");
                }
                SessionCommand::Click(MapClick::Tooltip(name))
            }
            "range" => {
                let start = parts.next().ok_or_else(|| anyhow!("usage: range <start> <end>"))?;
                let end = parts.next().ok_or_else(|| anyhow!("usage: range <start> <end>"))?;
                SessionCommand::Range(parse_date(start)?, parse_date(end)?)
            }
            "inoperability" | "inop" => SessionCommand::Inoperability,
            "show" => SessionCommand::Show,
            "json" => SessionCommand::Json,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => bail!("unknown command `{other}`, try `help`"),
        };

        Ok(command)
    }
}
