//! Output formatting and persistence for dashboard views.
//!
//! Supports a plain-text rendering for the terminal, JSON, and CSV append
//! of the inoperability table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::dashboard::view::{BannerLevel, DashboardView, InoperabilityTable};

/// Logs the view using Rust's debug pretty-print format.
pub fn print_pretty(view: &DashboardView) {
    debug!("{:#?}", view);
}

/// Logs the view as pretty-printed JSON.
pub fn print_json(view: &DashboardView) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

/// Writes the view as pretty-printed JSON to `path`, replacing the file.
pub fn write_json(path: &str, view: &DashboardView) -> Result<()> {
    let body = serde_json::to_vec_pretty(view)?;
    std::fs::write(path, body).with_context(|| format!("writing {path}"))?;
    debug!(path, "Dashboard JSON written");
    Ok(())
}

#[derive(Serialize)]
struct InoperabilityRecord<'a> {
    range_start: NaiveDate,
    range_end: NaiveDate,
    equipment_id: &'a str,
    equipment_name: &'a str,
    total_inoperative_hours: u32,
}

/// Appends the inoperability rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_inoperability(path: &str, table: &InoperabilityTable) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = table.rows.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for row in &table.rows {
        writer.serialize(InoperabilityRecord {
            range_start: table.range.start(),
            range_end: table.range.end(),
            equipment_id: row.equipment_id.as_str(),
            equipment_name: &row.equipment_name,
            total_inoperative_hours: row.total_inoperative_hours,
        })?;
    }
    writer.flush()?;

    Ok(())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Renders the view as plain text for a terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();

    for banner in &view.banners {
        let tag = match banner.level {
            BannerLevel::Info => "info",
            BannerLevel::Success => "ok",
            BannerLevel::Warning => "warn",
            BannerLevel::Error => "error",
        };
        let _ = writeln!(out, "[{tag}] {}", banner.message);
    }

    if let Some(map) = &view.map {
        let _ = writeln!(
            out,
            "\nMap centre ({:.4}, {:.4}), {} equipment:",
            map.center.0,
            map.center.1,
            map.markers.len()
        );
        for marker in &map.markers {
            let _ = writeln!(
                out,
                "  {} {:<24} id={:<8} ({:.5}, {:.5})",
                if marker.selected { "*" } else { " " },
                marker.tooltip,
                marker.equipment_id,
                marker.latitude,
                marker.longitude
            );
        }
    }

    if let Some(panel) = &view.speed {
        let cards = &panel.cards;
        let _ = writeln!(out, "\n{} - {}", panel.equipment_name, panel.title);
        let _ = writeln!(
            out,
            "  max {} km/h | mean {} km/h | mode {} km/h",
            opt(cards.max_speed),
            opt(cards.mean_speed.map(|m| format!("{m:.1}"))),
            opt(cards.mode_speed)
        );
        let _ = writeln!(
            out,
            "  readings {} | traffic {} | OCR capture {:.1}%",
            cards.total_count, cards.traffic_volume, cards.capture_rate_pct
        );

        if !panel.tolerance_donut.is_empty() {
            let _ = writeln!(out, "  Tolerance:");
            for slice in &panel.tolerance_donut {
                let _ = writeln!(
                    out,
                    "    {:<28} {:>8} {:>6.1}%",
                    slice.label, slice.count, slice.percent
                );
            }
        }

        let peak = panel.speed_ranges.iter().map(|b| b.count).max().unwrap_or(0);
        let _ = writeln!(out, "  Speed ranges (km/h):");
        for bin in &panel.speed_ranges {
            let width = if peak == 0 {
                0
            } else {
                (bin.count * 40).div_ceil(peak) as usize
            };
            let _ = writeln!(
                out,
                "    {:>7} {:>8} {}",
                bin.label,
                bin.count,
                "#".repeat(width)
            );
        }
    }

    if let Some(table) = &view.inoperability {
        let _ = writeln!(out, "\nInoperability ({}):", table.range);
        for row in &table.rows {
            let _ = writeln!(
                out,
                "  {:<24} {:>5} h",
                row.equipment_name, row.total_inoperative_hours
            );
        }
        for interval in &table.intervals {
            let _ = writeln!(
                out,
                "    {} {} -> {} ({} h)",
                interval.equipment_name,
                interval.start.format("%d/%m/%Y %H:%M"),
                interval.end.format("%d/%m/%Y %H:%M"),
                interval.hours
            );
        }
    }

    out
}
