//! Derived metrics for the dashboard.
//!
//! [`speed`] turns a speed distribution into summary statistics, the
//! regulatory tolerance split and a fixed-bin histogram. [`inoperability`]
//! finds runs of zero-traffic hours per equipment.

pub mod inoperability;
pub mod speed;
pub mod utility;
