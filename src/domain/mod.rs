//! Core domain types and logic.

pub mod price;
pub mod indicator;
pub mod signal;
pub mod drag;
pub mod calibration;
pub mod synthetic;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod sweep;
pub mod config_validation;
pub mod error;
