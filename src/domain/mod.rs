//! Core domain types and logic.

pub mod quote;
pub mod series;
pub mod provider;
pub mod indicator;
pub mod method;
pub mod filter;
pub mod strategy;
pub mod compiler;
pub mod backtest;
pub mod metrics;
pub mod screen;
pub mod universe;
pub mod config_validation;
pub mod error;
