//! SugarMama Library
//!
//! Glucose tracking for gestational diabetes: readings, range
//! classification, the weekly grid and PDF reports.

pub mod build_info;
pub mod config;
pub mod db;
pub mod glucose;
pub mod mcp;
pub mod models;
pub mod tools;
