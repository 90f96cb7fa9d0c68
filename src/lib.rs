//! Device Telemetry - device registry and sensor telemetry ingestion API
//!
//! This library exposes the core modules for testing and reuse.

pub mod common;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod repository;
pub mod routes;
pub mod services;
