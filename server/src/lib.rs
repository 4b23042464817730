//! Tora library
//!
//! This library exposes the core functionality of the Tora study tracker for
//! the server binary and for integration tests.

pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
