//! Núcleo do cliente kaos: scan-to-relocate, tasca e fila de upload offline.

pub mod api;
pub mod common;
pub mod config;
pub mod db;
pub mod devices;
pub mod models;
pub mod services;

pub use common::error::AppError;
