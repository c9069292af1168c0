//! Adapter implementations for reviewer assignment ports.

pub mod memory;
pub mod postgres;
