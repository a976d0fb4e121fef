// src/appointments/mod.rs

pub mod conflict;
pub mod error;
pub mod lifecycle;
#[cfg(test)]
pub mod memory_store;
pub mod model;
pub mod pg_store;
pub mod scope;
pub mod store;
pub mod view;
