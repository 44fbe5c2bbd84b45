//! Commands module - all operations as library functions
//!
//! Thin wiring between configuration, environment credentials, and the
//! core clients. The CLI calls these; nothing here owns domain logic.

pub mod image;
pub mod recommend;
