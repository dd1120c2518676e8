//! Command implementations

pub mod bootstrap;
pub mod images;
pub mod provision;
pub mod version;
