// public modules
pub mod config;
pub mod core;
pub mod report;

// private modules
mod setters;

pub use self::core::GrowNetBooster;
