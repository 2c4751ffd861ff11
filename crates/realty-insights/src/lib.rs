//! Listing acquisition, normalization and filtering for the otodom
//! lands, houses and apartments tables.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod listings;
pub mod loader;
pub mod preprocess;
pub mod report;
pub mod source;
pub mod telemetry;
