pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod merge;
pub mod metadata;
pub mod preferences;
pub mod runtime;
pub mod spreadsheet;
pub mod table;
pub mod xml;
