pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod records;
pub mod report;
