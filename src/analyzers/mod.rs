//! Aggregation, enrichment and highlights over loaded observations.
//!
//! Observations are grouped by year, by (year, neighborhood) or by
//! neighborhood and averaged into [`types::DerivedView`]s; the
//! per-neighborhood view is then joined with coordinates.

pub mod aggregate;
pub mod enrich;
pub mod highlights;
pub mod types;
pub mod utility;
