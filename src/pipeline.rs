//! The analysis as an explicit chain of stages.
//!
//! load -> aggregate -> enrich -> highlights
//!
//! Every stage takes the previous stage's output as an argument and returns a
//! fresh value; nothing is shared between runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::analyzers::aggregate::{
    by_neighborhood, by_year, by_year_and_neighborhood, housing_units_by_year, neighborhood_averages,
    partition_by_neighborhood, prices_by_year_by_neighborhood, prices_square_foot_by_year,
};
use crate::analyzers::enrich::enrich;
use crate::analyzers::highlights::highlights;
use crate::analyzers::types::{
    DroppedNeighborhood, EnrichedNeighborhood, Highlights, HousingUnitsByYear,
    NeighborhoodYearPrices, PricesByYear,
};
use crate::config::AnalysisConfig;
use crate::error::{InvalidColumnError, PipelineError};
use crate::fetch::HttpClient;
use crate::loader::{ObservationSet, load_coordinates, load_observations};
use crate::records::{CoordinateTable, Observation};

/// The four derived tables plus join diagnostics and highlights.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub generated_at: DateTime<Utc>,
    pub housing_units_by_year: Vec<HousingUnitsByYear>,
    pub prices_square_foot_by_year: Vec<PricesByYear>,
    pub prices_by_year_by_neighborhood: Vec<NeighborhoodYearPrices>,
    pub all_neighborhoods: Vec<EnrichedNeighborhood>,
    pub dropped_neighborhoods: Vec<DroppedNeighborhood>,
    pub highlights: Highlights,
}

impl AnalysisOutput {
    /// Year-ordered prices of every neighborhood, keyed by name.
    pub fn neighborhood_partitions(&self) -> BTreeMap<String, Vec<NeighborhoodYearPrices>> {
        partition_by_neighborhood(&self.prices_by_year_by_neighborhood)
    }

    /// Year-ordered prices of one neighborhood, or `None` if it has no rows.
    pub fn neighborhood_series(&self, neighborhood: &str) -> Option<Vec<NeighborhoodYearPrices>> {
        self.neighborhood_partitions().remove(neighborhood)
    }
}

/// Everything a full run produced, inputs included.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observations: ObservationSet,
    pub coordinates: CoordinateTable,
    pub analysis: AnalysisOutput,
}

/// Counts describing what a run read and what it had to leave out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub observations: usize,
    pub incomplete_rows: usize,
    pub coordinates: usize,
    pub duplicate_coordinates: usize,
    pub mapped_neighborhoods: usize,
    pub dropped_neighborhoods: usize,
}

impl RunOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            rows_read: self.observations.rows_read,
            observations: self.observations.observations.len(),
            incomplete_rows: self.observations.incomplete_rows,
            coordinates: self.coordinates.len(),
            duplicate_coordinates: self.coordinates.duplicates(),
            mapped_neighborhoods: self.analysis.all_neighborhoods.len(),
            dropped_neighborhoods: self.analysis.dropped_neighborhoods.len(),
        }
    }
}

/// Loads both sources named in `config`, then runs [`analyze`].
///
/// Any load failure aborts before aggregation starts.
#[tracing::instrument(skip_all, fields(data = %config.data_source, coordinates = %config.coordinates_source))]
pub fn run<C: HttpClient + ?Sized>(config: &AnalysisConfig, client: &C) -> Result<RunOutput, PipelineError> {
    let observations = load_observations(client, &config.data_source)?;
    let coordinates = load_coordinates(client, &config.coordinates_source, config.duplicate_policy)?;
    let analysis = analyze(&observations.observations, &coordinates)?;

    Ok(RunOutput {
        observations,
        coordinates,
        analysis,
    })
}

/// Runs aggregation, enrichment and highlights over loaded data.
pub fn analyze(
    observations: &[Observation],
    coordinates: &CoordinateTable,
) -> Result<AnalysisOutput, InvalidColumnError> {
    // 1) Per-year views.
    let yearly = by_year(observations)?;
    let housing_units_by_year = housing_units_by_year(&yearly)?;
    let prices_square_foot_by_year = prices_square_foot_by_year(&yearly)?;

    // 2) Per (year, neighborhood) prices with rent-to-price.
    let prices_by_year_by_neighborhood =
        prices_by_year_by_neighborhood(&by_year_and_neighborhood(observations)?)?;

    // 3) Per-neighborhood averages joined with coordinates.
    let averages = neighborhood_averages(&by_neighborhood(observations)?)?;
    let enriched = enrich(&averages, coordinates);

    // 4) Highlights.
    let highlights = highlights(&enriched.rows, &prices_square_foot_by_year);

    info!(
        years = housing_units_by_year.len(),
        neighborhood_years = prices_by_year_by_neighborhood.len(),
        neighborhoods = averages.len(),
        mapped = enriched.rows.len(),
        "Analysis complete"
    );

    Ok(AnalysisOutput {
        generated_at: Utc::now(),
        housing_units_by_year,
        prices_square_foot_by_year,
        prices_by_year_by_neighborhood,
        all_neighborhoods: enriched.rows,
        dropped_neighborhoods: enriched.dropped,
        highlights,
    })
}
