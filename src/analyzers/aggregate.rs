use crate::analyzers::types::{
    DerivedView, GroupBy, GroupKey, HousingUnitsByYear, NeighborhoodAverages,
    NeighborhoodYearPrices, PricesByYear, ViewRow,
};
use crate::analyzers::utility::{mean, ratio};
use crate::error::InvalidColumnError;
use crate::records::{GROSS_RENT, HOUSING_UNITS, NUMERIC_COLUMNS, Observation, SALE_PRICE_SQR_FOOT};
use std::collections::BTreeMap;

/// Groups `observations` by `by` and averages each of `columns`.
///
/// Empty cells are skipped; a group with no values for a column gets a missing
/// mean. Rows come out in ascending key order.
pub fn group_mean(
    observations: &[Observation],
    by: GroupBy,
    columns: &[&str],
) -> Result<DerivedView, InvalidColumnError> {
    let columns = resolve_columns(columns, &NUMERIC_COLUMNS)?;

    let rows = observations.iter().map(|obs| {
        let values = columns
            .iter()
            // Columns were validated above, so every lookup succeeds.
            .map(|c| obs.numeric(c).flatten())
            .collect();
        (by.key_of(obs), values)
    });

    Ok(DerivedView {
        group_by: by,
        rows: mean_by_key(rows, columns.len()),
        columns,
    })
}

impl DerivedView {
    /// Re-aggregates this view. `by` may only use key columns this view has.
    ///
    /// Grouping a one-row-per-key view by its own key returns the same view.
    pub fn group_mean(&self, by: GroupBy, columns: &[&str]) -> Result<DerivedView, InvalidColumnError> {
        if let Some(missing) = by.missing_key_column(self.group_by) {
            return Err(InvalidColumnError::new(missing));
        }

        let available: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let columns = resolve_columns(columns, &available)?;
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<_, _>>()?;

        let rows = self.rows.iter().map(|row| {
            let values = indices.iter().map(|&i| row.values[i]).collect();
            (by.project(&row.key), values)
        });

        Ok(DerivedView {
            group_by: by,
            rows: mean_by_key(rows, columns.len()),
            columns,
        })
    }

    /// Keeps only `columns`, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<DerivedView, InvalidColumnError> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<_, _>>()?;

        Ok(DerivedView {
            group_by: self.group_by,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| ViewRow {
                    key: row.key.clone(),
                    values: indices.iter().map(|&i| row.values[i]).collect(),
                })
                .collect(),
        })
    }
}

/// All numeric columns averaged per year.
pub fn by_year(observations: &[Observation]) -> Result<DerivedView, InvalidColumnError> {
    group_mean(observations, GroupBy::Year, &NUMERIC_COLUMNS)
}

/// Price and rent averaged per (year, neighborhood); housing units are not kept.
pub fn by_year_and_neighborhood(observations: &[Observation]) -> Result<DerivedView, InvalidColumnError> {
    group_mean(
        observations,
        GroupBy::YearAndNeighborhood,
        &[SALE_PRICE_SQR_FOOT, GROSS_RENT],
    )
}

/// All numeric columns averaged per neighborhood.
pub fn by_neighborhood(observations: &[Observation]) -> Result<DerivedView, InvalidColumnError> {
    group_mean(observations, GroupBy::Neighborhood, &NUMERIC_COLUMNS)
}

/// `housing_units_by_year` from a by-year view.
pub fn housing_units_by_year(view: &DerivedView) -> Result<Vec<HousingUnitsByYear>, InvalidColumnError> {
    let view = view.select(&[HOUSING_UNITS])?;
    view.rows
        .iter()
        .map(|row| {
            Ok(HousingUnitsByYear {
                year: row.key.year()?,
                housing_units: row.values[0],
            })
        })
        .collect()
}

/// `prices_square_foot_by_year` from a by-year view.
pub fn prices_square_foot_by_year(view: &DerivedView) -> Result<Vec<PricesByYear>, InvalidColumnError> {
    let view = view.select(&[SALE_PRICE_SQR_FOOT, GROSS_RENT])?;
    view.rows
        .iter()
        .map(|row| {
            Ok(PricesByYear {
                year: row.key.year()?,
                sale_price_sqr_foot: row.values[0],
                gross_rent: row.values[1],
            })
        })
        .collect()
}

/// `prices_by_year_by_neighborhood` from a (year, neighborhood) view.
///
/// `rent_to_price` is computed from the group means, after averaging.
pub fn prices_by_year_by_neighborhood(
    view: &DerivedView,
) -> Result<Vec<NeighborhoodYearPrices>, InvalidColumnError> {
    let view = view.select(&[SALE_PRICE_SQR_FOOT, GROSS_RENT])?;
    view.rows
        .iter()
        .map(|row| {
            let sale_price_sqr_foot = row.values[0];
            let gross_rent = row.values[1];
            Ok(NeighborhoodYearPrices {
                year: row.key.year()?,
                neighborhood: row.key.neighborhood()?.to_string(),
                sale_price_sqr_foot,
                gross_rent,
                rent_to_price: ratio(gross_rent, sale_price_sqr_foot),
            })
        })
        .collect()
}

/// Per-neighborhood averages from a by-neighborhood view.
pub fn neighborhood_averages(view: &DerivedView) -> Result<Vec<NeighborhoodAverages>, InvalidColumnError> {
    let view = view.select(&NUMERIC_COLUMNS)?;
    view.rows
        .iter()
        .map(|row| {
            Ok(NeighborhoodAverages {
                neighborhood: row.key.neighborhood()?.to_string(),
                sale_price_sqr_foot: row.values[0],
                gross_rent: row.values[1],
                housing_units: row.values[2],
            })
        })
        .collect()
}

/// Splits `prices_by_year_by_neighborhood` into one year-ordered series per neighborhood.
pub fn partition_by_neighborhood(
    rows: &[NeighborhoodYearPrices],
) -> BTreeMap<String, Vec<NeighborhoodYearPrices>> {
    let mut partitions: BTreeMap<String, Vec<NeighborhoodYearPrices>> = BTreeMap::new();
    for row in rows {
        partitions
            .entry(row.neighborhood.clone())
            .or_default()
            .push(row.clone());
    }
    for series in partitions.values_mut() {
        series.sort_by_key(|r| r.year);
    }
    partitions
}

fn resolve_columns(requested: &[&str], available: &[&str]) -> Result<Vec<String>, InvalidColumnError> {
    requested
        .iter()
        .map(|c| {
            if available.contains(c) {
                Ok(c.to_string())
            } else {
                Err(InvalidColumnError::new(*c))
            }
        })
        .collect()
}

fn mean_by_key<I>(rows: I, width: usize) -> Vec<ViewRow>
where
    I: IntoIterator<Item = (GroupKey, Vec<Option<f64>>)>,
{
    let mut field_series: BTreeMap<GroupKey, Vec<Vec<f64>>> = BTreeMap::new();

    for (key, values) in rows {
        let series = field_series
            .entry(key)
            .or_insert_with(|| vec![Vec::new(); width]);
        for (column, value) in series.iter_mut().zip(values) {
            // NaN counts as missing, like an empty cell.
            if let Some(v) = value.filter(|v| !v.is_nan()) {
                column.push(v);
            }
        }
    }

    field_series
        .into_iter()
        .map(|(key, series)| ViewRow {
            key,
            values: series.iter().map(|s| mean(s)).collect(),
        })
        .collect()
}
