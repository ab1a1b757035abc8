//! Data types used by the aggregation pipeline.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidColumnError;
use crate::records::{NEIGHBORHOOD, Observation, YEAR};

/// Grouping strategy for a [`DerivedView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Year,
    YearAndNeighborhood,
    Neighborhood,
}

impl GroupBy {
    /// Key column names, in key-tuple order.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            GroupBy::Year => &[YEAR],
            GroupBy::YearAndNeighborhood => &[YEAR, NEIGHBORHOOD],
            GroupBy::Neighborhood => &[NEIGHBORHOOD],
        }
    }

    /// Group key of a raw observation under this strategy.
    pub fn key_of(self, observation: &Observation) -> GroupKey {
        let key = GroupKey {
            year: Some(observation.year),
            neighborhood: Some(observation.neighborhood.clone()),
        };
        self.project(&key)
    }

    /// Keeps only the parts of `key` this strategy groups on.
    pub fn project(self, key: &GroupKey) -> GroupKey {
        match self {
            GroupBy::Year => GroupKey {
                year: key.year,
                neighborhood: None,
            },
            GroupBy::YearAndNeighborhood => key.clone(),
            GroupBy::Neighborhood => GroupKey {
                year: None,
                neighborhood: key.neighborhood.clone(),
            },
        }
    }

    /// First key column of `self` that `other` does not group on.
    ///
    /// `None` means a view grouped by `other` can be regrouped by `self`.
    pub fn missing_key_column(self, other: GroupBy) -> Option<&'static str> {
        self.key_columns()
            .iter()
            .find(|c| !other.key_columns().contains(*c))
            .copied()
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_columns().join(","))
    }
}

impl FromStr for GroupBy {
    type Err = InvalidColumnError;

    /// Parses `year`, `neighborhood` or `year,neighborhood`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut year = false;
        let mut neighborhood = false;
        for name in s.split(',').map(str::trim) {
            match name {
                YEAR if !year => year = true,
                NEIGHBORHOOD if !neighborhood => neighborhood = true,
                other => return Err(InvalidColumnError::new(other)),
            }
        }
        match (year, neighborhood) {
            (true, false) => Ok(GroupBy::Year),
            (true, true) => Ok(GroupBy::YearAndNeighborhood),
            (false, true) => Ok(GroupBy::Neighborhood),
            (false, false) => Err(InvalidColumnError::new(s)),
        }
    }
}

/// Composite key of a derived row. Parts the view does not group on are `None`.
///
/// Ordering is the ascending key tuple, year first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub year: Option<i32>,
    pub neighborhood: Option<String>,
}

impl GroupKey {
    pub fn year(&self) -> Result<i32, InvalidColumnError> {
        self.year.ok_or_else(|| InvalidColumnError::new(YEAR))
    }

    pub fn neighborhood(&self) -> Result<&str, InvalidColumnError> {
        self.neighborhood
            .as_deref()
            .ok_or_else(|| InvalidColumnError::new(NEIGHBORHOOD))
    }
}

/// One group of a [`DerivedView`]: its key and one mean per view column.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub key: GroupKey,
    pub values: Vec<Option<f64>>,
}

/// A table of per-group means, ordered by ascending key.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView {
    pub(crate) group_by: GroupBy,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<ViewRow>,
}

impl DerivedView {
    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a numeric column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`DerivedView::column`] but reports unknown names as an error.
    pub fn require_column(&self, name: &str) -> Result<usize, InvalidColumnError> {
        self.column(name).ok_or_else(|| InvalidColumnError::new(name))
    }
}

/// `housing_units_by_year`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HousingUnitsByYear {
    pub year: i32,
    pub housing_units: Option<f64>,
}

/// `prices_square_foot_by_year`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricesByYear {
    pub year: i32,
    pub sale_price_sqr_foot: Option<f64>,
    pub gross_rent: Option<f64>,
}

/// `prices_by_year_by_neighborhood`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodYearPrices {
    pub year: i32,
    pub neighborhood: String,
    pub sale_price_sqr_foot: Option<f64>,
    pub gross_rent: Option<f64>,
    /// `gross_rent / sale_price_sqr_foot` of the group means.
    pub rent_to_price: Option<f64>,
}

/// Per-neighborhood means over all years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodAverages {
    pub neighborhood: String,
    pub sale_price_sqr_foot: Option<f64>,
    pub gross_rent: Option<f64>,
    pub housing_units: Option<f64>,
}

/// `all_neighborhoods`: averages joined with coordinates, all fields present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedNeighborhood {
    pub neighborhood: String,
    pub sale_price_sqr_foot: f64,
    pub gross_rent: f64,
    pub housing_units: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Why a neighborhood is missing from the enriched view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Has observations but no coordinate row.
    MissingCoordinate,
    /// Coordinate row lacks latitude or longitude.
    IncompleteCoordinate,
    /// An averaged column is missing.
    IncompleteAggregate,
    /// Has a coordinate row but no observations.
    NoObservations,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::MissingCoordinate => "no coordinate",
            DropReason::IncompleteCoordinate => "incomplete coordinate",
            DropReason::IncompleteAggregate => "incomplete averages",
            DropReason::NoObservations => "no observations",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedNeighborhood {
    pub neighborhood: String,
    pub reason: DropReason,
}

/// Result of the join step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedView {
    pub rows: Vec<EnrichedNeighborhood>,
    pub dropped: Vec<DroppedNeighborhood>,
}

impl EnrichedView {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// A year whose mean sale price per square foot fell versus the previous year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDrop {
    pub year: i32,
    pub previous_year: i32,
    pub sale_price_change: f64,
    /// Change in mean gross rent over the same step, when both years have it.
    pub gross_rent_change: Option<f64>,
}

/// A neighborhood singled out by one of its values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodValue {
    pub neighborhood: String,
    pub value: f64,
}

/// A year singled out by one of its values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

/// Answers to the questions asked of the derived tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlights {
    pub highest_gross_rent: Option<NeighborhoodValue>,
    pub highest_sale_price: Option<NeighborhoodValue>,
    pub lowest_gross_rent_year: Option<YearValue>,
    pub price_drops: Vec<PriceDrop>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_from_str() {
        assert_eq!("year".parse::<GroupBy>(), Ok(GroupBy::Year));
        assert_eq!(
            " year , neighborhood ".parse::<GroupBy>(),
            Ok(GroupBy::YearAndNeighborhood)
        );
        assert_eq!(
            "neighborhood,year".parse::<GroupBy>(),
            Ok(GroupBy::YearAndNeighborhood)
        );
        assert_eq!("neighborhood".parse::<GroupBy>(), Ok(GroupBy::Neighborhood));
    }

    #[test]
    fn test_group_by_from_str_rejects_unknown() {
        assert_eq!(
            "year,zip".parse::<GroupBy>(),
            Err(InvalidColumnError::new("zip"))
        );
        assert!("year,year".parse::<GroupBy>().is_err());
        assert!("".parse::<GroupBy>().is_err());
    }

    #[test]
    fn test_group_by_display_round_trips() {
        for by in [GroupBy::Year, GroupBy::YearAndNeighborhood, GroupBy::Neighborhood] {
            assert_eq!(by.to_string().parse::<GroupBy>(), Ok(by));
        }
    }

    #[test]
    fn test_key_order_is_year_then_neighborhood() {
        let a = GroupKey {
            year: Some(2010),
            neighborhood: Some("Westwood Park".to_string()),
        };
        let b = GroupKey {
            year: Some(2011),
            neighborhood: Some("Alamo Square".to_string()),
        };
        assert!(a < b);
    }

    #[test]
    fn test_missing_key_column() {
        assert_eq!(GroupBy::Year.missing_key_column(GroupBy::YearAndNeighborhood), None);
        assert_eq!(GroupBy::Neighborhood.missing_key_column(GroupBy::Neighborhood), None);
        assert_eq!(
            GroupBy::YearAndNeighborhood.missing_key_column(GroupBy::Year),
            Some(NEIGHBORHOOD)
        );
        assert_eq!(GroupBy::Year.missing_key_column(GroupBy::Neighborhood), Some(YEAR));
    }
}
