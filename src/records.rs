//! Raw input records: housing observations and neighborhood coordinates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Column names of the observation source.
pub const YEAR: &str = "year";
pub const NEIGHBORHOOD: &str = "neighborhood";
pub const SALE_PRICE_SQR_FOOT: &str = "sale_price_sqr_foot";
pub const GROSS_RENT: &str = "gross_rent";
pub const HOUSING_UNITS: &str = "housing_units";

/// Numeric columns that can be averaged, in presentation order.
pub const NUMERIC_COLUMNS: [&str; 3] = [SALE_PRICE_SQR_FOOT, GROSS_RENT, HOUSING_UNITS];

/// One row of the census observation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub year: i32,
    pub neighborhood: String,
    pub sale_price_sqr_foot: Option<f64>,
    pub gross_rent: Option<f64>,
    pub housing_units: Option<i64>,
}

impl Observation {
    /// Looks up a numeric column by name.
    ///
    /// The outer `None` means the column does not exist; the inner one means
    /// the cell was empty.
    pub fn numeric(&self, column: &str) -> Option<Option<f64>> {
        match column {
            SALE_PRICE_SQR_FOOT => Some(self.sale_price_sqr_foot),
            GROSS_RENT => Some(self.gross_rent),
            HOUSING_UNITS => Some(self.housing_units.map(|v| v as f64)),
            _ => None,
        }
    }
}

/// Observation row as it appears on disk, before incomplete rows are dropped.
#[derive(Debug, Deserialize)]
pub(crate) struct ObservationRow {
    pub(crate) year: Option<i32>,
    pub(crate) neighborhood: Option<String>,
    pub(crate) sale_price_sqr_foot: Option<f64>,
    pub(crate) gross_rent: Option<f64>,
    /// Read as a float so `372560.0` is accepted; see [`whole_number`].
    pub(crate) housing_units: Option<f64>,
}

impl ObservationRow {
    /// `housing_units` when it is present but not a whole number.
    pub(crate) fn fractional_housing_units(&self) -> Option<f64> {
        self.housing_units.filter(|v| whole_number(*v).is_none())
    }

    /// Converts into an [`Observation`], or `None` when a grouping key is missing.
    ///
    /// A fractional `housing_units` becomes missing; loaders reject those rows
    /// first with [`ObservationRow::fractional_housing_units`].
    pub(crate) fn into_observation(self) -> Option<Observation> {
        Some(Observation {
            year: self.year?,
            neighborhood: self.neighborhood?,
            sale_price_sqr_foot: self.sale_price_sqr_foot,
            gross_rent: self.gross_rent,
            housing_units: self.housing_units.and_then(whole_number),
        })
    }
}

/// `value` as an integer when it is finite, has no fractional part and fits.
pub(crate) fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// Latitude/longitude of a neighborhood centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinate {
    /// Both components present and finite.
    pub fn is_complete(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite()
        )
    }
}

/// Coordinate row as it appears on disk.
#[derive(Debug, Deserialize)]
pub(crate) struct CoordinateRow {
    #[serde(rename = "Neighborhood", alias = "neighborhood")]
    pub(crate) neighborhood: Option<String>,
    #[serde(rename = "Lat", alias = "lat", alias = "latitude", alias = "Latitude")]
    pub(crate) latitude: Option<f64>,
    #[serde(
        rename = "Lon",
        alias = "lon",
        alias = "lng",
        alias = "longitude",
        alias = "Longitude"
    )]
    pub(crate) longitude: Option<f64>,
}

/// What to do when the coordinate source lists a neighborhood twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DuplicatePolicy {
    /// Keep the last row seen for the name.
    #[default]
    LastWins,
    /// Fail the load.
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::LastWins => write!(f, "last-wins"),
            DuplicatePolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-wins" | "last_wins" | "lastwins" => Ok(DuplicatePolicy::LastWins),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!(
                "unknown duplicate policy `{other}` (expected `last-wins` or `reject`)"
            )),
        }
    }
}

/// Neighborhood name to coordinate lookup, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateTable {
    entries: BTreeMap<String, Coordinate>,
    duplicates: usize,
}

impl CoordinateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a coordinate, returning the one it replaced.
    pub fn insert(&mut self, neighborhood: String, coordinate: Coordinate) -> Option<Coordinate> {
        let previous = self.entries.insert(neighborhood, coordinate);
        if previous.is_some() {
            self.duplicates += 1;
        }
        previous
    }

    pub fn get(&self, neighborhood: &str) -> Option<&Coordinate> {
        self.entries.get(neighborhood)
    }

    pub fn contains(&self, neighborhood: &str) -> bool {
        self.entries.contains_key(neighborhood)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows that overwrote an earlier row for the same name.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Coordinate)> for CoordinateTable {
    fn from_iter<I: IntoIterator<Item = (String, Coordinate)>>(iter: I) -> Self {
        let mut table = CoordinateTable::new();
        for (name, coordinate) in iter {
            table.insert(name, coordinate);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate {
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn test_numeric_lookup() {
        let obs = Observation {
            year: 2010,
            neighborhood: "Alamo Square".to_string(),
            sale_price_sqr_foot: Some(291.18),
            gross_rent: None,
            housing_units: Some(372560),
        };

        assert_eq!(obs.numeric(SALE_PRICE_SQR_FOOT), Some(Some(291.18)));
        assert_eq!(obs.numeric(GROSS_RENT), Some(None));
        assert_eq!(obs.numeric(HOUSING_UNITS), Some(Some(372560.0)));
        assert_eq!(obs.numeric("year"), None);
        assert_eq!(obs.numeric("price"), None);
    }

    #[test]
    fn test_row_missing_key_is_incomplete() {
        let row = ObservationRow {
            year: None,
            neighborhood: Some("Anza Vista".to_string()),
            sale_price_sqr_foot: Some(1.0),
            gross_rent: Some(1.0),
            housing_units: Some(1.0),
        };
        assert!(row.into_observation().is_none());
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number(372560.0), Some(372560));
        assert_eq!(whole_number(-3.0), Some(-3));
        assert_eq!(whole_number(372560.5), None);
        assert_eq!(whole_number(f64::NAN), None);
        assert_eq!(whole_number(f64::INFINITY), None);
        assert_eq!(whole_number(1e20), None);
    }

    #[test]
    fn test_coordinate_table_last_wins_counts_duplicates() {
        let mut table = CoordinateTable::new();
        assert!(table.insert("A".to_string(), coord(1.0, 2.0)).is_none());
        assert_eq!(
            table.insert("A".to_string(), coord(3.0, 4.0)),
            Some(coord(1.0, 2.0))
        );

        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates(), 1);
        assert_eq!(table.get("A"), Some(&coord(3.0, 4.0)));
    }

    #[test]
    fn test_coordinate_table_iterates_in_name_order() {
        let table: CoordinateTable = vec![
            ("Presidio".to_string(), coord(1.0, 1.0)),
            ("Bayview".to_string(), coord(2.0, 2.0)),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Bayview", "Presidio"]);
    }

    #[test]
    fn test_coordinate_completeness() {
        assert!(coord(37.7, -122.4).is_complete());
        assert!(!coord(f64::NAN, -122.4).is_complete());
        assert!(
            !Coordinate {
                latitude: Some(37.7),
                longitude: None
            }
            .is_complete()
        );
    }

    #[test]
    fn test_duplicate_policy_from_str() {
        assert_eq!(
            "last-wins".parse::<DuplicatePolicy>(),
            Ok(DuplicatePolicy::LastWins)
        );
        assert_eq!(" Reject ".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Reject));
        assert!("first-wins".parse::<DuplicatePolicy>().is_err());
    }
}
