//! CSV loaders for the observation and coordinate sources.
//!
//! Columns are matched by header name, so their order in the file does not
//! matter and extra columns are ignored. Only header names are trimmed: data
//! cells are kept byte-for-byte because neighborhood names are join keys.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::fetch::{HttpClient, read_source};
use crate::records::{
    Coordinate, CoordinateRow, CoordinateTable, DuplicatePolicy, GROSS_RENT, HOUSING_UNITS,
    NEIGHBORHOOD, Observation, ObservationRow, SALE_PRICE_SQR_FOOT, YEAR,
};

/// Header names accepted for each coordinate column.
const COORDINATE_COLUMNS: [(&str, &[&str]); 3] = [
    ("Neighborhood", &["Neighborhood", "neighborhood"]),
    ("Lat", &["Lat", "lat", "latitude", "Latitude"]),
    ("Lon", &["Lon", "lon", "lng", "longitude", "Longitude"]),
];

/// Parsed observation source plus row-level bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    pub observations: Vec<Observation>,
    /// Data records in the file, including dropped ones.
    pub rows_read: usize,
    /// Records dropped because `year` or `neighborhood` was empty.
    pub incomplete_rows: usize,
}

/// Reads and parses the observation source at `source` (path or URL).
#[tracing::instrument(skip(client))]
pub fn load_observations<C: HttpClient + ?Sized>(
    client: &C,
    source: &str,
) -> Result<ObservationSet, LoadError> {
    let bytes = read_source(client, source)?;
    parse_observations_from(source, &bytes)
}

/// Parses observation CSV bytes.
pub fn parse_observations(bytes: &[u8]) -> Result<ObservationSet, LoadError> {
    parse_observations_from("<memory>", bytes)
}

fn parse_observations_from(source_name: &str, bytes: &[u8]) -> Result<ObservationSet, LoadError> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(bytes);
    let headers = read_headers(&mut reader, source_name)?;

    for column in [YEAR, NEIGHBORHOOD, SALE_PRICE_SQR_FOOT, GROSS_RENT, HOUSING_UNITS] {
        require_column(&headers, source_name, column, &[column])?;
    }

    let mut set = ObservationSet::default();
    for row in deserialize_rows::<_, ObservationRow>(&mut reader, source_name) {
        set.rows_read += 1;
        let row = row?;
        if let Some(value) = row.fractional_housing_units() {
            return Err(LoadError::NotWholeNumber {
                source_name: source_name.to_string(),
                // Header is line 1.
                line: set.rows_read + 1,
                column: HOUSING_UNITS.to_string(),
                value,
            });
        }
        match row.into_observation() {
            Some(observation) => set.observations.push(observation),
            None => {
                set.incomplete_rows += 1;
                debug!(line = set.rows_read + 1, "Dropping observation without year or neighborhood");
            }
        }
    }

    if set.incomplete_rows > 0 {
        warn!(
            source = source_name,
            incomplete_rows = set.incomplete_rows,
            "Dropped incomplete observation rows"
        );
    }
    info!(
        source = source_name,
        rows_read = set.rows_read,
        observations = set.observations.len(),
        "Observations loaded"
    );

    Ok(set)
}

/// Reads and parses the coordinate source at `source` (path or URL).
#[tracing::instrument(skip(client))]
pub fn load_coordinates<C: HttpClient + ?Sized>(
    client: &C,
    source: &str,
    policy: DuplicatePolicy,
) -> Result<CoordinateTable, LoadError> {
    let bytes = read_source(client, source)?;
    parse_coordinates_from(source, &bytes, policy)
}

/// Parses coordinate CSV bytes.
pub fn parse_coordinates(bytes: &[u8], policy: DuplicatePolicy) -> Result<CoordinateTable, LoadError> {
    parse_coordinates_from("<memory>", bytes, policy)
}

fn parse_coordinates_from(
    source_name: &str,
    bytes: &[u8],
    policy: DuplicatePolicy,
) -> Result<CoordinateTable, LoadError> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(bytes);
    let headers = read_headers(&mut reader, source_name)?;

    for (column, aliases) in COORDINATE_COLUMNS {
        require_column(&headers, source_name, column, aliases)?;
    }

    let mut table = CoordinateTable::new();
    let mut unnamed = 0usize;

    for row in deserialize_rows::<_, CoordinateRow>(&mut reader, source_name) {
        let row = row?;
        let Some(neighborhood) = row.neighborhood else {
            unnamed += 1;
            continue;
        };

        if policy == DuplicatePolicy::Reject && table.contains(&neighborhood) {
            return Err(LoadError::DuplicateNeighborhood {
                source_name: source_name.to_string(),
                neighborhood,
            });
        }

        let coordinate = Coordinate {
            latitude: row.latitude,
            longitude: row.longitude,
        };
        if table.insert(neighborhood.clone(), coordinate).is_some() {
            warn!(
                source = source_name,
                neighborhood = %neighborhood,
                "Duplicate neighborhood coordinate, keeping the last one"
            );
        }
    }

    if unnamed > 0 {
        warn!(source = source_name, rows = unnamed, "Dropped coordinate rows without a neighborhood");
    }
    info!(
        source = source_name,
        neighborhoods = table.len(),
        duplicates = table.duplicates(),
        "Coordinates loaded"
    );

    Ok(table)
}

fn read_headers<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    source_name: &str,
) -> Result<StringRecord, LoadError> {
    reader.headers().cloned().map_err(|error| LoadError::Csv {
        source_name: source_name.to_string(),
        error,
    })
}

fn require_column(
    headers: &StringRecord,
    source_name: &str,
    column: &str,
    aliases: &[&str],
) -> Result<(), LoadError> {
    if headers.iter().any(|h| aliases.contains(&h)) {
        Ok(())
    } else {
        Err(LoadError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        })
    }
}

fn deserialize_rows<'r, R: std::io::Read, T: DeserializeOwned + 'r>(
    reader: &'r mut csv::Reader<R>,
    source_name: &'r str,
) -> impl Iterator<Item = Result<T, LoadError>> + 'r {
    reader.deserialize::<T>().map(move |result| {
        result.map_err(|error| LoadError::Csv {
            source_name: source_name.to_string(),
            error,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::FakeClient;
    use std::io::Write;

    #[test]
    fn test_parse_observations_by_header_name() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,291.18,372560,1239
2011,Anza Vista,267.93,374507,1530
";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert_eq!(set.rows_read, 2);
        assert_eq!(set.incomplete_rows, 0);
        assert_eq!(
            set.observations[0],
            Observation {
                year: 2010,
                neighborhood: "Alamo Square".to_string(),
                sale_price_sqr_foot: Some(291.18),
                gross_rent: Some(1239.0),
                housing_units: Some(372560),
            }
        );
    }

    #[test]
    fn test_parse_observations_ignores_column_order_and_extras() {
        let csv = "\
gross_rent,notes,housing_units,neighborhood,year,sale_price_sqr_foot
1239,first,372560,Alamo Square,2010,291.18
";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert_eq!(set.observations.len(), 1);
        assert_eq!(set.observations[0].gross_rent, Some(1239.0));
        assert_eq!(set.observations[0].year, 2010);
    }

    #[test]
    fn test_parse_observations_keeps_missing_numbers() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,,372560,1239
";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert_eq!(set.observations[0].sale_price_sqr_foot, None);
        assert_eq!(set.observations[0].housing_units, Some(372560));
    }

    #[test]
    fn test_parse_observations_drops_rows_without_keys() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
,Alamo Square,291.18,372560,1239
2010,,291.18,372560,1239
2010,Anza Vista,267.93,374507,1530
";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert_eq!(set.rows_read, 3);
        assert_eq!(set.incomplete_rows, 2);
        assert_eq!(set.observations.len(), 1);
    }

    #[test]
    fn test_parse_observations_preserves_name_whitespace() {
        let csv = "year , neighborhood ,sale_price_sqr_foot,housing_units,gross_rent\n2010, Anza Vista ,1,1,1\n";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert_eq!(set.observations[0].neighborhood, " Anza Vista ");
    }

    #[test]
    fn test_parse_observations_missing_column() {
        let csv = "year,neighborhood,sale_price_sqr_foot,gross_rent\n2010,A,1,1\n";
        let err = parse_observations(csv.as_bytes()).unwrap_err();

        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "housing_units"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_observations_accepts_float_housing_units() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,291.18,372560.0,1239
";
        let set = parse_observations(csv.as_bytes()).unwrap();
        assert_eq!(set.observations[0].housing_units, Some(372560));
    }

    #[test]
    fn test_parse_observations_rejects_fractional_housing_units() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,291.18,372560,1239
2011,Alamo Square,272.52,374507.5,1530
";
        let err = parse_observations(csv.as_bytes()).unwrap_err();

        match err {
            LoadError::NotWholeNumber { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "housing_units");
                assert_eq!(value, 374507.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_observations_wrong_type() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,expensive,372560,1239
";
        let err = parse_observations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn test_parse_observations_wrong_field_count() {
        let csv = "\
year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent
2010,Alamo Square,291.18,372560
";
        let err = parse_observations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn test_parse_observations_empty_body() {
        let csv = "year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent\n";
        let set = parse_observations(csv.as_bytes()).unwrap();

        assert!(set.observations.is_empty());
        assert_eq!(set.rows_read, 0);
    }

    #[test]
    fn test_parse_coordinates() {
        let csv = "\
Neighborhood,Lat,Lon
Alamo Square,37.791012,-122.4021
Anza Vista,37.779598,-122.443451
";
        let table = parse_coordinates(csv.as_bytes(), DuplicatePolicy::LastWins).unwrap();

        assert_eq!(table.len(), 2);
        let alamo = table.get("Alamo Square").unwrap();
        assert_eq!(alamo.latitude, Some(37.791012));
        assert_eq!(alamo.longitude, Some(-122.4021));
    }

    #[test]
    fn test_parse_coordinates_accepts_aliases() {
        let csv = "neighborhood,latitude,longitude\nAlamo Square,37.79,-122.40\n";
        let table = parse_coordinates(csv.as_bytes(), DuplicatePolicy::LastWins).unwrap();

        assert!(table.contains("Alamo Square"));
    }

    #[test]
    fn test_parse_coordinates_missing_column() {
        let csv = "Neighborhood,Lat\nAlamo Square,37.79\n";
        let err = parse_coordinates(csv.as_bytes(), DuplicatePolicy::LastWins).unwrap_err();

        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "Lon"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_coordinates_duplicates_last_wins() {
        let csv = "Neighborhood,Lat,Lon\nA,1.0,2.0\nA,3.0,4.0\n";
        let table = parse_coordinates(csv.as_bytes(), DuplicatePolicy::LastWins).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates(), 1);
        assert_eq!(table.get("A").unwrap().latitude, Some(3.0));
    }

    #[test]
    fn test_parse_coordinates_duplicates_rejected() {
        let csv = "Neighborhood,Lat,Lon\nA,1.0,2.0\nA,3.0,4.0\n";
        let err = parse_coordinates(csv.as_bytes(), DuplicatePolicy::Reject).unwrap_err();

        match err {
            LoadError::DuplicateNeighborhood { neighborhood, .. } => assert_eq!(neighborhood, "A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_observations_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            "year,neighborhood,sale_price_sqr_foot,housing_units,gross_rent\n2012,Bayview,170.62,378401,2324\n"
        )
        .unwrap();

        let client = FakeClient::new(b"");
        let set = load_observations(&client, tmp.path().to_str().unwrap()).unwrap();

        assert_eq!(set.observations.len(), 1);
        assert_eq!(set.observations[0].neighborhood, "Bayview");
    }

    #[test]
    fn test_load_coordinates_from_url() {
        let client = FakeClient::new(b"Neighborhood,Lat,Lon\nBayview,37.73,-122.39\n");
        let table =
            load_coordinates(&client, "https://example.com/coords.csv", DuplicatePolicy::Reject)
                .unwrap();

        assert!(table.contains("Bayview"));
    }

    #[test]
    fn test_load_observations_missing_file() {
        let client = FakeClient::new(b"");
        let err = load_observations(&client, "no/such/census.csv").unwrap_err();

        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
