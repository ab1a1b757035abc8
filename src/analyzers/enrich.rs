//! Joins per-neighborhood averages with the coordinate table.
//!
//! Only neighborhoods with a coordinate and every averaged value present make
//! it into the enriched view; the rest are reported in `dropped`, never as an
//! error.

use tracing::{debug, info};

use crate::analyzers::types::{
    DropReason, DroppedNeighborhood, EnrichedNeighborhood, EnrichedView, NeighborhoodAverages,
};
use crate::records::CoordinateTable;

/// Inner join on the exact neighborhood name, in `averages` order.
pub fn enrich(averages: &[NeighborhoodAverages], coordinates: &CoordinateTable) -> EnrichedView {
    let mut view = EnrichedView::default();

    for avg in averages {
        match join_one(avg, coordinates) {
            Ok(row) => view.rows.push(row),
            Err(reason) => drop_neighborhood(&mut view, &avg.neighborhood, reason),
        }
    }

    for (name, _) in coordinates.iter() {
        if !averages.iter().any(|a| a.neighborhood == name) {
            drop_neighborhood(&mut view, name, DropReason::NoObservations);
        }
    }

    info!(
        enriched = view.rows.len(),
        dropped = view.dropped_count(),
        "Neighborhood enrichment complete"
    );
    view
}

fn join_one(
    avg: &NeighborhoodAverages,
    coordinates: &CoordinateTable,
) -> Result<EnrichedNeighborhood, DropReason> {
    let coordinate = coordinates
        .get(&avg.neighborhood)
        .ok_or(DropReason::MissingCoordinate)?;

    let (Some(latitude), Some(longitude)) = (
        present(coordinate.latitude),
        present(coordinate.longitude),
    ) else {
        return Err(DropReason::IncompleteCoordinate);
    };

    let (Some(sale_price_sqr_foot), Some(gross_rent), Some(housing_units)) = (
        present(avg.sale_price_sqr_foot),
        present(avg.gross_rent),
        present(avg.housing_units),
    ) else {
        return Err(DropReason::IncompleteAggregate);
    };

    Ok(EnrichedNeighborhood {
        neighborhood: avg.neighborhood.clone(),
        sale_price_sqr_foot,
        gross_rent,
        housing_units,
        latitude,
        longitude,
    })
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

fn drop_neighborhood(view: &mut EnrichedView, neighborhood: &str, reason: DropReason) {
    debug!(neighborhood, %reason, "Dropping neighborhood from enriched view");
    view.dropped.push(DroppedNeighborhood {
        neighborhood: neighborhood.to_string(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Coordinate;

    fn avg(name: &str, price: f64, rent: f64, units: f64) -> NeighborhoodAverages {
        NeighborhoodAverages {
            neighborhood: name.to_string(),
            sale_price_sqr_foot: Some(price),
            gross_rent: Some(rent),
            housing_units: Some(units),
        }
    }

    fn coords(entries: &[(&str, f64, f64)]) -> CoordinateTable {
        entries
            .iter()
            .map(|&(name, lat, lon)| {
                (
                    name.to_string(),
                    Coordinate {
                        latitude: Some(lat),
                        longitude: Some(lon),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_enrich_joins_matching_names() {
        let averages = vec![avg("A", 100.0, 10.0, 1000.0), avg("B", 200.0, 20.0, 2000.0)];
        let table = coords(&[("A", 37.7, -122.4), ("B", 37.8, -122.5)]);

        let view = enrich(&averages, &table);

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.dropped_count(), 0);
        assert_eq!(
            view.rows[1],
            EnrichedNeighborhood {
                neighborhood: "B".to_string(),
                sale_price_sqr_foot: 200.0,
                gross_rent: 20.0,
                housing_units: 2000.0,
                latitude: 37.8,
                longitude: -122.5,
            }
        );
    }

    #[test]
    fn test_enrich_drops_neighborhood_without_coordinate() {
        let averages = vec![avg("A", 100.0, 10.0, 1000.0), avg("Z", 1.0, 1.0, 1.0)];
        let table = coords(&[("A", 37.7, -122.4)]);

        let view = enrich(&averages, &table);

        assert_eq!(view.rows.len(), 1);
        assert!(view.rows.iter().all(|r| r.neighborhood != "Z"));
        assert_eq!(
            view.dropped,
            vec![DroppedNeighborhood {
                neighborhood: "Z".to_string(),
                reason: DropReason::MissingCoordinate,
            }]
        );
    }

    #[test]
    fn test_enrich_name_match_is_exact() {
        let averages = vec![avg("Anza Vista", 1.0, 1.0, 1.0)];
        let table = coords(&[("anza vista", 37.7, -122.4), ("Anza Vista ", 37.7, -122.4)]);

        let view = enrich(&averages, &table);

        assert!(view.rows.is_empty());
        assert_eq!(view.dropped[0].reason, DropReason::MissingCoordinate);
    }

    #[test]
    fn test_enrich_drops_incomplete_rows() {
        let mut missing_rent = avg("B", 200.0, 0.0, 2000.0);
        missing_rent.gross_rent = None;
        let averages = vec![avg("A", 100.0, 10.0, 1000.0), missing_rent];

        let mut table = coords(&[("B", 37.8, -122.5)]);
        table.insert(
            "A".to_string(),
            Coordinate {
                latitude: Some(37.7),
                longitude: None,
            },
        );

        let view = enrich(&averages, &table);

        assert!(view.rows.is_empty());
        let reasons: Vec<_> = view.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![DropReason::IncompleteCoordinate, DropReason::IncompleteAggregate]
        );
    }

    #[test]
    fn test_enrich_reports_coordinates_without_observations() {
        let averages = vec![avg("A", 100.0, 10.0, 1000.0)];
        let table = coords(&[("A", 37.7, -122.4), ("Presidio", 37.79, -122.46)]);

        let view = enrich(&averages, &table);

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.dropped[0].neighborhood, "Presidio");
        assert_eq!(view.dropped[0].reason, DropReason::NoObservations);
    }

    #[test]
    fn test_enrich_never_adds_rows() {
        let averages = vec![
            avg("A", 1.0, 1.0, 1.0),
            avg("B", 1.0, 1.0, 1.0),
            avg("C", 1.0, 1.0, 1.0),
        ];
        let table = coords(&[("B", 1.0, 1.0), ("C", 1.0, 1.0), ("D", 1.0, 1.0), ("E", 1.0, 1.0)]);

        let view = enrich(&averages, &table);

        assert!(view.rows.len() <= averages.len());
        assert!(view.rows.len() <= table.len());
        let names: Vec<_> = view.rows.iter().map(|r| r.neighborhood.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_enrich_empty_inputs() {
        let view = enrich(&[], &CoordinateTable::new());
        assert!(view.rows.is_empty());
        assert_eq!(view.dropped_count(), 0);
    }
}
