//! Terminal reports: run summary, fixed-width tables and highlights.
//!
//! Every function returns a `String`; printing is left to the binary.

use crate::analyzers::types::{
    DroppedNeighborhood, EnrichedNeighborhood, Highlights, HousingUnitsByYear,
    NeighborhoodYearPrices, PricesByYear,
};
use crate::config::AnalysisConfig;
use crate::pipeline::{RunOutput, RunSummary};
use crate::plot::{render_housing_units, render_neighborhood_map, render_prices_by_year};

/// Shown in place of a missing mean.
const MISSING: &str = "-";

/// The full report: summary, every derived table, the dropped list and the
/// highlights. Charts are included when `chart_size` is `(width, height)`.
pub fn format_report(
    config: &AnalysisConfig,
    output: &RunOutput,
    chart_size: Option<(usize, usize)>,
) -> String {
    let analysis = &output.analysis;
    let mut out = format_run_summary(config, &output.summary());

    out.push_str("\nHousing units by year:\n");
    out.push_str(&format_housing_units(&analysis.housing_units_by_year));
    if let Some((width, height)) = chart_size {
        out.push('\n');
        out.push_str(&render_housing_units(&analysis.housing_units_by_year, width, height));
    }

    out.push_str("\nSale price per sq ft and gross rent by year:\n");
    out.push_str(&format_prices_by_year(&analysis.prices_square_foot_by_year));
    if let Some((width, height)) = chart_size {
        out.push('\n');
        out.push_str(&render_prices_by_year(&analysis.prices_square_foot_by_year, width, height));
    }

    out.push_str("\nSale price per sq ft, gross rent and rent-to-price by year and neighborhood:\n");
    out.push_str(&format_neighborhood_prices(&analysis.prices_by_year_by_neighborhood));

    out.push_str("\nAll neighborhoods:\n");
    out.push_str(&format_all_neighborhoods(&analysis.all_neighborhoods));
    out.push('\n');
    out.push_str(&format_dropped(&analysis.dropped_neighborhoods));
    if let Some((width, height)) = chart_size {
        out.push('\n');
        out.push_str(&render_neighborhood_map(&analysis.all_neighborhoods, width, height));
    }

    out.push('\n');
    out.push_str(&format_highlights(&analysis.highlights));
    out
}

/// Format the run summary (sources, row counts, join outcome).
pub fn format_run_summary(config: &AnalysisConfig, summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== San Francisco housing: rents and prices ===\n");
    out.push_str(&format!("Observations: {}\n", config.data_source));
    out.push_str(&format!("Coordinates: {}\n", config.coordinates_source));
    out.push_str(&format!(
        "Rows: read={} kept={} incomplete={}\n",
        summary.rows_read, summary.observations, summary.incomplete_rows
    ));
    out.push_str(&format!(
        "Coordinates: n={} duplicates={} (policy {})\n",
        summary.coordinates, summary.duplicate_coordinates, config.duplicate_policy
    ));
    out.push_str(&format!(
        "Neighborhoods: mapped={} dropped={}\n",
        summary.mapped_neighborhoods, summary.dropped_neighborhoods
    ));

    out
}

/// `housing_units_by_year` as a two-column table.
pub fn format_housing_units(rows: &[HousingUnitsByYear]) -> String {
    let mut out = header(&[("year", 6, false), ("housing_units", 14, true)]);
    for r in rows {
        push_line(
            &mut out,
            format!("{:<6} {:>14}", r.year, fmt_opt(r.housing_units, 0)),
        );
    }
    out
}

/// `prices_square_foot_by_year`.
pub fn format_prices_by_year(rows: &[PricesByYear]) -> String {
    let mut out = header(&[
        ("year", 6, false),
        ("sale_price_sqr_foot", 20, true),
        ("gross_rent", 12, true),
    ]);
    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:<6} {:>20} {:>12}",
                r.year,
                fmt_opt(r.sale_price_sqr_foot, 2),
                fmt_opt(r.gross_rent, 2)
            ),
        );
    }
    out
}

/// Rows of `prices_by_year_by_neighborhood`, typically one neighborhood's partition.
pub fn format_neighborhood_prices(rows: &[NeighborhoodYearPrices]) -> String {
    let mut out = header(&[
        ("year", 6, false),
        ("neighborhood", 28, false),
        ("sale_price_sqr_foot", 20, true),
        ("gross_rent", 12, true),
        ("rent_to_price", 14, true),
    ]);
    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:<6} {:<28} {:>20} {:>12} {:>14}",
                r.year,
                truncate(&r.neighborhood, 28),
                fmt_opt(r.sale_price_sqr_foot, 2),
                fmt_opt(r.gross_rent, 2),
                fmt_opt(r.rent_to_price, 4)
            ),
        );
    }
    out
}

/// `all_neighborhoods`.
pub fn format_all_neighborhoods(rows: &[EnrichedNeighborhood]) -> String {
    let mut out = header(&[
        ("neighborhood", 28, false),
        ("sale_price_sqr_foot", 20, true),
        ("gross_rent", 12, true),
        ("housing_units", 14, true),
        ("lat", 10, true),
        ("lon", 11, true),
    ]);
    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:<28} {:>20.2} {:>12.2} {:>14.0} {:>10.5} {:>11.5}",
                truncate(&r.neighborhood, 28),
                r.sale_price_sqr_foot,
                r.gross_rent,
                r.housing_units,
                r.latitude,
                r.longitude
            ),
        );
    }
    out
}

/// Neighborhoods left out of `all_neighborhoods`, with the reason.
pub fn format_dropped(rows: &[DroppedNeighborhood]) -> String {
    if rows.is_empty() {
        return "No neighborhoods dropped.\n".to_string();
    }
    let mut out = String::from("Dropped neighborhoods:\n");
    for d in rows {
        out.push_str(&format!("- {} ({})\n", d.neighborhood, d.reason));
    }
    out
}

pub fn format_highlights(highlights: &Highlights) -> String {
    let mut out = String::from("Highlights:\n");

    match &highlights.highest_gross_rent {
        Some(h) => out.push_str(&format!(
            "- Highest mean gross rent: {} ({:.2})\n",
            h.neighborhood, h.value
        )),
        None => out.push_str("- Highest mean gross rent: n/a\n"),
    }
    match &highlights.highest_sale_price {
        Some(h) => out.push_str(&format!(
            "- Highest mean sale price per sq ft: {} ({:.2})\n",
            h.neighborhood, h.value
        )),
        None => out.push_str("- Highest mean sale price per sq ft: n/a\n"),
    }
    match &highlights.lowest_gross_rent_year {
        Some(y) => out.push_str(&format!(
            "- Lowest mean gross rent: {} ({:.2})\n",
            y.year, y.value
        )),
        None => out.push_str("- Lowest mean gross rent: n/a\n"),
    }

    if highlights.price_drops.is_empty() {
        out.push_str("- No year-over-year drop in sale price per sq ft\n");
    }
    for d in &highlights.price_drops {
        let rent = d
            .gross_rent_change
            .map(|c| format!("{c:+.2}"))
            .unwrap_or_else(|| MISSING.to_string());
        out.push_str(&format!(
            "- Sale price per sq ft fell {} -> {}: {:+.2} (gross rent {})\n",
            d.previous_year, d.year, d.sale_price_change, rent
        ));
    }

    out
}

/// Header line plus dashed rule. Each column is `(name, width, right_aligned)`.
fn header(columns: &[(&str, usize, bool)]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|&(name, width, right)| {
            if right {
                format!("{name:>width$}")
            } else {
                format!("{name:<width$}")
            }
        })
        .collect();
    let rule: Vec<String> = columns.iter().map(|&(_, width, _)| "-".repeat(width)).collect();

    let mut out = String::new();
    push_line(&mut out, names.join(" "));
    push_line(&mut out, rule.join(" "));
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}"),
        Some(x) => format!("{x}"),
        None => MISSING.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{DropReason, NeighborhoodValue, PriceDrop, YearValue};

    #[test]
    fn test_format_housing_units() {
        let rows = vec![
            HousingUnitsByYear {
                year: 2010,
                housing_units: Some(372560.0),
            },
            HousingUnitsByYear {
                year: 2011,
                housing_units: None,
            },
        ];
        let expected = "\
year    housing_units
------ --------------
2010           372560
2011                -
";
        assert_eq!(format_housing_units(&rows), expected);
    }

    #[test]
    fn test_format_neighborhood_prices_marks_non_finite_ratio() {
        let rows = vec![NeighborhoodYearPrices {
            year: 2010,
            neighborhood: "Alamo Square".to_string(),
            sale_price_sqr_foot: Some(0.0),
            gross_rent: Some(1239.0),
            rent_to_price: Some(f64::INFINITY),
        }];
        let table = format_neighborhood_prices(&rows);
        let last = table.lines().last().unwrap();

        assert!(last.starts_with("2010   Alamo Square"));
        assert!(last.ends_with("inf"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Short", 10), "Short");
        assert_eq!(truncate("Westwood Park Extended Name", 10), "Westwood .");
        assert_eq!(truncate("Westwood Park Extended Name", 10).chars().count(), 10);
    }

    #[test]
    fn test_format_dropped() {
        assert_eq!(format_dropped(&[]), "No neighborhoods dropped.\n");

        let rows = vec![DroppedNeighborhood {
            neighborhood: "Presidio".to_string(),
            reason: DropReason::NoObservations,
        }];
        assert_eq!(
            format_dropped(&rows),
            "Dropped neighborhoods:\n- Presidio (no observations)\n"
        );
    }

    #[test]
    fn test_format_highlights() {
        let highlights = Highlights {
            highest_gross_rent: Some(NeighborhoodValue {
                neighborhood: "Westwood Park".to_string(),
                value: 3959.0,
            }),
            highest_sale_price: None,
            lowest_gross_rent_year: Some(YearValue {
                year: 2010,
                value: 1239.0,
            }),
            price_drops: vec![PriceDrop {
                year: 2011,
                previous_year: 2010,
                sale_price_change: -27.4,
                gross_rent_change: Some(291.0),
            }],
        };
        let expected = "\
Highlights:
- Highest mean gross rent: Westwood Park (3959.00)
- Highest mean sale price per sq ft: n/a
- Lowest mean gross rent: 2010 (1239.00)
- Sale price per sq ft fell 2010 -> 2011: -27.40 (gross rent +291.00)
";
        assert_eq!(format_highlights(&highlights), expected);
    }

    fn sample_run() -> RunOutput {
        use crate::loader::ObservationSet;
        use crate::pipeline::analyze;
        use crate::records::{Coordinate, CoordinateTable, Observation};

        let obs = |year: i32, name: &str, price: f64, rent: f64| Observation {
            year,
            neighborhood: name.to_string(),
            sale_price_sqr_foot: Some(price),
            gross_rent: Some(rent),
            housing_units: Some(372560),
        };
        let observations = vec![
            obs(2010, "Alamo Square", 291.18, 1239.0),
            obs(2010, "Bayview", 170.10, 1239.0),
            obs(2011, "Alamo Square", 272.52, 1530.0),
        ];
        let coordinates: CoordinateTable = [(
            "Alamo Square".to_string(),
            Coordinate {
                latitude: Some(37.791012),
                longitude: Some(-122.4021),
            },
        )]
        .into_iter()
        .collect();
        let analysis = analyze(&observations, &coordinates).unwrap();

        RunOutput {
            observations: ObservationSet {
                rows_read: observations.len(),
                incomplete_rows: 0,
                observations,
            },
            coordinates,
            analysis,
        }
    }

    #[test]
    fn test_format_report_lists_every_derived_table() {
        let report = format_report(&AnalysisConfig::default(), &sample_run(), None);

        assert!(report.contains("Housing units by year:\n"));
        assert!(report.contains("Sale price per sq ft and gross rent by year:\n"));
        assert!(report.contains("rent-to-price by year and neighborhood:\n"));
        assert!(report.contains("All neighborhoods:\n"));
        assert!(report.contains("2010   Bayview"));
        assert!(report.contains("2011   Alamo Square"));
        assert!(report.contains("- Bayview (no coordinate)\n"));
        assert!(report.ends_with(&format_highlights(&sample_run().analysis.highlights)));
        assert!(!report.contains("Legend:"));
    }

    #[test]
    fn test_format_report_with_charts() {
        let report = format_report(&AnalysisConfig::default(), &sample_run(), Some((20, 5)));

        assert!(report.contains("Housing units by year: y=["));
        assert!(report.contains("Legend: * sale_price_sqr_foot  + gross_rent\n"));
        assert!(report.contains("Neighborhood map: "));
    }

    #[test]
    fn test_format_run_summary() {
        let summary = RunSummary {
            rows_read: 397,
            observations: 397,
            incomplete_rows: 0,
            coordinates: 73,
            duplicate_coordinates: 0,
            mapped_neighborhoods: 73,
            dropped_neighborhoods: 0,
        };
        let text = format_run_summary(&AnalysisConfig::default(), &summary);

        assert!(text.contains("Rows: read=397 kept=397 incomplete=0\n"));
        assert!(text.contains("duplicates=0 (policy last-wins)"));
        assert!(text.contains("Neighborhoods: mapped=73 dropped=0\n"));
    }
}
