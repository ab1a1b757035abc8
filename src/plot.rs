//! ASCII charts for terminal output.
//!
//! Fixed-size character grids with deterministic output, so the charts can be
//! checked with golden tests. Missing and non-finite values are skipped.
//!
//! Chart elements:
//! - housing units: vertical `#` bars, one per year
//! - prices and rent-to-price: one line per series, drawn with the series glyph
//! - map: one point per neighborhood, glyph by gross-rent tercile

use crate::analyzers::types::{
    EnrichedNeighborhood, HousingUnitsByYear, NeighborhoodYearPrices, PricesByYear,
};

pub const DEFAULT_WIDTH: usize = 60;
pub const DEFAULT_HEIGHT: usize = 15;

const SALE_PRICE_GLYPH: char = '*';
const GROSS_RENT_GLYPH: char = '+';
const RENT_TO_PRICE_GLYPH: char = 'x';
/// Low, middle and high gross-rent tercile.
const TERCILE_GLYPHS: [char; 3] = ['.', 'o', '@'];

/// One named line of a line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub glyph: char,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Keeps only points with a finite value.
    pub fn new(
        label: impl Into<String>,
        glyph: char,
        points: impl IntoIterator<Item = (f64, Option<f64>)>,
    ) -> Self {
        Self {
            label: label.into(),
            glyph,
            points: points
                .into_iter()
                .filter_map(|(x, y)| y.filter(|v| v.is_finite()).map(|v| (x, v)))
                .filter(|(x, _)| x.is_finite())
                .collect(),
        }
    }
}

/// Bar chart of mean housing units per year.
pub fn render_housing_units(rows: &[HousingUnitsByYear], width: usize, height: usize) -> String {
    let bars: Vec<(i32, f64)> = rows
        .iter()
        .filter_map(|r| r.housing_units.filter(|v| v.is_finite()).map(|v| (r.year, v)))
        .collect();
    render_bar_chart("Housing units by year", &bars, width, height)
}

/// Line chart of mean sale price per square foot and mean gross rent per year.
pub fn render_prices_by_year(rows: &[PricesByYear], width: usize, height: usize) -> String {
    let series = [
        Series::new(
            "sale_price_sqr_foot",
            SALE_PRICE_GLYPH,
            rows.iter().map(|r| (f64::from(r.year), r.sale_price_sqr_foot)),
        ),
        Series::new(
            "gross_rent",
            GROSS_RENT_GLYPH,
            rows.iter().map(|r| (f64::from(r.year), r.gross_rent)),
        ),
    ];
    render_line_chart("Prices by year", &series, width, height)
}

/// Line chart of one neighborhood's prices over the years.
pub fn render_neighborhood_prices(
    neighborhood: &str,
    rows: &[NeighborhoodYearPrices],
    width: usize,
    height: usize,
) -> String {
    let series = [
        Series::new(
            "sale_price_sqr_foot",
            SALE_PRICE_GLYPH,
            rows.iter().map(|r| (f64::from(r.year), r.sale_price_sqr_foot)),
        ),
        Series::new(
            "gross_rent",
            GROSS_RENT_GLYPH,
            rows.iter().map(|r| (f64::from(r.year), r.gross_rent)),
        ),
    ];
    render_line_chart(neighborhood, &series, width, height)
}

/// Line chart of one neighborhood's rent-to-price ratio over the years.
///
/// Drawn on its own axis: the ratio is a small number next to prices in the
/// hundreds or thousands.
pub fn render_neighborhood_rent_to_price(
    neighborhood: &str,
    rows: &[NeighborhoodYearPrices],
    width: usize,
    height: usize,
) -> String {
    let series = [Series::new(
        "rent_to_price",
        RENT_TO_PRICE_GLYPH,
        rows.iter().map(|r| (f64::from(r.year), r.rent_to_price)),
    )];
    render_line_chart(&format!("{neighborhood} rent to price"), &series, width, height)
}

/// Scatter of neighborhoods by longitude (x) and latitude (y).
///
/// When two neighborhoods share a cell the higher tercile is shown.
pub fn render_neighborhood_map(rows: &[EnrichedNeighborhood], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<&EnrichedNeighborhood> = rows
        .iter()
        .filter(|r| r.latitude.is_finite() && r.longitude.is_finite() && r.gross_rent.is_finite())
        .collect();

    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        value_range(points.iter().map(|r| r.longitude)),
        value_range(points.iter().map(|r| r.latitude)),
    ) else {
        return "Neighborhood map: no data\n".to_string();
    };
    let (x_min, x_max) = widen((x_min, x_max), 0.05);
    let (y_min, y_max) = widen((y_min, y_max), 0.05);

    let mut rents: Vec<f64> = points.iter().map(|r| r.gross_rent).collect();
    rents.sort_by(f64::total_cmp);
    let cuts = (rents[rents.len() / 3], rents[2 * rents.len() / 3]);

    let mut grid = vec![vec![' '; width]; height];
    for r in &points {
        let tier = tercile(r.gross_rent, cuts);
        let x = to_column(r.longitude, (x_min, x_max), width);
        let y = to_row(r.latitude, (y_min, y_max), height);
        let cell = &mut grid[y][x];
        let current = TERCILE_GLYPHS.iter().position(|g| *g == *cell);
        if current.is_none_or(|c| c < tier) {
            *cell = TERCILE_GLYPHS[tier];
        }
    }

    let mut out = format!(
        "Neighborhood map: lon=[{x_min:.3}, {x_max:.3}] | lat=[{y_min:.3}, {y_max:.3}]\n"
    );
    push_grid(&mut out, grid);
    out.push_str(&format!(
        "Gross rent: {} low  {} mid  {} high\n",
        TERCILE_GLYPHS[0], TERCILE_GLYPHS[1], TERCILE_GLYPHS[2]
    ));
    out
}

/// Multi-series line chart over a shared x and y range.
///
/// Earlier series win cells where lines cross.
pub fn render_line_chart(title: &str, series: &[Series], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        value_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))),
        value_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1))),
    ) else {
        return format!("{title}: no data\n");
    };
    let (y_min, y_max) = widen((y_min, y_max), 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for s in series {
        draw_series(&mut grid, s, (x_min, x_max), (y_min, y_max));
    }

    let mut out = format!("{title}: x=[{x_min:.0}, {x_max:.0}] | y=[{y_min:.2}, {y_max:.2}]\n");
    push_grid(&mut out, grid);

    let legend: Vec<String> = series
        .iter()
        .map(|s| format!("{} {}", s.glyph, s.label))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join("  ")));
    out
}

fn render_bar_chart(title: &str, bars: &[(i32, f64)], width: usize, height: usize) -> String {
    let height = height.max(3);
    let width = width.max(10).max(bars.len());

    let Some((lo, hi)) = value_range(bars.iter().map(|b| b.1)) else {
        return format!("{title}: no data\n");
    };
    // Extra room below the smallest bar so it still shows.
    let (lo, hi) = widen((lo, hi), 0.25);

    let slot = width / bars.len();
    let bar_width = slot.saturating_sub(1).max(1);

    let mut grid = vec![vec![' '; width]; height];
    let mut labels = vec![' '; width];
    for (i, &(year, value)) in bars.iter().enumerate() {
        let x0 = i * slot;
        let top = to_row(value, (lo, hi), height);
        for row in grid.iter_mut().skip(top) {
            for cell in row.iter_mut().skip(x0).take(bar_width) {
                *cell = '#';
            }
        }

        let label = format!("{:02}", year.rem_euclid(100));
        if slot > label.len() {
            for (cell, ch) in labels.iter_mut().skip(x0).zip(label.chars()) {
                *cell = ch;
            }
        }
    }

    let mut out = format!("{title}: y=[{lo:.0}, {hi:.0}]\n");
    grid.push(labels);
    push_grid(&mut out, grid);
    out
}

fn tercile(value: f64, (low_cut, high_cut): (f64, f64)) -> usize {
    if value < low_cut {
        0
    } else if value < high_cut {
        1
    } else {
        2
    }
}

/// Min and max of the finite values; a single value is widened to a unit span.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min {
        Some((min, max))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

/// Grows `(min, max)` by `frac` of its span on both sides.
fn widen((min, max): (f64, f64), frac: f64) -> (f64, f64) {
    let margin = ((max - min).abs() * frac).max(1e-12);
    (min - margin, max + margin)
}

/// Position of `v` inside `range` as a fraction in `[0, 1]`.
fn fraction(v: f64, (lo, hi): (f64, f64)) -> f64 {
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

fn to_column(x: f64, range: (f64, f64), width: usize) -> usize {
    let last = width.max(2) as f64 - 1.0;
    (fraction(x, range) * last).round() as usize
}

/// Larger values land on smaller row indices.
fn to_row(y: f64, range: (f64, f64), height: usize) -> usize {
    let last = height.max(2) as f64 - 1.0;
    (last - fraction(y, range) * last).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], series: &Series, x_range: (f64, f64), y_range: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let cells: Vec<(usize, usize)> = series
        .points
        .iter()
        .map(|&(x, y)| (to_column(x, x_range, width), to_row(y, y_range, height)))
        .collect();

    match cells.as_slice() {
        [] => {}
        [only] => plot_segment(grid, *only, *only, series.glyph),
        _ => {
            for pair in cells.windows(2) {
                plot_segment(grid, pair[0], pair[1], series.glyph);
            }
        }
    }
}

/// Marks the cells between two `(column, row)` positions, endpoints included.
///
/// Cells that already hold a glyph keep it.
fn plot_segment(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), glyph: char) {
    let (mut col, mut row) = (from.0 as isize, from.1 as isize);
    let (end_col, end_row) = (to.0 as isize, to.1 as isize);

    let run = (end_col - col).abs();
    let rise = -(end_row - row).abs();
    let col_step = if col < end_col { 1 } else { -1 };
    let row_step = if row < end_row { 1 } else { -1 };
    let mut error = run + rise;

    loop {
        let cell = usize::try_from(row)
            .ok()
            .zip(usize::try_from(col).ok())
            .and_then(|(r, c)| grid.get_mut(r)?.get_mut(c));
        if let Some(cell) = cell.filter(|c| **c == ' ') {
            *cell = glyph;
        }

        if (col, row) == (end_col, end_row) {
            break;
        }
        let doubled = 2 * error;
        if doubled >= rise {
            error += rise;
            col += col_step;
        }
        if doubled <= run {
            error += run;
            row += row_step;
        }
    }
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
}
