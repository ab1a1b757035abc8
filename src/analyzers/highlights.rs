use crate::analyzers::types::{
    EnrichedNeighborhood, Highlights, NeighborhoodValue, PriceDrop, PricesByYear, YearValue,
};

/// Computes every highlight from the enriched view and the by-year prices.
pub fn highlights(enriched: &[EnrichedNeighborhood], prices_by_year: &[PricesByYear]) -> Highlights {
    Highlights {
        highest_gross_rent: highest_gross_rent(enriched),
        highest_sale_price: highest_sale_price(enriched),
        lowest_gross_rent_year: lowest_gross_rent_year(prices_by_year),
        price_drops: price_drops(prices_by_year),
    }
}

/// Neighborhood with the highest mean gross rent; the later row wins ties.
pub fn highest_gross_rent(rows: &[EnrichedNeighborhood]) -> Option<NeighborhoodValue> {
    highest_by(rows, |r| r.gross_rent)
}

/// Neighborhood with the highest mean sale price per square foot; the later row wins ties.
pub fn highest_sale_price(rows: &[EnrichedNeighborhood]) -> Option<NeighborhoodValue> {
    highest_by(rows, |r| r.sale_price_sqr_foot)
}

fn highest_by(
    rows: &[EnrichedNeighborhood],
    value: impl Fn(&EnrichedNeighborhood) -> f64,
) -> Option<NeighborhoodValue> {
    rows.iter()
        .filter(|r| value(*r).is_finite())
        // `max_by` returns the last of equal elements.
        .max_by(|a, b| value(*a).total_cmp(&value(*b)))
        .map(|r| NeighborhoodValue {
            neighborhood: r.neighborhood.clone(),
            value: value(r),
        })
}

/// Year with the lowest mean gross rent; the earliest year wins ties.
pub fn lowest_gross_rent_year(rows: &[PricesByYear]) -> Option<YearValue> {
    rows.iter()
        .filter_map(|r| r.gross_rent.filter(|v| v.is_finite()).map(|v| (r.year, v)))
        // `min_by` returns the first of equal elements.
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(year, value)| YearValue { year, value })
}

/// Years whose mean sale price fell compared with the previous row.
///
/// Rows without a sale price are skipped; the comparison is against the
/// closest earlier row that has one.
pub fn price_drops(rows: &[PricesByYear]) -> Vec<PriceDrop> {
    let priced: Vec<(&PricesByYear, f64)> = rows
        .iter()
        .filter_map(|r| r.sale_price_sqr_foot.filter(|v| v.is_finite()).map(|p| (r, p)))
        .collect();

    priced
        .windows(2)
        .filter_map(|pair| {
            let (prev, prev_price) = pair[0];
            let (curr, curr_price) = pair[1];
            if curr_price >= prev_price {
                return None;
            }
            Some(PriceDrop {
                year: curr.year,
                previous_year: prev.year,
                sale_price_change: curr_price - prev_price,
                gross_rent_change: curr.gross_rent.zip(prev.gross_rent).map(|(c, p)| c - p),
            })
        })
        .collect()
}
