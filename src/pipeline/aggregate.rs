//! Cost Aggregator: quantity × unit price, per item, per category, in total.
//!
//! Pure functions of their inputs. An item missing from the price table
//! costs zero and is reported with `unit_price: None`; it is never an error.

use crate::output::{CostBreakdown, CostLine, PriceTable, Quantities};

/// Price every item of `quantities` against `prices`, keeping quantity order.
pub fn price_items(quantities: &Quantities, prices: &PriceTable) -> Vec<CostLine> {
    quantities
        .iter()
        .map(|(item, quantity)| {
            let unit_price = prices.get(item);
            CostLine {
                item: item.to_string(),
                quantity,
                unit_price,
                cost: quantity * unit_price.unwrap_or(0.0),
            }
        })
        .collect()
}

/// Sum of the `cost` column.
pub fn subtotal(lines: &[CostLine]) -> f64 {
    lines.iter().map(|l| l.cost).sum()
}

/// Build the full breakdown from the two quantity maps and two price tables.
pub fn aggregate(
    materials: &Quantities,
    labor: &Quantities,
    material_prices: &PriceTable,
    labor_rates: &PriceTable,
) -> CostBreakdown {
    let materials = price_items(materials, material_prices);
    let labor = price_items(labor, labor_rates);
    let material_subtotal = subtotal(&materials);
    let labor_subtotal = subtotal(&labor);

    CostBreakdown {
        materials,
        labor,
        material_subtotal,
        labor_subtotal,
        total: material_subtotal + labor_subtotal,
    }
}
