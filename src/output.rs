//! Data carried through, and produced by, one estimate request.
//!
//! Nothing here outlives a request: a [`PlanDocument`] comes in, an
//! [`EstimateReport`] goes out, and everything in between is owned by the
//! pipeline invocation.

use crate::error::{EstimateError, PricingError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// Raw uploaded plan: a display name and the PDF bytes.
#[derive(Clone)]
pub struct PlanDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PlanDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for PlanDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Text recognised from a plan, pages concatenated in page order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanText {
    pub text: String,
    pub pages: usize,
}

impl PlanText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The language model's findings, returned verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub content: String,
    pub model: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Ordered mapping of item name → quantity (units for materials, hours for
/// labor). Inserting an existing name replaces its quantity in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
pub struct Quantities(Vec<(String, f64)>);

impl Quantities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Example material quantities used when no quantities file is given.
    pub fn example_materials() -> Self {
        [("concrete", 100.0), ("steel", 5.0), ("wood", 200.0)]
            .into_iter()
            .collect()
    }

    /// Example labor hours used when no quantities file is given.
    pub fn example_labor() -> Self {
        [("electrician", 50.0), ("plumber", 40.0), ("carpenter", 60.0)]
            .into_iter()
            .collect()
    }

    pub fn insert(&mut self, item: impl Into<String>, quantity: f64) {
        let item = item.into();
        match self.0.iter_mut().find(|(name, _)| *name == item) {
            Some(entry) => entry.1 = quantity,
            None => self.0.push((item, quantity)),
        }
    }

    pub fn get(&self, item: &str) -> Option<f64> {
        self.0.iter().find(|(name, _)| name == item).map(|(_, q)| *q)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, q)| (name.as_str(), *q))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Quantities {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut q = Quantities::new();
        for (item, quantity) in iter {
            q.insert(item, quantity);
        }
        q
    }
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for Quantities {
    type Error = String;

    fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let mut q = Quantities::new();
        for (item, value) in map {
            let quantity = value
                .as_f64()
                .ok_or_else(|| format!("quantity for '{item}' is not a number: {value}"))?;
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(format!(
                    "quantity for '{item}' must be a non-negative number, got {quantity}"
                ));
            }
            q.insert(item, quantity);
        }
        Ok(q)
    }
}

impl Serialize for Quantities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (item, quantity) in &self.0 {
            map.serialize_entry(item, quantity)?;
        }
        map.end()
    }
}

/// Shape of a quantities file. Either section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuantitiesFile {
    pub materials: Option<Quantities>,
    pub labor: Option<Quantities>,
}

impl QuantitiesFile {
    pub fn from_json(json: &str) -> Result<Self, EstimateError> {
        serde_json::from_str(json).map_err(|e| EstimateError::InvalidQuantities(e.to_string()))
    }
}

/// Unit prices keyed by item name, as fetched for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable(HashMap<String, f64>);

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: impl Into<String>, price: f64) {
        self.0.insert(item.into(), price);
    }

    pub fn get(&self, item: &str) -> Option<f64> {
        self.0.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One priced row of the breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub item: String,
    pub quantity: f64,
    /// `None` when the price table had no entry; the cost is then zero.
    pub unit_price: Option<f64>,
    pub cost: f64,
}

/// Per-item costs for both categories plus subtotals and the grand total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub materials: Vec<CostLine>,
    pub labor: Vec<CostLine>,
    pub material_subtotal: f64,
    pub labor_subtotal: f64,
    pub total: f64,
}

impl CostBreakdown {
    /// Material costs as `(item, cost)` pairs in quantity order.
    pub fn material_costs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.materials.iter().map(|l| (l.item.as_str(), l.cost))
    }

    /// Labor costs as `(item, cost)` pairs in quantity order.
    pub fn labor_costs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labor.iter().map(|l| (l.item.as_str(), l.cost))
    }
}

/// Wall-clock timings for one request, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateStats {
    pub extraction_ms: u64,
    pub analysis_ms: u64,
    pub pricing_ms: u64,
    pub total_ms: u64,
}

/// Everything the presenter needs to render one estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateReport {
    pub source: String,
    pub pages: usize,
    pub analysis: AnalysisResult,
    pub breakdown: CostBreakdown,
    /// Pricing endpoints that failed; their category priced at zero.
    pub warnings: Vec<PricingError>,
    pub stats: EstimateStats,
}

impl EstimateReport {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// PDF metadata, for `plancost inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
