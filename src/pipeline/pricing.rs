//! Pricing Gateway: live unit prices for materials and labor.
//!
//! Each category is one GET against its own endpoint, expected to answer
//! with a flat JSON object `{ "<item>": <unit price>, … }`. A failed fetch is
//! never fatal: it becomes a [`PricingError`] and the caller prices that
//! category from an empty table (every item costs zero).

use crate::config::EstimatorConfig;
use crate::error::{EstimateError, PricingError};
use crate::output::PriceTable;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The two independent price lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceCategory {
    Materials,
    Labor,
}

impl PriceCategory {
    /// Prefix of the user-facing message when this category's fetch fails.
    pub fn error_label(self) -> &'static str {
        match self {
            PriceCategory::Materials => "Error fetching material prices",
            PriceCategory::Labor => "Error fetching labor costs",
        }
    }
}

impl fmt::Display for PriceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceCategory::Materials => f.write_str("materials"),
            PriceCategory::Labor => f.write_str("labor"),
        }
    }
}

/// Supplies a fresh price table per request. No caching.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, category: PriceCategory) -> Result<PriceTable, PricingError>;
}

/// [`PriceSource`] reading two HTTP endpoints.
#[derive(Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    materials_url: String,
    labor_url: String,
}

impl HttpPriceSource {
    pub fn new(
        client: reqwest::Client,
        materials_url: impl Into<String>,
        labor_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            materials_url: materials_url.into(),
            labor_url: labor_url.into(),
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Result<Self, EstimateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| EstimateError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::new(
            client,
            config.materials_url.clone(),
            config.labor_url.clone(),
        ))
    }

    pub fn url_for(&self, category: PriceCategory) -> &str {
        match category {
            PriceCategory::Materials => &self.materials_url,
            PriceCategory::Labor => &self.labor_url,
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch(&self, category: PriceCategory) -> Result<PriceTable, PricingError> {
        fetch_prices(&self.client, self.url_for(category), category.error_label()).await
    }
}

/// GET `url` and parse the body as an item → price object.
///
/// Transport errors, non-2xx statuses, unreadable bodies and non-object JSON
/// are all reported the same way: a [`PricingError`] carrying `label`.
pub async fn fetch_prices(
    client: &reqwest::Client,
    url: &str,
    label: &str,
) -> Result<PriceTable, PricingError> {
    let fail = |detail: String| {
        warn!(url = %url, "{}: {}", label, detail);
        PricingError {
            label: label.to_string(),
            url: url.to_string(),
            detail,
        }
    };

    debug!(url = %url, "Fetching prices");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("HTTP {}", status)));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| fail(format!("invalid JSON body: {}", e)))?;

    let table = parse_price_table(&body).map_err(fail)?;
    info!(url = %url, "Fetched {} prices", table.len());
    Ok(table)
}

/// Turn a JSON object into a [`PriceTable`].
///
/// Entries whose value is not a number are skipped (and so price at zero).
pub fn parse_price_table(body: &serde_json::Value) -> Result<PriceTable, String> {
    let object = body
        .as_object()
        .ok_or_else(|| format!("expected a JSON object of prices, got {}", json_kind(body)))?;

    let mut table = PriceTable::new();
    for (item, value) in object {
        match value.as_f64() {
            Some(price) if price.is_finite() => table.insert(item.clone(), price),
            _ => warn!("Skipping non-numeric price for '{}': {}", item, value),
        }
    }
    Ok(table)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Fetch both categories concurrently. Failures come back alongside an
/// empty table for the affected category.
pub async fn fetch_all(source: &dyn PriceSource) -> (PriceTable, PriceTable, Vec<PricingError>) {
    let (materials, labor) = tokio::join!(
        source.fetch(PriceCategory::Materials),
        source.fetch(PriceCategory::Labor),
    );

    let mut warnings = Vec::new();
    let mut settle = |result: Result<PriceTable, PricingError>| match result {
        Ok(table) => table,
        Err(e) => {
            warnings.push(e);
            PriceTable::default()
        }
    };

    let materials = settle(materials);
    let labor = settle(labor);
    (materials, labor, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flat_object() {
        let t = parse_price_table(&json!({"concrete": 2.0, "steel": 50, "wood": 1.5})).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get("steel"), Some(50.0));
    }

    #[test]
    fn skips_non_numeric_entries() {
        let t = parse_price_table(&json!({"concrete": "n/a", "wood": 1.5, "steel": null})).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("concrete"), None);
    }

    #[test]
    fn rejects_non_object_body() {
        let err = parse_price_table(&json!([1, 2, 3])).unwrap_err();
        assert!(err.contains("an array"), "got: {err}");
    }

    #[test]
    fn labels_match_user_messages() {
        assert_eq!(
            PriceCategory::Materials.error_label(),
            "Error fetching material prices"
        );
        assert_eq!(PriceCategory::Labor.error_label(), "Error fetching labor costs");
    }

    struct Fixed {
        materials: Result<PriceTable, PricingError>,
        labor: Result<PriceTable, PricingError>,
    }

    #[async_trait]
    impl PriceSource for Fixed {
        async fn fetch(&self, category: PriceCategory) -> Result<PriceTable, PricingError> {
            match category {
                PriceCategory::Materials => self.materials.clone(),
                PriceCategory::Labor => self.labor.clone(),
            }
        }
    }

    #[tokio::test]
    async fn fetch_all_degrades_failed_category_to_empty() {
        let source = Fixed {
            materials: Ok([("wood", 1.5)].into_iter().collect()),
            labor: Err(PricingError {
                label: PriceCategory::Labor.error_label().into(),
                url: "https://api.example.com/labor".into(),
                detail: "HTTP 500 Internal Server Error".into(),
            }),
        };
        let (materials, labor, warnings) = fetch_all(&source).await;
        assert_eq!(materials.get("wood"), Some(1.5));
        assert!(labor.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().starts_with("Error fetching labor costs"));
    }
}
