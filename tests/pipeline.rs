//! Orchestration tests with in-memory stages.
//!
//! No pdfium, OCR engine, LLM or network is involved: each stage is a fake
//! behind its trait, and every fake counts how often it was called.

use async_trait::async_trait;
use plancost::{
    AnalysisError, AnalysisResult, EstimateError, EstimateProgressCallback, Estimator,
    ExtractionError, PlanAnalyzer, PlanDocument, PlanText, PriceCategory, PriceSource, PriceTable,
    PricingError, Quantities, ReportFormat, Stage, TextExtractor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeExtractor {
    result: Result<PlanText, ExtractionError>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(PlanText {
                text: text.to_string(),
                pages: 1,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(e: ExtractionError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(e),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, _document: &PlanDocument) -> Result<PlanText, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

struct FakeAnalyzer {
    result: Result<String, AnalysisError>,
    seen: Mutex<Vec<String>>,
}

impl FakeAnalyzer {
    fn ok(content: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(content.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(e: AnalysisError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(e),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl PlanAnalyzer for FakeAnalyzer {
    async fn analyze(&self, plan: &PlanText) -> Result<AnalysisResult, AnalysisError> {
        self.seen.lock().unwrap().push(plan.text.clone());
        self.result.clone().map(|content| AnalysisResult {
            content,
            model: Some("fake".into()),
            input_tokens: 10,
            output_tokens: 20,
        })
    }
}

struct FakePrices {
    materials: Result<PriceTable, PricingError>,
    labor: Result<PriceTable, PricingError>,
    calls: AtomicUsize,
}

impl FakePrices {
    fn new(
        materials: Result<PriceTable, PricingError>,
        labor: Result<PriceTable, PricingError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            materials,
            labor,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn fetch(&self, category: PriceCategory) -> Result<PriceTable, PricingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match category {
            PriceCategory::Materials => self.materials.clone(),
            PriceCategory::Labor => self.labor.clone(),
        }
    }
}

/// Records every progress event as a short string.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl EstimateProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage:?}"));
    }
    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.events.lock().unwrap().push(format!("done {stage:?}"));
    }
    fn on_pricing_error(&self, error: &PricingError) {
        self.events.lock().unwrap().push(format!("pricing {}", error.label));
    }
    fn on_failed(&self, stage: Stage, _error: &str) {
        self.events.lock().unwrap().push(format!("failed {stage:?}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn pdf() -> PlanDocument {
    PlanDocument::new("house.pdf", b"%PDF-1.7\n%fake body".to_vec())
}

fn material_prices() -> PriceTable {
    [("concrete", 2.0), ("steel", 50.0), ("wood", 1.5)]
        .into_iter()
        .collect()
}

fn labor_down() -> PricingError {
    PricingError {
        label: PriceCategory::Labor.error_label().into(),
        url: "http://127.0.0.1:1/labor".into(),
        detail: "connection refused".into(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn example_quantities_with_no_labor_rates_total_750() {
    let prices = FakePrices::new(Ok(material_prices()), Ok(PriceTable::new()));
    let estimator = Estimator::new(
        FakeExtractor::ok("GROUND FLOOR PLAN\nKITCHEN 12'x14'"),
        FakeAnalyzer::ok("Kitchen 12x14; concrete slab; electrician"),
        prices.clone(),
    );

    let report = estimator.estimate(pdf()).await.unwrap();

    let materials: Vec<(&str, f64)> = report.breakdown.material_costs().collect();
    assert_eq!(
        materials,
        vec![("concrete", 200.0), ("steel", 250.0), ("wood", 300.0)]
    );
    assert!(report.breakdown.labor_costs().all(|(_, c)| c == 0.0));
    assert_eq!(report.breakdown.labor.len(), 3);
    assert_eq!(report.breakdown.total, 750.0);
    assert!(report.warnings.is_empty());
    assert_eq!(prices.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn analysis_text_is_passed_through_verbatim() {
    let answer = "Rooms:\n- Kitchen 12x14\n\nMaterials: *tile*, | pipes |";
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok(answer),
        FakePrices::new(Ok(material_prices()), Ok(PriceTable::new())),
    );
    let report = estimator.estimate(pdf()).await.unwrap();
    assert_eq!(report.analysis.content, answer);
    assert_eq!(report.source, "house.pdf");
}

#[tokio::test]
async fn analyzer_receives_extracted_text() {
    let analyzer = FakeAnalyzer::ok("ok");
    let estimator = Estimator::new(
        FakeExtractor::ok("SECOND FLOOR 1,200 SQ FT"),
        analyzer.clone(),
        FakePrices::new(Ok(PriceTable::new()), Ok(PriceTable::new())),
    );
    estimator.estimate(pdf()).await.unwrap();
    assert_eq!(
        analyzer.seen.lock().unwrap().as_slice(),
        ["SECOND FLOOR 1,200 SQ FT".to_string()]
    );
}

#[tokio::test]
async fn extraction_failure_stops_before_analysis() {
    let analyzer = FakeAnalyzer::ok("unused");
    let prices = FakePrices::new(Ok(material_prices()), Ok(PriceTable::new()));
    let estimator = Estimator::new(
        FakeExtractor::failing(ExtractionError::CorruptPdf {
            detail: "xref".into(),
        }),
        analyzer.clone(),
        prices.clone(),
    );

    let err = estimator.estimate(pdf()).await.unwrap_err();
    assert!(matches!(err, EstimateError::Extraction(_)));
    assert!(err.to_string().starts_with("Failed to extract text from PDF"));
    assert_eq!(analyzer.calls(), 0);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analysis_failure_stops_before_pricing() {
    let prices = FakePrices::new(Ok(material_prices()), Ok(PriceTable::new()));
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::failing(AnalysisError::Api {
            message: "401 invalid api key".into(),
        }),
        prices.clone(),
    );

    let err = estimator.estimate(pdf()).await.unwrap_err();
    assert!(matches!(err, EstimateError::Analysis(_)));
    assert!(err.to_string().contains("invalid api key"));
    assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_pdf_is_rejected_before_any_stage() {
    let extractor = FakeExtractor::ok("plan");
    let estimator = Estimator::new(
        extractor.clone(),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Ok(PriceTable::new()), Ok(PriceTable::new())),
    );
    let err = estimator
        .estimate(PlanDocument::new("photo.png", b"\x89PNG\r\n".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, EstimateError::NotAPdf { .. }));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_labor_fetch_degrades_but_completes() {
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Ok(material_prices()), Err(labor_down())),
    );

    let report = estimator.estimate(pdf()).await.unwrap();
    assert!(report.is_degraded());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0]
        .to_string()
        .starts_with("Error fetching labor costs"));
    assert_eq!(report.breakdown.labor_subtotal, 0.0);
    assert_eq!(report.breakdown.total, 750.0);
}

#[tokio::test]
async fn both_fetches_failing_still_reports_zero_total() {
    let materials_down = PricingError {
        label: PriceCategory::Materials.error_label().into(),
        url: "http://127.0.0.1:1/materials".into(),
        detail: "HTTP 503 Service Unavailable".into(),
    };
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Err(materials_down), Err(labor_down())),
    );

    let report = estimator.estimate(pdf()).await.unwrap();
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(report.breakdown.total, 0.0);
    assert_eq!(report.breakdown.materials.len(), 3);
}

#[tokio::test]
async fn custom_quantities_replace_examples() {
    let materials: Quantities = [("drywall", 40.0), ("concrete", 10.0)].into_iter().collect();
    let labor: Quantities = [("carpenter", 8.0)].into_iter().collect();
    let rates: PriceTable = [("carpenter", 55.0)].into_iter().collect();
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Ok(material_prices()), Ok(rates)),
    )
    .with_quantities(materials, labor);

    let report = estimator.estimate(pdf()).await.unwrap();
    let items: Vec<&str> = report.breakdown.materials.iter().map(|l| l.item.as_str()).collect();
    assert_eq!(items, ["drywall", "concrete"]);
    assert_eq!(report.breakdown.materials[0].unit_price, None);
    assert_eq!(report.breakdown.material_subtotal, 20.0);
    assert_eq!(report.breakdown.labor_subtotal, 440.0);
    assert_eq!(report.breakdown.total, 460.0);
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let recorder = Arc::new(Recorder::default());
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Ok(material_prices()), Err(labor_down())),
    )
    .with_progress(recorder.clone());

    let report = estimator.estimate(pdf()).await.unwrap();
    estimator.present(&report, ReportFormat::Text).unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "start Extracting",
            "done Extracting",
            "start Analyzing",
            "done Analyzing",
            "start Pricing",
            "pricing Error fetching labor costs",
            "done Pricing",
            "start Aggregating",
            "done Aggregating",
            "start Presenting",
            "done Presenting",
        ]
    );
}

#[tokio::test]
async fn progress_reports_failed_stage() {
    let recorder = Arc::new(Recorder::default());
    let estimator = Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::failing(AnalysisError::EmptyResponse),
        FakePrices::new(Ok(PriceTable::new()), Ok(PriceTable::new())),
    )
    .with_progress(recorder.clone());

    estimator.estimate(pdf()).await.unwrap_err();
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events.last().map(String::as_str), Some("failed Analyzing"));
    assert!(!events.iter().any(|e| e.contains("Pricing")));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let estimator = Arc::new(Estimator::new(
        FakeExtractor::ok("plan"),
        FakeAnalyzer::ok("ok"),
        FakePrices::new(Ok(material_prices()), Ok(PriceTable::new())),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let estimator = Arc::clone(&estimator);
            tokio::spawn(async move {
                estimator
                    .estimate(PlanDocument::new(
                        format!("plan-{i}.pdf"),
                        b"%PDF-1.4 x".to_vec(),
                    ))
                    .await
            })
        })
        .collect();

    for (i, h) in handles.into_iter().enumerate() {
        let report = h.await.unwrap().unwrap();
        assert_eq!(report.source, format!("plan-{i}.pdf"));
        assert_eq!(report.breakdown.total, 750.0);
    }
}
