//! Report Presenter: turn an [`EstimateReport`] into something a person reads.
//!
//! Four renderings of the same sections (analyzed plan, material breakdown,
//! labor breakdown, total, warnings):
//!
//! | Format | Used by |
//! |--------|---------|
//! | [`ReportFormat::Text`] | terminal output |
//! | [`ReportFormat::Markdown`] | `-o report.md`, pasting into tickets |
//! | [`ReportFormat::Json`] | scripting |
//! | [`render_html`] | the browser UI |
//!
//! No arithmetic happens here beyond formatting.

use crate::error::EstimateError;
use crate::output::{CostLine, EstimateReport};
use std::fmt::Write as _;
use std::path::PathBuf;

pub const MATERIAL_HEADING: &str = "Material Cost Breakdown";
pub const LABOR_HEADING: &str = "Labor Cost Breakdown";
pub const TOTAL_HEADING: &str = "Total Estimated Cost";
pub const ANALYSIS_HEADING: &str = "Analyzed Plan Data";

/// Column headers: (item column, cost column).
const MATERIAL_COLUMNS: (&str, &str) = ("Material", "Cost ($)");
const LABOR_COLUMNS: (&str, &str) = ("Labor Type", "Cost ($)");

/// Output format for textual reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension conventionally used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// `path` with the format's extension added when it has none.
pub fn with_default_extension(mut path: PathBuf, format: ReportFormat) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(format.extension());
    }
    path
}

/// `$<amount>` with exactly two decimals, e.g. `$750.00`.
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Render `report` in the requested textual format.
pub fn render(report: &EstimateReport, format: ReportFormat) -> Result<String, EstimateError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| EstimateError::Internal(format!("Failed to serialise report: {e}"))),
    }
}

// ── Plain text ───────────────────────────────────────────────────────────

/// Terminal rendering with aligned columns.
pub fn render_text(report: &EstimateReport) -> String {
    let mut out = String::new();

    section_title(&mut out, ANALYSIS_HEADING);
    out.push_str(report.analysis.content.trim_end());
    out.push_str("\n\n");

    section_title(&mut out, MATERIAL_HEADING);
    text_table(&mut out, MATERIAL_COLUMNS, &report.breakdown.materials);
    out.push('\n');

    section_title(&mut out, LABOR_HEADING);
    text_table(&mut out, LABOR_COLUMNS, &report.breakdown.labor);
    out.push('\n');

    section_title(&mut out, TOTAL_HEADING);
    out.push_str(&format_currency(report.breakdown.total));
    out.push('\n');

    if !report.warnings.is_empty() {
        out.push('\n');
        for w in &report.warnings {
            let _ = writeln!(out, "warning: {}", w);
        }
    }

    out
}

fn section_title(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
}

fn text_table(out: &mut String, columns: (&str, &str), lines: &[CostLine]) {
    let costs: Vec<String> = lines.iter().map(|l| format!("{:.2}", l.cost)).collect();
    let name_w = lines
        .iter()
        .map(|l| l.item.chars().count())
        .chain(std::iter::once(columns.0.chars().count()))
        .max()
        .unwrap_or(0);
    let cost_w = costs
        .iter()
        .map(|c| c.len())
        .chain(std::iter::once(columns.1.len()))
        .max()
        .unwrap_or(0);

    let _ = writeln!(out, "{:<name_w$}  {:>cost_w$}", columns.0, columns.1);
    let _ = writeln!(out, "{}  {}", "-".repeat(name_w), "-".repeat(cost_w));
    for (line, cost) in lines.iter().zip(&costs) {
        let _ = writeln!(out, "{:<name_w$}  {:>cost_w$}", line.item, cost);
    }
}

// ── Markdown ─────────────────────────────────────────────────────────────

/// GFM rendering; tables use right-aligned cost columns.
pub fn render_markdown(report: &EstimateReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Construction Cost Estimate: {}\n", md_escape(&report.source));

    let _ = writeln!(out, "## {}\n", ANALYSIS_HEADING);
    out.push_str(report.analysis.content.trim_end());
    out.push_str("\n\n");

    let _ = writeln!(out, "## {}\n", MATERIAL_HEADING);
    md_table(&mut out, MATERIAL_COLUMNS, &report.breakdown.materials);

    let _ = writeln!(out, "## {}\n", LABOR_HEADING);
    md_table(&mut out, LABOR_COLUMNS, &report.breakdown.labor);

    let _ = writeln!(out, "## {}\n", TOTAL_HEADING);
    let _ = writeln!(out, "**{}**", format_currency(report.breakdown.total));

    if !report.warnings.is_empty() {
        out.push('\n');
        for w in &report.warnings {
            let _ = writeln!(out, "> **Warning:** {}", md_escape(&w.to_string()));
        }
    }

    out
}

fn md_table(out: &mut String, columns: (&str, &str), lines: &[CostLine]) {
    let _ = writeln!(out, "| {} | {} |", columns.0, columns.1);
    out.push_str("|:---|---:|\n");
    for line in lines {
        let _ = writeln!(out, "| {} | {:.2} |", md_escape(&line.item), line.cost);
    }
    out.push('\n');
}

/// Escape the characters that break a GFM table cell or heading.
fn md_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('|', "\\|").replace('\n', " ")
}

// ── HTML ─────────────────────────────────────────────────────────────────

/// A complete HTML page for the browser UI.
pub fn render_html(report: &EstimateReport) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "<h2>{}</h2>", ANALYSIS_HEADING);
    let _ = writeln!(
        body,
        "<pre class=\"analysis\">{}</pre>",
        escape_html(report.analysis.content.trim_end())
    );

    for w in &report.warnings {
        let _ = writeln!(body, "<p class=\"warning\">{}</p>", escape_html(&w.to_string()));
    }

    let _ = writeln!(body, "<h2>{}</h2>", MATERIAL_HEADING);
    html_table(&mut body, MATERIAL_COLUMNS, &report.breakdown.materials);

    let _ = writeln!(body, "<h2>{}</h2>", LABOR_HEADING);
    html_table(&mut body, LABOR_COLUMNS, &report.breakdown.labor);

    let _ = writeln!(body, "<h2>{}</h2>", TOTAL_HEADING);
    let _ = writeln!(
        body,
        "<p class=\"total\">{}</p>",
        format_currency(report.breakdown.total)
    );
    body.push_str("<p><a href=\"/\">Estimate another plan</a></p>\n");

    html_page(&format!("Estimate: {}", report.source), &body)
}

/// The upload form served at `/`.
pub fn render_upload_form() -> String {
    let body = "<p>Upload a construction plan (PDF) to extract its text, analyse it and price \
materials and labor at current rates.</p>\n\
<form method=\"post\" action=\"/estimate\" enctype=\"multipart/form-data\">\n\
<input type=\"file\" name=\"plan\" accept=\".pdf,application/pdf\" required>\n\
<button type=\"submit\">Estimate</button>\n\
</form>\n";
    html_page("AI Construction Cost Estimator", body)
}

/// An error page carrying the user-facing message.
pub fn render_error_html(message: &str) -> String {
    let body = format!(
        "<p class=\"error\">{}</p>\n<p><a href=\"/\">Try again</a></p>\n",
        escape_html(message)
    );
    html_page("Estimate failed", &body)
}

fn html_table(out: &mut String, columns: (&str, &str), lines: &[CostLine]) {
    out.push_str("<table>\n");
    let _ = writeln!(
        out,
        "<thead><tr><th>{}</th><th class=\"num\">{}</th></tr></thead>",
        columns.0, columns.1
    );
    out.push_str("<tbody>\n");
    for line in lines {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{:.2}</td></tr>",
            escape_html(&line.item),
            line.cost
        );
    }
    out.push_str("</tbody>\n</table>\n");
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        body = body,
    )
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse;min-width:24rem}th,td{border-bottom:1px solid #ddd;padding:.3rem .8rem;text-align:left}\
.num{text-align:right}pre.analysis{white-space:pre-wrap;background:#f6f6f6;padding:1rem}\
.total{font-size:1.6rem;font-weight:bold}.warning{color:#8a5a00}.error{color:#b00020}";

/// Escape `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::output::{AnalysisResult, CostBreakdown, EstimateStats};
    use crate::pipeline::aggregate::aggregate;
    use crate::output::{PriceTable, Quantities};

    #[test]
    fn bare_output_path_gets_format_extension() {
        let path = with_default_extension(PathBuf::from("out/estimate"), ReportFormat::Markdown);
        assert_eq!(path, PathBuf::from("out/estimate.md"));
        let path = with_default_extension(PathBuf::from("estimate.txt"), ReportFormat::Json);
        assert_eq!(path, PathBuf::from("estimate.txt"));
    }

    fn sample_report(warnings: Vec<PricingError>) -> EstimateReport {
        let prices: PriceTable = [("concrete", 2.0), ("steel", 50.0), ("wood", 1.5)]
            .into_iter()
            .collect();
        EstimateReport {
            source: "house.pdf".into(),
            pages: 2,
            analysis: AnalysisResult {
                content: "Kitchen 12x14 <tile>".into(),
                ..Default::default()
            },
            breakdown: aggregate(
                &Quantities::example_materials(),
                &Quantities::example_labor(),
                &prices,
                &PriceTable::new(),
            ),
            warnings,
            stats: EstimateStats::default(),
        }
    }

    #[test]
    fn currency_has_two_decimals() {
        assert_eq!(format_currency(750.0), "$750.00");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.567), "$1234.57");
    }

    #[test]
    fn text_report_has_all_sections_in_order() {
        let text = render_text(&sample_report(vec![]));
        let a = text.find(ANALYSIS_HEADING).unwrap();
        let m = text.find(MATERIAL_HEADING).unwrap();
        let l = text.find(LABOR_HEADING).unwrap();
        let t = text.find(TOTAL_HEADING).unwrap();
        assert!(a < m && m < l && l < t);
        assert!(text.contains("concrete"));
        assert!(text.contains("250.00"));
        assert!(text.contains("Labor Type"));
        assert!(text.trim_end().ends_with("$750.00"));
    }

    #[test]
    fn markdown_tables_are_gfm() {
        let md = render_markdown(&sample_report(vec![]));
        assert!(md.contains("| Material | Cost ($) |"));
        assert!(md.contains("| wood | 300.00 |"));
        assert!(md.contains("| electrician | 0.00 |"));
        assert!(md.contains("**$750.00**"));
    }

    #[test]
    fn warnings_are_rendered() {
        let w = PricingError {
            label: "Error fetching labor costs".into(),
            url: "https://api.example.com/labor".into(),
            detail: "HTTP 503".into(),
        };
        let report = sample_report(vec![w]);
        assert!(render_text(&report).contains("warning: Error fetching labor costs: HTTP 503"));
        assert!(render_markdown(&report).contains("Error fetching labor costs"));
        assert!(render_html(&report).contains("class=\"warning\""));
    }

    #[test]
    fn html_escapes_model_output() {
        let html = render_html(&sample_report(vec![]));
        assert!(html.contains("Kitchen 12x14 &lt;tile&gt;"));
        assert!(!html.contains("<tile>"));
        assert!(html.contains("<p class=\"total\">$750.00</p>"));
    }

    #[test]
    fn json_round_trips_total() {
        let json = render(&sample_report(vec![]), ReportFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["breakdown"]["total"], 750.0);
        assert_eq!(v["breakdown"]["materials"][0]["item"], "concrete");
    }

    #[test]
    fn empty_breakdown_still_renders_tables() {
        let mut report = sample_report(vec![]);
        report.breakdown = CostBreakdown::default();
        let text = render_text(&report);
        assert!(text.contains("Material"));
        assert!(text.contains("$0.00"));
    }

    #[test]
    fn upload_form_accepts_pdf_only() {
        let html = render_upload_form();
        assert!(html.contains("name=\"plan\""));
        assert!(html.contains("accept=\".pdf,application/pdf\""));
    }
}
