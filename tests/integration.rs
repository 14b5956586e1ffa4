//! Integration tests for the Folio rendering pipeline.
//!
//! These tests exercise the full path from a report (in code or JSON) to
//! recorded pages and PDF output. They verify:
//! - JSON deserialization and error reporting
//! - Rows are never split across pages, for many block sizes
//! - Exact fits, pushes and splits land where they should
//! - PDF output is structurally valid
//! - Broken images degrade to placeholders
//! - Independent documents render concurrently

use std::thread;

use folio::canvas::{DrawOp, RecordedPage, RecordingCanvas};
use folio::layout::{LayoutMetrics, ReportRenderer};
use folio::model::*;
use folio::style::Theme;
use folio::FolioError;

// ─── Helpers ────────────────────────────────────────────────────

const MARGIN: f64 = 20.0;

fn page(height: f64) -> PageConfig {
    PageConfig {
        size: PageSize::Custom {
            width: 300.0,
            height,
        },
        margin: Edges::uniform(MARGIN),
        footer: None,
    }
}

fn renderer(height: f64) -> ReportRenderer<RecordingCanvas> {
    ReportRenderer::new(
        &page(height),
        LayoutMetrics::default(),
        Theme::default(),
        RecordingCanvas::with_char_width(4.0),
    )
    .unwrap()
}

fn fields(n: usize) -> Vec<Field> {
    (0..n)
        .map(|i| Field::new(&format!("F{i}"), &format!("v{i}")))
        .collect()
}

fn table(rows: usize) -> Table {
    Table::new(
        &["Item", "Qty", "Note"],
        (0..rows)
            .map(|i| vec![format!("row-{i}"), i.to_string(), "ok".to_string()])
            .collect(),
    )
}

fn all_text(pages: &[RecordedPage]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|p| p.text_lines().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Every rectangle and text line box lies inside the content area.
fn assert_within_content(pages: &[RecordedPage], page_height: f64) {
    let bottom = page_height - MARGIN;
    for (i, page) in pages.iter().enumerate() {
        for op in &page.ops {
            let (top, end) = match op {
                DrawOp::Rect { rect, .. } | DrawOp::Image { rect } => (rect.y, rect.bottom()),
                DrawOp::Text { lines, y, style, .. } => {
                    (*y, y + style.line_height * lines.len() as f64)
                }
            };
            assert!(top >= MARGIN - 1e-6, "page {}: {op:?} starts above the margin", i + 1);
            assert!(end <= bottom + 1e-6, "page {}: {op:?} crosses the bottom reserve", i + 1);
        }
    }
}

fn assert_each_once(texts: &[String], needles: impl Iterator<Item = String>) {
    for needle in needles {
        let count = texts.iter().filter(|t| **t == needle).count();
        assert_eq!(count, 1, "{needle} drawn {count} times");
    }
}

fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([20, 120, 200, 255]));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), 4, 2, image::ColorType::Rgba8)
        .unwrap();
    buf
}

fn sample_report() -> Report {
    let mut report = Report::new("Pump Teardown Report");
    report.subtitle = Some("Job 7781".to_string());
    report.sections = vec![
        Section::new(
            "Nameplate",
            vec![Block::Grid(Grid::new(vec![
                Field::new("Tag", "P-204"),
                Field::new("Serial", "SN-99812"),
                Field::wide("Location", "Clarifier building, lower level"),
                Field::empty("Last service"),
            ]))],
        ),
        Section::new("Parts", vec![Block::Table(table(60))]),
        Section::new(
            "Findings",
            vec![
                Block::Text(TextBlock::new(
                    "Inspection",
                    &"Wear ring clearance exceeded the limit on the suction side. ".repeat(25),
                )),
                Block::Images(ImagePair::new(vec![
                    ImageEntry::new(tiny_png(), 4, 2, Some("Impeller")),
                    ImageEntry::new(tiny_png(), 0, 0, Some("Volute")),
                ])),
            ],
        ),
    ];
    report
}

fn count_pdf_pages(bytes: &[u8]) -> usize {
    let needle = b"/Type /Page /Parent";
    bytes.windows(needle.len()).filter(|w| w == needle).count()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

// ─── Basic Pipeline Tests ───────────────────────────────────────

#[test]
fn test_minimal_json_report() {
    let bytes = folio::render_json(r#"{"title": "Empty", "sections": []}"#).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(count_pdf_pages(&bytes), 1);
}

#[test]
fn test_sample_report_produces_valid_pdf() {
    let bytes = folio::render(&sample_report()).unwrap();
    assert_valid_pdf(&bytes);
    assert!(count_pdf_pages(&bytes) >= 2);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Title (Pump Teardown Report)"));
}

#[test]
fn test_pdf_and_recording_agree_on_page_count() {
    let report = sample_report();
    let recorded = folio::render_with_canvas(&report, RecordingCanvas::new()).unwrap();
    let bytes = folio::render(&report).unwrap();
    assert_eq!(recorded.page_count, count_pdf_pages(&bytes));
    assert_eq!(recorded.page_count, recorded.output.len());
}

#[test]
fn test_rendering_is_deterministic() {
    let report = sample_report();
    assert_eq!(folio::render(&report).unwrap(), folio::render(&report).unwrap());
}

// ─── Row Atomicity ──────────────────────────────────────────────

#[test]
fn test_grid_rows_never_split() {
    for height in [180.0, 250.0, 333.0] {
        for n in 1..=60 {
            let mut r = renderer(height);
            // vary the starting offset with a filler block
            r.render_section("Filler", &[Block::Grid(Grid::new(fields(n % 7)))])
                .unwrap();
            r.render_section("Grid", &[Block::Grid(Grid::new(fields(n)))])
                .unwrap();
            let doc = r.finalize().unwrap();
            assert_within_content(&doc.output, height);
        }
    }
}

#[test]
fn test_table_rows_never_split() {
    for height in [160.0, 241.0, 400.0] {
        for n in 0..=50 {
            let mut r = renderer(height);
            r.render_section("Filler", &[Block::Grid(Grid::new(fields(n % 9)))])
                .unwrap();
            r.render_section("Parts", &[Block::Table(table(n))]).unwrap();
            let doc = r.finalize().unwrap();
            assert_within_content(&doc.output, height);

            let texts = all_text(&doc.output);
            assert_each_once(&texts, (0..n).map(|i| format!("row-{i}")));
        }
    }
}

#[test]
fn test_text_lines_never_lost() {
    let value: String = (0..120).map(|i| format!("w{i} ")).collect();
    for height in [150.0, 210.0, 500.0] {
        let mut r = renderer(height);
        r.render_section("Notes", &[Block::Text(TextBlock::new("Findings", &value))])
            .unwrap();
        let doc = r.finalize().unwrap();
        assert_within_content(&doc.output, height);

        let joined = all_text(&doc.output).join(" ");
        for i in 0..120 {
            assert!(
                joined.split_whitespace().any(|w| w == format!("w{i}")),
                "word w{i} missing at page height {height}"
            );
        }
    }
}

// ─── Fit / Split Scenarios ──────────────────────────────────────

#[test]
fn test_exact_fit_produces_no_break() {
    // header 20 + gap 4 + grid (5 rows * 14 + 6) = 100 = page capacity
    let mut r = renderer(100.0 + 2.0 * MARGIN);
    r.render_section("Exact", &[Block::Grid(Grid::new(fields(10)))])
        .unwrap();
    assert_eq!(r.state().remaining_space(), 0.0);
    let doc = r.finalize().unwrap();
    assert_eq!(doc.page_count, 1);
}

#[test]
fn test_one_row_short_splits() {
    // capacity 99: the last grid row moves to page 2
    let mut r = renderer(99.0 + 2.0 * MARGIN);
    r.render_section("Short", &[Block::Grid(Grid::new(fields(10)))])
        .unwrap();
    let doc = r.finalize().unwrap();
    assert_eq!(doc.page_count, 2);
    assert!(doc.output[0].contains_text("v7"));
    assert!(doc.output[1].contains_text("v8"));
    assert!(doc.output[1].contains_text("v9"));
}

#[test]
fn test_no_room_pushes_whole_block() {
    let mut r = renderer(300.0);
    // 260 capacity: header 24 + 16 rows (230) = 254, gap leaves 0
    r.render_section("Filler", &[Block::Grid(Grid::new(fields(32)))])
        .unwrap();
    assert!(r.state().remaining_space() < 14.0);

    r.render_section("Next", &[Block::Grid(Grid::new(fields(4)))])
        .unwrap();
    let doc = r.finalize().unwrap();
    assert_eq!(doc.page_count, 2);
    assert!(doc.output[1].contains_text("Next"));
    assert!(doc.output[1].contains_text("v0"));
    assert!(doc.output[1].contains_text("v3"));
}

#[test]
fn test_table_header_not_left_dangling() {
    let mut r = renderer(300.0);
    // 14 grid rows leave 28pt: room for the header row, not for a data row
    r.render_section(
        "Parts",
        &[Block::Grid(Grid::new(fields(28))), Block::Table(table(3))],
    )
    .unwrap();
    let doc = r.finalize().unwrap();

    assert_eq!(doc.page_count, 2);
    assert!(!doc.output[0].contains_text("Item"));
    assert!(doc.output[1].contains_text("Item"));
    assert!(doc.output[1].contains_text("row-0"));
    assert!(doc.output[1].contains_text("row-2"));
}

#[test]
fn test_wide_field_owns_its_row() {
    let mut f = fields(4);
    f.insert(1, Field::wide("Remarks", "wide value"));
    let mut r = renderer(400.0);
    r.render_section("Info", &[Block::Grid(Grid::new(f))]).unwrap();
    let doc = r.finalize().unwrap();

    let y_of = |needle: &str| {
        doc.output[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { lines, y, .. } if lines[0] == needle => Some(*y),
                _ => None,
            })
            .unwrap()
    };
    let rows = [y_of("v0"), y_of("wide value"), y_of("v1"), y_of("v3")];
    assert!(rows[0] < rows[1] && rows[1] < rows[2] && rows[2] < rows[3]);
    assert_eq!(y_of("v1"), y_of("v2"));
}

// ─── Errors ─────────────────────────────────────────────────────

#[test]
fn test_json_syntax_error_has_hint() {
    let err = folio::render_json(r#"{"title": "x",}"#).unwrap_err();
    assert!(matches!(err, FolioError::Parse { .. }));
    assert!(err.to_string().contains("Hint"));
}

#[test]
fn test_invalid_span_rejected() {
    let json = r#"{
        "title": "x",
        "sections": [{ "title": "s", "blocks": [
            { "type": "Grid", "fields": [{ "label": "a", "span": 3 }] }
        ]}]
    }"#;
    let err = folio::render_json(json).unwrap_err();
    assert!(err.to_string().contains("span"));
}

#[test]
fn test_ragged_table_rejected() {
    let json = r#"{
        "title": "x",
        "sections": [{ "title": "s", "blocks": [
            { "type": "Table", "headers": ["a", "b"], "rows": [["1", "2"], ["3"]] }
        ]}]
    }"#;
    let err = folio::render_json(json).unwrap_err();
    assert!(matches!(err, FolioError::InvalidBlock(_)));
}

#[test]
fn test_margins_wider_than_page_rejected() {
    let json = r#"{
        "title": "x",
        "page": { "size": { "Custom": { "width": 100, "height": 400 } },
                  "margin": { "top": 10, "right": 60, "bottom": 10, "left": 60 } }
    }"#;
    let err = folio::render_json(json).unwrap_err();
    assert!(matches!(err, FolioError::Configuration(_)));
}

#[test]
fn test_zero_or_negative_row_height_rejected() {
    for metrics in [
        r#"{ "gridRowHeight": 0, "gridPadding": 0 }"#,
        r#"{ "gridRowHeight": -14 }"#,
    ] {
        let json = format!(
            r#"{{
                "title": "x",
                "metrics": {metrics},
                "sections": [{{ "title": "Info", "blocks": [
                    {{ "type": "Grid", "fields": [{{ "label": "Tag", "value": "P-101" }}] }}
                ] }}]
            }}"#
        );
        let report: Report = serde_json::from_str(&json).unwrap();
        let err = folio::render_with_canvas(&report, RecordingCanvas::new()).unwrap_err();
        assert!(matches!(err, FolioError::Configuration(_)), "{metrics}: {err}");
    }
}

#[test]
fn test_row_taller_than_page_is_sizing_error() {
    let mut report = Report::new("Tall");
    report.page = page(120.0);
    report.metrics.grid_row_height = 200.0;
    report.sections = vec![Section::new("Grid", vec![Block::Grid(Grid::new(fields(2)))])];
    let err = folio::render(&report).unwrap_err();
    assert!(matches!(err, FolioError::Sizing { .. }), "got {err:?}");
}

// ─── Images ─────────────────────────────────────────────────────

#[test]
fn test_broken_image_becomes_placeholder() {
    let mut report = Report::new("Photos");
    report.sections = vec![Section::new(
        "Photos",
        vec![Block::Images(ImagePair::new(vec![
            ImageEntry::new(b"garbage bytes".to_vec(), 100, 100, Some("Broken")),
            ImageEntry::new(tiny_png(), 4, 2, Some("Fine")),
        ]))],
    )];

    let doc = folio::render_with_canvas(&report, RecordingCanvas::new()).unwrap();
    assert_eq!(doc.warnings.len(), 1);
    assert!(doc.output[0].contains_text("Reference Image"));
    assert_eq!(doc.output[0].image_count(), 1);

    // the PDF path survives the same input
    let bytes = folio::render(&report).unwrap();
    assert_valid_pdf(&bytes);
}

#[test]
fn test_json_image_sources() {
    use base64::Engine;
    let b64 = base64::engine::general_purpose::STANDARD.encode(tiny_png());
    let json = format!(
        r#"{{
        "title": "Photos",
        "sections": [{{ "title": "s", "blocks": [
            {{ "type": "Images", "images": [
                {{ "src": "data:image/png;base64,{b64}", "caption": "Data URI" }},
                {{ "src": "./no/such/file.png", "caption": "Missing" }}
            ] }}
        ]}}]
    }}"#
    );
    let bytes = folio::render_json(&json).unwrap();
    assert_valid_pdf(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Subtype /Image"));
}

// ─── Concurrency ────────────────────────────────────────────────

#[test]
fn test_concurrent_documents_are_independent() {
    let expected = folio::render(&sample_report()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| folio::render(&sample_report()).unwrap()))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
