//! # Folio CLI
//!
//! Usage:
//!   folio report.json -o report.pdf
//!   echo '{ ... }' | folio -o report.pdf
//!   folio --example > report.json
//!   folio report.json --pages-only

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use folio::canvas::RecordingCanvas;
use folio::{FolioError, Report};

#[derive(Parser)]
#[command(name = "folio", about = "Lay out a JSON report into a paginated PDF")]
struct Args {
    /// Input JSON report (reads stdin when omitted)
    input: Option<PathBuf>,
    /// Output PDF file
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,
    /// Print an example report and exit
    #[arg(long)]
    example: bool,
    /// Paginate without writing a PDF and print the page count
    #[arg(long)]
    pages_only: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.example {
        print!("{}", example_report_json());
        return;
    }

    let input = match read_input(args.input.as_ref()) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = if args.pages_only {
        paginate(&input)
    } else {
        folio::render_json(&input).and_then(|bytes| {
            fs::write(&args.output, &bytes).map_err(|e| {
                FolioError::Canvas(folio::CanvasError::Output(format!(
                    "failed to write {}: {e}",
                    args.output.display()
                )))
            })?;
            eprintln!("Written {} bytes to {}", bytes.len(), args.output.display());
            Ok(())
        })
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn paginate(input: &str) -> Result<(), FolioError> {
    let mut report: Report = serde_json::from_str(input)?;
    report.probe_image_dimensions();
    let document = folio::render_with_canvas(&report, RecordingCanvas::new())?;
    println!("{}", document.page_count);
    for warning in &document.warnings {
        eprintln!("warning: page {}: {}", warning.page, warning.message);
    }
    Ok(())
}

fn example_report_json() -> &'static str {
    r##"{
  "title": "Pump Commissioning Report",
  "subtitle": "Northside Water Treatment, Job 2026-0412",
  "metadata": {
    "author": "Field Service",
    "subject": "Commissioning of raw water pump P-101"
  },
  "page": {
    "size": "A4",
    "margin": { "top": 40, "right": 40, "bottom": 40, "left": 40 }
  },
  "sections": [
    {
      "title": "Equipment",
      "blocks": [
        {
          "type": "Grid",
          "fields": [
            { "label": "Tag", "value": "P-101" },
            { "label": "Manufacturer", "value": "Grundfos" },
            { "label": "Model", "value": "NK 80-250/270" },
            { "label": "Serial", "value": "96812345" },
            { "label": "Location", "value": "Raw water pump house, bay 2", "span": 2 },
            { "label": "Motor", "value": "55 kW, 400 V, 1480 rpm" },
            { "label": "Duty point", "value": "180 m3/h at 42 m" },
            { "label": "Previous service" }
          ]
        }
      ]
    },
    {
      "title": "Pre-start Checks",
      "blocks": [
        {
          "type": "Table",
          "headers": ["Check", "Result", "By"],
          "columnWidths": [{ "Fraction": 0.6 }, "Auto", "Auto"],
          "rows": [
            ["Coupling alignment within tolerance", "Pass", "JM"],
            ["Baseplate grouted and bolts torqued", "Pass", "JM"],
            ["Suction and discharge valves open", "Pass", "RK"],
            ["Motor rotation direction verified", "Pass", "RK"],
            ["Bearing lubrication checked", "Pass", "JM"],
            ["Mechanical seal flush connected", "Pass", "RK"],
            ["Motor insulation resistance > 100 MOhm", "Pass", "EL"],
            ["Protection relay settings applied", "Pass", "EL"]
          ]
        }
      ]
    },
    {
      "title": "Running Test",
      "blocks": [
        {
          "type": "Table",
          "headers": ["Time", "Flow (m3/h)", "Head (m)", "Current (A)", "Vibration (mm/s)"],
          "rows": [
            ["10:00", "176", "42.8", "88", "1.9"],
            ["10:15", "179", "42.3", "90", "2.0"],
            ["10:30", "181", "42.0", "91", "2.1"],
            ["10:45", "180", "42.1", "90", "2.0"],
            ["11:00", "180", "42.1", "90", "2.0"]
          ]
        },
        {
          "type": "Text",
          "label": "Findings",
          "value": "The pump reached its duty point within ten minutes of start-up. Vibration stayed below 2.3 mm/s at both bearings throughout the test and bearing temperatures settled at 48 C (drive end) and 44 C (non-drive end).\n\nA minor weep at the seal flush connection was corrected by re-tightening the fitting. No further leakage was observed."
        },
        {
          "type": "Images",
          "images": [
            {
              "src": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==",
              "caption": "Pump after start-up"
            },
            {
              "src": "./photos/seal-flush.jpg",
              "caption": "Seal flush connection"
            }
          ]
        }
      ]
    },
    {
      "title": "Sign-off",
      "blocks": [
        {
          "type": "Grid",
          "fields": [
            { "label": "Commissioned by", "value": "J. Mahlangu" },
            { "label": "Date", "value": "2026-04-12" },
            { "label": "Client witness", "value": "R. Kruger" },
            { "label": "Date", "value": "2026-04-12" }
          ]
        }
      ]
    }
  ]
}
"##
}
