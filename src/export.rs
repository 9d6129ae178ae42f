//! File-writing glue for the report/registry exports: CSV through the csv
//! crate, the printable report through genpdf.

use std::path::{Path, PathBuf};

use genpdf::elements::{Break, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::Element;

use crate::pivot::ReportRow;
use crate::tabular::REPORT_EXPORT_HEADERS;

/// Relative widths matching the on-screen report columns.
const REPORT_COLUMN_WEIGHTS: [usize; 5] = [3, 4, 5, 2, 2];

pub fn today_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Clients may hand us a directory; in that case the export lands there
/// under its conventional filename (e.g. `Servisler_2024-05-01.csv`).
pub fn resolve_out_path(path: &Path, default_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_name)
    } else {
        path.to_path_buf()
    }
}

pub fn write_csv(
    path: &Path,
    headers: &[&str],
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load the report font family. With an explicit directory only that
/// directory is searched (keeps failures deterministic); otherwise fall
/// back from ./fonts to the usual Liberation install locations.
pub fn load_report_fonts(
    fonts_dir: Option<&Path>,
) -> anyhow::Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>> {
    let candidates: Vec<PathBuf> = match fonts_dir {
        Some(dir) => vec![dir.to_path_buf()],
        None => vec![
            PathBuf::from("./fonts"),
            PathBuf::from("/usr/share/fonts/truetype/liberation"),
            PathBuf::from("/usr/share/fonts/liberation-sans"),
        ],
    };
    for dir in &candidates {
        if let Ok(family) = genpdf::fonts::from_files(dir, "LiberationSans", None) {
            return Ok(family);
        }
        if let Ok(family) = genpdf::fonts::from_files(dir, "Arial", None) {
            return Ok(family);
        }
    }
    anyhow::bail!(
        "no LiberationSans/Arial font files under {}",
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Title + date-range caption + a framed five-column table mirroring the
/// on-screen report.
pub fn write_report_pdf(
    path: &Path,
    title: &str,
    caption: &str,
    rows: &[ReportRow],
    fonts: genpdf::fonts::FontFamily<genpdf::fonts::FontData>,
) -> anyhow::Result<()> {
    let mut doc = genpdf::Document::new(fonts);
    doc.set_title(title);
    doc.set_font_size(10);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    doc.push(Paragraph::new(title).styled(Style::new().bold().with_font_size(14)));
    doc.push(Paragraph::new(caption).styled(Style::new().with_font_size(9)));
    doc.push(Break::new(1));

    let mut table = TableLayout::new(REPORT_COLUMN_WEIGHTS.to_vec());
    table.set_cell_decorator(genpdf::elements::FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for label in REPORT_EXPORT_HEADERS {
        header = header.element(Paragraph::new(label).styled(Style::new().bold()).padded(1));
    }
    header
        .push()
        .map_err(|e| anyhow::anyhow!("render report header row: {e}"))?;

    for row in rows {
        table
            .row()
            .element(Paragraph::new(row.date.as_str()).padded(1))
            .element(Paragraph::new(row.service.as_str()).padded(1))
            .element(Paragraph::new(row.student.as_str()).padded(1))
            .element(Paragraph::new(row.morning.as_str()).padded(1))
            .element(Paragraph::new(row.evening.as_str()).padded(1))
            .push()
            .map_err(|e| anyhow::anyhow!("render report row: {e}"))?;
    }
    doc.push(table);

    doc.render_to_file(path)
        .map_err(|e| anyhow::anyhow!("write pdf {}: {e}", path.display()))?;
    Ok(())
}
