use std::path::PathBuf;

use serde_json::json;

use super::{optional_str, required_date, required_str, store_mut, store_read_err, HandlerErr};
use crate::export;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::pivot::{self, ReportRow};
use crate::repo;
use crate::store::Store;
use crate::tabular::REPORT_EXPORT_HEADERS;

struct ReportQuery {
    start: String,
    end: String,
    service_id: Option<String>,
}

fn parse_query(params: &serde_json::Value) -> Result<ReportQuery, HandlerErr> {
    Ok(ReportQuery {
        start: required_date(params, "startDate")?,
        end: required_date(params, "endDate")?,
        service_id: optional_str(params, "serviceId"),
    })
}

fn collect_rows(store: &Store, query: &ReportQuery) -> Result<Vec<ReportRow>, HandlerErr> {
    let records = repo::list_tracking(store).map_err(store_read_err)?;
    let students = repo::list_students(store).map_err(store_read_err)?;
    let services = repo::list_services(store).map_err(store_read_err)?;
    Ok(pivot::build_report(
        &records,
        &students,
        &services,
        &query.start,
        &query.end,
        query.service_id.as_deref(),
    ))
}

fn report_generate(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let query = parse_query(params)?;
    let rows = collect_rows(store, &query)?;
    Ok(json!({
        "startDate": query.start,
        "endDate": query.end,
        "count": rows.len(),
        "rows": rows,
    }))
}

fn report_export_csv(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let query = parse_query(params)?;
    let path = PathBuf::from(required_str(params, "path")?);
    let rows = collect_rows(store, &query)?;
    if rows.is_empty() {
        return Ok(json!({ "written": false, "rows": 0 }));
    }

    let out = export::resolve_out_path(
        &path,
        &format!("Rapor_{}_{}.csv", query.start, query.end),
    );
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.date.clone(),
                r.service.clone(),
                r.student.clone(),
                r.morning.clone(),
                r.evening.clone(),
            ]
        })
        .collect();
    export::write_csv(&out, &REPORT_EXPORT_HEADERS, &cells)
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
    Ok(json!({
        "written": true,
        "rows": cells.len(),
        "path": out.to_string_lossy(),
    }))
}

fn report_export_pdf(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let query = parse_query(params)?;
    let path = PathBuf::from(required_str(params, "path")?);
    let fonts_dir = optional_str(params, "fontsDir").map(PathBuf::from);
    let rows = collect_rows(store, &query)?;
    if rows.is_empty() {
        return Ok(json!({ "written": false, "rows": 0 }));
    }

    let fonts = export::load_report_fonts(fonts_dir.as_deref())
        .map_err(|e| HandlerErr::new("pdf_fonts_missing", e.to_string()))?;
    let out = export::resolve_out_path(
        &path,
        &format!("Rapor_{}_{}.pdf", query.start, query.end),
    );
    let caption = format!("Tarih: {} - {}", query.start, query.end);
    export::write_report_pdf(&out, "Yoklama Raporu", &caption, &rows, fonts)
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
    Ok(json!({
        "written": true,
        "rows": rows.len(),
        "path": out.to_string_lossy(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "report.generate" => store_mut(state).and_then(|s| report_generate(s, &req.params)),
        "report.exportCsv" => store_mut(state).and_then(|s| report_export_csv(s, &req.params)),
        "report.exportPdf" => store_mut(state).and_then(|s| report_export_pdf(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
