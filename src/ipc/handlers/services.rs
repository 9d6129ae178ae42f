use std::path::PathBuf;

use serde_json::json;

use super::{
    csv_open_err, optional_str, required_str, store_mut, store_read_err, store_write_err,
    HandlerErr,
};
use crate::export;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::Service;
use crate::repo;
use crate::store::{self, Store};
use crate::tabular::{self, SERVICE_EXPORT_HEADERS};

fn service_json(service: &Service, student_count: usize) -> serde_json::Value {
    json!({
        "id": service.id,
        "name": service.name,
        "plate": service.plate,
        "driverName": service.driver_name,
        "phone": service.phone,
        "location": service.location,
        "studentCount": student_count,
    })
}

fn services_list(store: &Store) -> Result<serde_json::Value, HandlerErr> {
    let services = repo::list_services(store).map_err(store_read_err)?;
    let students = repo::list_students(store).map_err(store_read_err)?;
    let rows: Vec<serde_json::Value> = services
        .iter()
        .map(|s| {
            let count = students.iter().filter(|st| st.service_id == s.id).count();
            service_json(s, count)
        })
        .collect();
    Ok(json!({ "services": rows }))
}

fn service_from_params(
    params: &serde_json::Value,
    id: String,
) -> Result<Service, HandlerErr> {
    Ok(Service {
        id,
        name: required_str(params, "name")?,
        plate: required_str(params, "plate")?,
        driver_name: required_str(params, "driverName")?,
        phone: optional_str(params, "phone").unwrap_or_default(),
        location: optional_str(params, "location").unwrap_or_default(),
    })
}

fn services_create(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let service = service_from_params(params, store::generate_id("srv"))?;
    let mut services = repo::list_services(store).map_err(store_read_err)?;
    services.push(service.clone());
    repo::save_services(store, &services).map_err(store_write_err)?;
    Ok(service_json(&service, 0))
}

fn services_update(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let service = service_from_params(params, id)?;
    let mut services = repo::list_services(store).map_err(store_read_err)?;
    if !repo::replace_service(&mut services, service.clone()) {
        return Err(HandlerErr::new("not_found", "service not found"));
    }
    repo::save_services(store, &services).map_err(store_write_err)?;
    let students = repo::list_students(store).map_err(store_read_err)?;
    let count = students.iter().filter(|st| st.service_id == service.id).count();
    Ok(service_json(&service, count))
}

fn services_delete(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let mut services = repo::list_services(store).map_err(store_read_err)?;
    if !repo::remove_service(&mut services, &id) {
        return Err(HandlerErr::new("not_found", "service not found"));
    }
    repo::save_services(store, &services).map_err(store_write_err)?;
    // Students referencing the id are left as-is; readers render the
    // tombstone label.
    Ok(json!({ "ok": true }))
}

fn services_import_csv(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(required_str(params, "path")?);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(csv_open_err)?;
    let headers = reader
        .headers()
        .map_err(|e| HandlerErr::new("parse_failed", e.to_string()))?
        .clone();
    let map = tabular::ServiceHeaders::detect(&headers);

    // Parse the whole file before touching the store so a malformed row
    // aborts the import with nothing committed.
    let mut parsed = Vec::new();
    let mut skipped: usize = 0;
    for record in reader.records() {
        let record = record.map_err(|e| HandlerErr::new("parse_failed", e.to_string()))?;
        match map.row(&record) {
            Some(row) => parsed.push(row),
            None => skipped += 1,
        }
    }

    let mut services = repo::list_services(store).map_err(store_read_err)?;
    let imported = parsed.len();
    for row in parsed {
        services.push(Service {
            id: store::generate_id("srv"),
            name: row.name,
            plate: row.plate,
            driver_name: row.driver_name,
            phone: row.phone,
            location: row.location,
        });
    }
    repo::save_services(store, &services).map_err(store_write_err)?;

    tracing::info!(imported, skipped, path = %path.display(), "service import finished");
    Ok(json!({ "imported": imported, "skipped": skipped }))
}

fn services_export_csv(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(required_str(params, "path")?);
    let services = repo::list_services(store).map_err(store_read_err)?;
    if services.is_empty() {
        return Ok(json!({ "written": false, "rows": 0 }));
    }

    let out = export::resolve_out_path(
        &path,
        &format!("Servisler_{}.csv", export::today_stamp()),
    );
    let rows: Vec<Vec<String>> = services.iter().map(tabular::service_export_row).collect();
    export::write_csv(&out, &SERVICE_EXPORT_HEADERS, &rows)
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
    Ok(json!({
        "written": true,
        "rows": rows.len(),
        "path": out.to_string_lossy(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "services.list" => store_mut(state).and_then(|s| services_list(s)),
        "services.create" => store_mut(state).and_then(|s| services_create(s, &req.params)),
        "services.update" => store_mut(state).and_then(|s| services_update(s, &req.params)),
        "services.delete" => store_mut(state).and_then(|s| services_delete(s, &req.params)),
        "services.importCsv" => store_mut(state).and_then(|s| services_import_csv(s, &req.params)),
        "services.exportCsv" => store_mut(state).and_then(|s| services_export_csv(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
