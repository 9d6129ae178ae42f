use std::path::PathBuf;

use serde_json::json;

use super::{
    csv_open_err, optional_str, required_str, store_mut, store_read_err, store_write_err,
    HandlerErr,
};
use crate::export;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::{Service, Student, DELETED_SERVICE_LABEL};
use crate::repo;
use crate::store::{self, Store};
use crate::tabular::{self, STUDENT_EXPORT_HEADERS};

fn service_label(services: &[Service], service_id: &str) -> String {
    repo::find_service(services, service_id)
        .map(Service::label)
        .unwrap_or_else(|| DELETED_SERVICE_LABEL.to_string())
}

fn student_json(student: &Student, services: &[Service]) -> serde_json::Value {
    json!({
        "id": student.id,
        "firstName": student.first_name,
        "lastName": student.last_name,
        "schoolNo": student.school_no,
        "className": student.class_name,
        "guardianName": student.guardian_name,
        "guardianPhone": student.guardian_phone,
        "serviceId": student.service_id,
        "serviceLabel": service_label(services, &student.service_id),
    })
}

fn students_list(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let filter = optional_str(params, "serviceId");
    let students = repo::list_students(store).map_err(store_read_err)?;
    let services = repo::list_services(store).map_err(store_read_err)?;
    let rows: Vec<serde_json::Value> = students
        .iter()
        .filter(|s| filter.as_deref().map_or(true, |f| s.service_id == f))
        .map(|s| student_json(s, &services))
        .collect();
    Ok(json!({ "students": rows }))
}

fn student_from_params(
    params: &serde_json::Value,
    id: String,
) -> Result<Student, HandlerErr> {
    Ok(Student {
        id,
        first_name: required_str(params, "firstName")?,
        last_name: required_str(params, "lastName")?,
        school_no: optional_str(params, "schoolNo").unwrap_or_default(),
        class_name: required_str(params, "className")?,
        guardian_name: optional_str(params, "guardianName").unwrap_or_default(),
        guardian_phone: optional_str(params, "guardianPhone").unwrap_or_default(),
        service_id: optional_str(params, "serviceId").unwrap_or_default(),
    })
}

fn students_create(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student = student_from_params(params, store::generate_id("ogr"))?;
    let mut students = repo::list_students(store).map_err(store_read_err)?;
    students.push(student.clone());
    repo::save_students(store, &students).map_err(store_write_err)?;
    let services = repo::list_services(store).map_err(store_read_err)?;
    Ok(student_json(&student, &services))
}

fn students_update(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let student = student_from_params(params, id)?;
    let mut students = repo::list_students(store).map_err(store_read_err)?;
    if !repo::replace_student(&mut students, student.clone()) {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    repo::save_students(store, &students).map_err(store_write_err)?;
    let services = repo::list_services(store).map_err(store_read_err)?;
    Ok(student_json(&student, &services))
}

fn students_delete(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let mut students = repo::list_students(store).map_err(store_read_err)?;
    if !repo::remove_student(&mut students, &id) {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    repo::save_students(store, &students).map_err(store_write_err)?;
    // Attendance entries keep the dangling id; the archive renders the
    // tombstone label for them.
    Ok(json!({ "ok": true }))
}

fn students_import_csv(
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
    let map = tabular::StudentHeaders::detect(&headers);

    let mut parsed = Vec::new();
    let mut skipped: usize = 0;
    for record in reader.records() {
        let record = record.map_err(|e| HandlerErr::new("parse_failed", e.to_string()))?;
        match map.row(&record) {
            Some(row) => parsed.push(row),
            None => skipped += 1,
        }
    }

    let services = repo::list_services(store).map_err(store_read_err)?;
    let mut students = repo::list_students(store).map_err(store_read_err)?;
    let imported = parsed.len();
    for row in parsed {
        let service_id =
            tabular::resolve_service_id(&services, &row.service_plate, &row.service_name);
        students.push(Student {
            id: store::generate_id("ogr"),
            first_name: row.first_name,
            last_name: row.last_name,
            school_no: row.school_no,
            class_name: row.class_name,
            guardian_name: row.guardian_name,
            guardian_phone: row.guardian_phone,
            service_id,
        });
    }
    repo::save_students(store, &students).map_err(store_write_err)?;

    tracing::info!(imported, skipped, path = %path.display(), "student import finished");
    Ok(json!({ "imported": imported, "skipped": skipped }))
}

fn students_export_csv(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(required_str(params, "path")?);
    let students = repo::list_students(store).map_err(store_read_err)?;
    if students.is_empty() {
        return Ok(json!({ "written": false, "rows": 0 }));
    }

    let services = repo::list_services(store).map_err(store_read_err)?;
    let out = export::resolve_out_path(
        &path,
        &format!("Ogrenciler_{}.csv", export::today_stamp()),
    );
    let rows: Vec<Vec<String>> = students
        .iter()
        .map(|s| tabular::student_export_row(s, &services))
        .collect();
    export::write_csv(&out, &STUDENT_EXPORT_HEADERS, &rows)
        .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
    Ok(json!({
        "written": true,
        "rows": rows.len(),
        "path": out.to_string_lossy(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => store_mut(state).and_then(|s| students_list(s, &req.params)),
        "students.create" => store_mut(state).and_then(|s| students_create(s, &req.params)),
        "students.update" => store_mut(state).and_then(|s| students_update(s, &req.params)),
        "students.delete" => store_mut(state).and_then(|s| students_delete(s, &req.params)),
        "students.importCsv" => store_mut(state).and_then(|s| students_import_csv(s, &req.params)),
        "students.exportCsv" => store_mut(state).and_then(|s| students_export_csv(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
