use serde_json::json;

use super::{required_date, required_str, store_mut, store_read_err, store_write_err, HandlerErr};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceEntry, AttendanceRecord};
use crate::repo;
use crate::store::Store;

/// Build the editable checklist for one (date, service) pair. New pairs
/// default every student to present for both periods; existing records are
/// merged in, and students enrolled after the record was saved fall back
/// to the same default.
fn attendance_open(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "date")?;
    let service_id = required_str(params, "serviceId")?;

    let services = repo::list_services(store).map_err(store_read_err)?;
    if repo::find_service(&services, &service_id).is_none() {
        return Err(HandlerErr::new("not_found", "service not found"));
    }

    let students = repo::list_students(store).map_err(store_read_err)?;
    let roster = repo::students_for_service(&students, &service_id);
    if roster.is_empty() {
        return Err(HandlerErr::new(
            "no_students",
            "no students enrolled in this service",
        ));
    }

    let records = repo::list_tracking(store).map_err(store_read_err)?;
    let existing = repo::find_attendance(&records, &date, &service_id);

    let rows: Vec<serde_json::Value> = roster
        .iter()
        .map(|student| {
            let entry =
                existing.and_then(|r| r.entries.iter().find(|e| e.student_id == student.id));
            json!({
                "studentId": student.id,
                "displayName": student.display_name(),
                "morning": entry.map_or(true, |e| e.morning),
                "evening": entry.map_or(true, |e| e.evening),
            })
        })
        .collect();

    Ok(json!({
        "date": date,
        "serviceId": service_id,
        "status": if existing.is_some() { "existing" } else { "new" },
        "rows": rows,
    }))
}

fn parse_entries(params: &serde_json::Value) -> Result<Vec<AttendanceEntry>, HandlerErr> {
    let Some(raw) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing entries"));
    };
    raw.iter()
        .map(|item| {
            let student_id = item
                .get("studentId")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| HandlerErr::new("bad_params", "entry missing studentId"))?;
            let morning = item
                .get("morning")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| HandlerErr::new("bad_params", "entry missing morning"))?;
            let evening = item
                .get("evening")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| HandlerErr::new("bad_params", "entry missing evening"))?;
            Ok(AttendanceEntry {
                student_id: student_id.to_string(),
                morning,
                evening,
            })
        })
        .collect()
}

/// Wholesale replace of the (date, service) record with whatever entry set
/// the client sends; students it omits are omitted from the saved record.
fn attendance_save(
    store: &mut Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "date")?;
    let service_id = required_str(params, "serviceId")?;
    let entries = parse_entries(params)?;

    let record = AttendanceRecord {
        date: date.clone(),
        service_id: service_id.clone(),
        entries,
    };
    let entry_count = record.entries.len();

    let mut records = repo::list_tracking(store).map_err(store_read_err)?;
    let replaced = repo::upsert_attendance(&mut records, record);
    repo::save_tracking(store, &records).map_err(store_write_err)?;

    tracing::debug!(%date, %service_id, entry_count, replaced, "attendance saved");
    Ok(json!({
        "status": if replaced { "replaced" } else { "created" },
        "entryCount": entry_count,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.open" => store_mut(state).and_then(|s| attendance_open(s, &req.params)),
        "attendance.save" => store_mut(state).and_then(|s| attendance_save(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
