use serde_json::json;

use super::{optional_str, required_date, required_str, store_mut, store_read_err, HandlerErr};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::DELETED_STUDENT_LABEL;
use crate::pivot;
use crate::repo;
use crate::store::Store;

fn archive_pivot(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = optional_str(params, "date");
    let service_id = optional_str(params, "serviceId");

    let records = repo::list_tracking(store).map_err(store_read_err)?;
    let students = repo::list_students(store).map_err(store_read_err)?;
    let filtered = pivot::filter_records(&records, date.as_deref(), service_id.as_deref());
    let table = pivot::build_pivot(&filtered, &students);

    Ok(json!({
        "dates": table.dates,
        "rows": table.rows,
        "empty": table.rows.is_empty(),
    }))
}

fn archive_records(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = optional_str(params, "date");
    let service_id = optional_str(params, "serviceId");

    let records = repo::list_tracking(store).map_err(store_read_err)?;
    let services = repo::list_services(store).map_err(store_read_err)?;
    let filtered = pivot::filter_records(&records, date.as_deref(), service_id.as_deref());
    let summaries = pivot::summarize_records(&filtered, &services);

    Ok(json!({ "records": summaries }))
}

fn archive_record_detail(
    store: &Store,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "date")?;
    let service_id = required_str(params, "serviceId")?;

    let records = repo::list_tracking(store).map_err(store_read_err)?;
    let Some(record) = repo::find_attendance(&records, &date, &service_id) else {
        return Err(HandlerErr::new("not_found", "no record for this date and service"));
    };

    let students = repo::list_students(store).map_err(store_read_err)?;
    let entries: Vec<serde_json::Value> = record
        .entries
        .iter()
        .map(|entry| {
            let display_name = repo::find_student(&students, &entry.student_id)
                .map(|s| s.display_name())
                .unwrap_or_else(|| DELETED_STUDENT_LABEL.to_string());
            json!({
                "studentId": entry.student_id,
                "displayName": display_name,
                "morning": entry.morning,
                "evening": entry.evening,
            })
        })
        .collect();

    Ok(json!({
        "date": record.date,
        "serviceId": record.service_id,
        "entries": entries,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "archive.pivot" => store_mut(state).and_then(|s| archive_pivot(s, &req.params)),
        "archive.records" => store_mut(state).and_then(|s| archive_records(s, &req.params)),
        "archive.recordDetail" => {
            store_mut(state).and_then(|s| archive_record_detail(s, &req.params))
        }
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    })
}
