use crate::model::{AttendanceRecord, Service, Student};
use crate::store::Store;

pub const SERVICES_KEY: &str = "services";
pub const STUDENTS_KEY: &str = "students";
pub const TRACKING_KEY: &str = "tracking";

pub fn list_services(store: &Store) -> anyhow::Result<Vec<Service>> {
    store.get_json(SERVICES_KEY)
}

pub fn save_services(store: &mut Store, services: &[Service]) -> anyhow::Result<()> {
    store.set_json(SERVICES_KEY, &services)
}

pub fn list_students(store: &Store) -> anyhow::Result<Vec<Student>> {
    store.get_json(STUDENTS_KEY)
}

pub fn save_students(store: &mut Store, students: &[Student]) -> anyhow::Result<()> {
    store.set_json(STUDENTS_KEY, &students)
}

pub fn list_tracking(store: &Store) -> anyhow::Result<Vec<AttendanceRecord>> {
    store.get_json(TRACKING_KEY)
}

pub fn save_tracking(store: &mut Store, records: &[AttendanceRecord]) -> anyhow::Result<()> {
    store.set_json(TRACKING_KEY, &records)
}

pub fn find_service<'a>(services: &'a [Service], id: &str) -> Option<&'a Service> {
    services.iter().find(|s| s.id == id)
}

pub fn find_student<'a>(students: &'a [Student], id: &str) -> Option<&'a Student> {
    students.iter().find(|s| s.id == id)
}

/// Full replace by id; false when the id is not present (last write wins
/// when ids are duplicated, only the first match is touched).
pub fn replace_service(services: &mut [Service], service: Service) -> bool {
    match services.iter_mut().find(|s| s.id == service.id) {
        Some(slot) => {
            *slot = service;
            true
        }
        None => false,
    }
}

pub fn replace_student(students: &mut [Student], student: Student) -> bool {
    match students.iter_mut().find(|s| s.id == student.id) {
        Some(slot) => {
            *slot = student;
            true
        }
        None => false,
    }
}

/// Delete by filtering; false when nothing matched. Students referencing a
/// removed service keep their dangling id.
pub fn remove_service(services: &mut Vec<Service>, id: &str) -> bool {
    let before = services.len();
    services.retain(|s| s.id != id);
    services.len() != before
}

pub fn remove_student(students: &mut Vec<Student>, id: &str) -> bool {
    let before = students.len();
    students.retain(|s| s.id != id);
    students.len() != before
}

pub fn students_for_service<'a>(students: &'a [Student], service_id: &str) -> Vec<&'a Student> {
    students
        .iter()
        .filter(|s| s.service_id == service_id)
        .collect()
}

pub fn find_attendance<'a>(
    records: &'a [AttendanceRecord],
    date: &str,
    service_id: &str,
) -> Option<&'a AttendanceRecord> {
    records
        .iter()
        .find(|r| r.date == date && r.service_id == service_id)
}

/// Replace the record for (date, service_id) wholesale, appending when the
/// pair has no record yet. Returns true when an existing record was
/// replaced. Keeps the (date, service_id) uniqueness invariant.
pub fn upsert_attendance(records: &mut Vec<AttendanceRecord>, record: AttendanceRecord) -> bool {
    match records
        .iter_mut()
        .find(|r| r.date == record.date && r.service_id == record.service_id)
    {
        Some(slot) => {
            *slot = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    }
}
