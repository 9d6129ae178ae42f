//! Pure reshaping of flat attendance records into the archive pivot, the
//! per-record summaries and the flat report rows. No store access here so
//! everything is unit-testable on in-memory fixtures.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{
    AttendanceRecord, Service, Student, DELETED_STUDENT_LABEL, UNKNOWN_SERVICE_LABEL,
    UNKNOWN_SERVICE_NAME,
};
use crate::repo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub morning: bool,
    pub evening: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub student_id: String,
    pub display_name: String,
    pub school_no: String,
    pub class_name: String,
    /// date -> cell; None renders as "no data", which is distinct from a
    /// stored absent/absent entry.
    pub cells: BTreeMap<String, Option<DayCell>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotTable {
    pub dates: Vec<String>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub date: String,
    pub service_id: String,
    pub service_label: String,
    pub student_count: usize,
    pub present_count: usize,
}

/// One flattened report line; morning/evening already carry the on-screen
/// "+"/"-" glyphs so CSV and PDF output match the table exactly.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub date: String,
    pub service: String,
    pub student: String,
    pub morning: String,
    pub evening: String,
}

/// Both filters AND together; None means no constraint.
pub fn filter_records<'a>(
    records: &'a [AttendanceRecord],
    date: Option<&str>,
    service_id: Option<&str>,
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|r| date.map_or(true, |d| r.date == d))
        .filter(|r| service_id.map_or(true, |s| r.service_id == s))
        .collect()
}

const TURKISH_ALPHABET: &str = "abcçdefgğhıijklmnoöprsştuüvyz";

fn turkish_lowercase(c: char) -> char {
    // Dotted/dotless I casing is the one pair std lowercasing gets wrong
    // for Turkish text.
    match c {
        'I' => 'ı',
        'İ' => 'i',
        _ => c.to_lowercase().next().unwrap_or(c),
    }
}

/// Collation key matching the Turkish alphabet order, standing in for the
/// browser's locale-aware compare. Characters outside the alphabet sort
/// after it by code point.
pub fn turkish_sort_key(s: &str) -> Vec<u32> {
    s.chars()
        .map(turkish_lowercase)
        .map(|c| match TURKISH_ALPHABET.chars().position(|a| a == c) {
            Some(i) => i as u32,
            None => 1000 + c as u32,
        })
        .collect()
}

fn pivot_sort_key(students: &[Student], student_id: &str) -> Vec<u32> {
    let composite = match repo::find_student(students, student_id) {
        Some(s) => format!("{} {}", s.last_name, s.first_name),
        None => DELETED_STUDENT_LABEL.to_string(),
    };
    turkish_sort_key(&composite)
}

/// Reshape the filtered records into a student × date matrix. Dates ascend;
/// rows sort by (lastName, firstName). Students referenced only by old
/// records keep a tombstone row.
pub fn build_pivot(records: &[&AttendanceRecord], students: &[Student]) -> PivotTable {
    let dates: BTreeSet<String> = records.iter().map(|r| r.date.clone()).collect();

    let mut cells_by_student: BTreeMap<String, BTreeMap<String, Option<DayCell>>> =
        BTreeMap::new();
    for record in records {
        for entry in &record.entries {
            cells_by_student
                .entry(entry.student_id.clone())
                .or_default()
                .insert(
                    record.date.clone(),
                    Some(DayCell {
                        morning: entry.morning,
                        evening: entry.evening,
                    }),
                );
        }
    }

    let mut rows: Vec<PivotRow> = cells_by_student
        .into_iter()
        .map(|(student_id, mut cells)| {
            for date in &dates {
                cells.entry(date.clone()).or_insert(None);
            }
            let (display_name, school_no, class_name) =
                match repo::find_student(students, &student_id) {
                    Some(s) => (s.display_name(), s.school_no.clone(), s.class_name.clone()),
                    None => (DELETED_STUDENT_LABEL.to_string(), String::new(), String::new()),
                };
            PivotRow {
                student_id,
                display_name,
                school_no,
                class_name,
                cells,
            }
        })
        .collect();
    rows.sort_by_cached_key(|row| pivot_sort_key(students, &row.student_id));

    PivotTable {
        dates: dates.into_iter().collect(),
        rows,
    }
}

/// One line per record, newest date first.
pub fn summarize_records(
    records: &[&AttendanceRecord],
    services: &[Service],
) -> Vec<RecordSummary> {
    let mut summaries: Vec<RecordSummary> = records
        .iter()
        .map(|record| {
            let service_label = repo::find_service(services, &record.service_id)
                .map(Service::label)
                .unwrap_or_else(|| UNKNOWN_SERVICE_LABEL.to_string());
            RecordSummary {
                date: record.date.clone(),
                service_id: record.service_id.clone(),
                service_label,
                student_count: record.entries.len(),
                present_count: record
                    .entries
                    .iter()
                    .filter(|e| e.morning || e.evening)
                    .count(),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.date.cmp(&a.date));
    summaries
}

fn presence_glyph(present: bool) -> String {
    if present { "+" } else { "-" }.to_string()
}

/// Flatten records in [start, end] (inclusive, ISO date string compare)
/// into report rows sorted by (date, service, student). Entries whose
/// student no longer exists are dropped, matching the on-screen report.
pub fn build_report(
    records: &[AttendanceRecord],
    students: &[Student],
    services: &[Service],
    start: &str,
    end: &str,
    service_id: Option<&str>,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = Vec::new();
    for record in records {
        if record.date.as_str() < start || record.date.as_str() > end {
            continue;
        }
        if let Some(wanted) = service_id {
            if record.service_id != wanted {
                continue;
            }
        }
        let service_name = repo::find_service(services, &record.service_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| UNKNOWN_SERVICE_NAME.to_string());
        for entry in &record.entries {
            let Some(student) = repo::find_student(students, &entry.student_id) else {
                continue;
            };
            rows.push(ReportRow {
                date: record.date.clone(),
                service: service_name.clone(),
                student: student.display_name(),
                morning: presence_glyph(entry.morning),
                evening: presence_glyph(entry.evening),
            });
        }
    }
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.service.cmp(&b.service))
            .then_with(|| a.student.cmp(&b.student))
    });
    rows
}
