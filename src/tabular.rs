//! Header-flexible mapping between the stored entities and the tabular
//! workbook rows used for import/export. Exported files use the literal
//! Turkish headers; the import side additionally accepts the ASCII and
//! camelCase spellings that circulate in hand-edited sheets.

use csv::StringRecord;

use crate::model::{Service, Student};
use crate::repo;

pub const SERVICE_EXPORT_HEADERS: [&str; 6] = [
    "Servis Adı",
    "Plaka",
    "Şoför Adı",
    "Telefon",
    "Konum",
    "Servis ID",
];

pub const STUDENT_EXPORT_HEADERS: [&str; 8] = [
    "Ad",
    "Soyad",
    "Okul No",
    "Sınıf",
    "Veli Adı",
    "Veli Telefon",
    "Servis",
    "Servis Plaka",
];

pub const REPORT_EXPORT_HEADERS: [&str; 5] = ["Tarih", "Servis", "Öğrenci", "Sabah", "Akşam"];

fn header_index(headers: &StringRecord, variants: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| variants.iter().any(|v| h.trim() == *v))
}

fn cell(record: &StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRow {
    pub name: String,
    pub plate: String,
    pub driver_name: String,
    pub phone: String,
    pub location: String,
}

#[derive(Debug)]
pub struct ServiceHeaders {
    name: Option<usize>,
    plate: Option<usize>,
    driver: Option<usize>,
    phone: Option<usize>,
    location: Option<usize>,
}

impl ServiceHeaders {
    pub fn detect(headers: &StringRecord) -> Self {
        ServiceHeaders {
            name: header_index(headers, &["Servis Adı", "ServisAdi", "servisAdi"]),
            plate: header_index(headers, &["Plaka", "plaka"]),
            driver: header_index(headers, &["Şoför Adı", "SoforAdi", "soforAdi"]),
            phone: header_index(headers, &["Telefon", "telefon"]),
            location: header_index(headers, &["Konum", "konum"]),
        }
    }

    /// None when a required field (name, plate, driver) is missing; the
    /// caller counts the row as skipped.
    pub fn row(&self, record: &StringRecord) -> Option<ServiceRow> {
        let row = ServiceRow {
            name: cell(record, self.name),
            plate: cell(record, self.plate),
            driver_name: cell(record, self.driver),
            phone: cell(record, self.phone),
            location: cell(record, self.location),
        };
        if row.name.is_empty() || row.plate.is_empty() || row.driver_name.is_empty() {
            return None;
        }
        Some(row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub first_name: String,
    pub last_name: String,
    pub school_no: String,
    pub class_name: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub service_name: String,
    pub service_plate: String,
}

#[derive(Debug)]
pub struct StudentHeaders {
    first: Option<usize>,
    last: Option<usize>,
    school_no: Option<usize>,
    class: Option<usize>,
    guardian: Option<usize>,
    guardian_phone: Option<usize>,
    service_name: Option<usize>,
    service_plate: Option<usize>,
}

impl StudentHeaders {
    pub fn detect(headers: &StringRecord) -> Self {
        StudentHeaders {
            first: header_index(headers, &["Ad", "ad"]),
            last: header_index(headers, &["Soyad", "soyad"]),
            school_no: header_index(headers, &["Okul No", "OkulNo", "okulNo"]),
            class: header_index(headers, &["Sınıf", "Sinif", "sinif"]),
            guardian: header_index(headers, &["Veli Adı", "VeliAdi", "veliAdi"]),
            guardian_phone: header_index(headers, &["Veli Telefon", "VeliTelefon", "veliTelefon"]),
            service_name: header_index(headers, &["Servis", "servis"]),
            service_plate: header_index(headers, &["Servis Plaka", "ServisPlaka", "Plaka", "plaka"]),
        }
    }

    pub fn row(&self, record: &StringRecord) -> Option<StudentRow> {
        let row = StudentRow {
            first_name: cell(record, self.first),
            last_name: cell(record, self.last),
            school_no: cell(record, self.school_no),
            class_name: cell(record, self.class),
            guardian_name: cell(record, self.guardian),
            guardian_phone: cell(record, self.guardian_phone),
            service_name: cell(record, self.service_name),
            service_plate: cell(record, self.service_plate),
        };
        if row.first_name.is_empty() || row.last_name.is_empty() || row.class_name.is_empty() {
            return None;
        }
        Some(row)
    }
}

/// Imported rows carry the service as plate and/or name, not as an id.
/// Plate wins over name; no match leaves the student unassigned.
pub fn resolve_service_id(services: &[Service], plate: &str, name: &str) -> String {
    if !plate.is_empty() {
        if let Some(s) = services.iter().find(|s| s.plate == plate) {
            return s.id.clone();
        }
    }
    if !name.is_empty() {
        if let Some(s) = services.iter().find(|s| s.name == name) {
            return s.id.clone();
        }
    }
    String::new()
}

pub fn service_export_row(service: &Service) -> Vec<String> {
    vec![
        service.name.clone(),
        service.plate.clone(),
        service.driver_name.clone(),
        service.phone.clone(),
        service.location.clone(),
        service.id.clone(),
    ]
}

/// Service name and plate are denormalized into the row so the sheet is
/// readable on its own and re-importable against a rebuilt registry.
pub fn student_export_row(student: &Student, services: &[Service]) -> Vec<String> {
    let service = repo::find_service(services, &student.service_id);
    vec![
        student.first_name.clone(),
        student.last_name.clone(),
        student.school_no.clone(),
        student.class_name.clone(),
        student.guardian_name.clone(),
        student.guardian_phone.clone(),
        service.map(|s| s.name.clone()).unwrap_or_default(),
        service.map(|s| s.plate.clone()).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn service(id: &str, name: &str, plate: &str) -> Service {
        Service {
            id: id.to_string(),
            name: name.to_string(),
            plate: plate.to_string(),
            driver_name: "Şoför".to_string(),
            phone: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn service_headers_accept_turkish_and_ascii_variants() {
        let turkish = record(&["Servis Adı", "Plaka", "Şoför Adı", "Telefon", "Konum"]);
        let ascii = record(&["servisAdi", "plaka", "SoforAdi"]);
        for headers in [turkish, ascii] {
            let map = ServiceHeaders::detect(&headers);
            let row = map
                .row(&record(&["Kampüs 1", "06 AB 123", "Mehmet Öz", "", ""]))
                .expect("required fields present");
            assert_eq!(row.name, "Kampüs 1");
            assert_eq!(row.plate, "06 AB 123");
            assert_eq!(row.driver_name, "Mehmet Öz");
        }
    }

    #[test]
    fn service_row_missing_required_field_is_skipped() {
        let map = ServiceHeaders::detect(&record(&["Servis Adı", "Plaka", "Şoför Adı"]));
        assert!(map.row(&record(&["Kampüs 1", "  ", "Mehmet"])).is_none());
        assert!(map.row(&record(&["", "06 AB 1", "Mehmet"])).is_none());
    }

    #[test]
    fn student_headers_accept_variants_and_require_name_and_class() {
        let map = StudentHeaders::detect(&record(&["ad", "soyad", "Sinif", "OkulNo"]));
        let row = map
            .row(&record(&["Ali", "Demir", "3-A", "101"]))
            .expect("valid row");
        assert_eq!(row.class_name, "3-A");
        assert_eq!(row.school_no, "101");
        assert!(map.row(&record(&["Ali", "Demir", "", "101"])).is_none());
    }

    #[test]
    fn bare_plaka_header_counts_as_student_service_plate() {
        let map = StudentHeaders::detect(&record(&["Ad", "Soyad", "Sınıf", "Plaka"]));
        let row = map
            .row(&record(&["Ali", "Demir", "3-A", "06 AB 123"]))
            .expect("valid row");
        assert_eq!(row.service_plate, "06 AB 123");
    }

    #[test]
    fn resolve_prefers_plate_then_name_then_unassigned() {
        let services = vec![
            service("srv_1", "Kampüs 1", "06 AB 123"),
            service("srv_2", "Kampüs 2", "34 CD 456"),
        ];
        assert_eq!(resolve_service_id(&services, "34 CD 456", "Kampüs 1"), "srv_2");
        assert_eq!(resolve_service_id(&services, "", "Kampüs 1"), "srv_1");
        assert_eq!(resolve_service_id(&services, "99 XX 1", "Bilinmez"), "");
    }

    #[test]
    fn export_rows_follow_fixed_column_order() {
        let services = vec![service("srv_1", "Kampüs 1", "06 AB 123")];
        let student = Student {
            id: "ogr_1".to_string(),
            first_name: "Ali".to_string(),
            last_name: "Demir".to_string(),
            school_no: "101".to_string(),
            class_name: "3-A".to_string(),
            guardian_name: "Veli Demir".to_string(),
            guardian_phone: "0500".to_string(),
            service_id: "srv_1".to_string(),
        };
        assert_eq!(
            student_export_row(&student, &services),
            vec!["Ali", "Demir", "101", "3-A", "Veli Demir", "0500", "Kampüs 1", "06 AB 123"]
        );
        assert_eq!(
            service_export_row(&services[0]),
            vec!["Kampüs 1", "06 AB 123", "Şoför", "", "", "srv_1"]
        );
    }
}
