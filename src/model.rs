use serde::{Deserialize, Serialize};

/// Fallback labels for references whose target no longer exists. The stored
/// data keeps the dangling id; only the rendering layer substitutes these.
pub const DELETED_SERVICE_LABEL: &str = "Servis Silinmiş";
pub const UNKNOWN_SERVICE_LABEL: &str = "Bilinmeyen Servis";
pub const UNKNOWN_SERVICE_NAME: &str = "Bilinmiyor";
pub const DELETED_STUDENT_LABEL: &str = "Silinmiş Öğrenci";

/// A shuttle vehicle/route with its assigned driver. `id` is always a
/// generated surrogate; `plate` is a plain business field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub plate: String,
    pub driver_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
}

impl Service {
    /// Dropdown/report label, e.g. "Kampüs 1 (34 ABC 123)".
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.plate)
    }
}

/// A rider enrolled in one service. `service_id` may dangle after the
/// service is deleted; readers render a tombstone label instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub school_no: String,
    pub class_name: String,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub guardian_phone: String,
    #[serde(default)]
    pub service_id: String,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: String,
    pub morning: bool,
    pub evening: bool,
}

/// Saved presence state of one service's students on one calendar date.
/// At most one record exists per (date, service_id); saves replace the
/// whole entry list, there is no per-student history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub date: String,
    pub service_id: String,
    pub entries: Vec<AttendanceEntry>,
}
