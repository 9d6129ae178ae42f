use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_servisd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn servisd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &PathBuf) -> String {
    request_ok(
        stdin,
        reader,
        "w",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let service = request_ok(
        stdin,
        reader,
        "s1",
        "services.create",
        json!({ "name": "Kampüs 1", "plate": "06 AB 123", "driverName": "Mehmet" }),
    );
    let service_id = service["id"].as_str().expect("id").to_string();
    let ali = request_ok(
        stdin,
        reader,
        "s2",
        "students.create",
        json!({
            "firstName": "Ali", "lastName": "Demir", "className": "3-A",
            "serviceId": service_id,
        }),
    )["id"]
        .as_str()
        .expect("id")
        .to_string();
    let zeynep = request_ok(
        stdin,
        reader,
        "s3",
        "students.create",
        json!({
            "firstName": "Zeynep", "lastName": "Yurt", "className": "3-B",
            "serviceId": service_id,
        }),
    )["id"]
        .as_str()
        .expect("id")
        .to_string();

    request_ok(
        stdin,
        reader,
        "s4",
        "attendance.save",
        json!({
            "date": "2024-05-01",
            "serviceId": service_id,
            "entries": [
                { "studentId": ali, "morning": true, "evening": false },
                { "studentId": zeynep, "morning": false, "evening": true },
            ],
        }),
    );
    request_ok(
        stdin,
        reader,
        "s5",
        "attendance.save",
        json!({
            "date": "2024-05-03",
            "serviceId": service_id,
            "entries": [
                { "studentId": ali, "morning": true, "evening": true },
            ],
        }),
    );
    service_id
}

#[test]
fn report_rows_are_range_filtered_and_sorted() {
    let workspace = temp_dir("servisd-report-rows");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed(&mut stdin, &mut reader, &workspace);

    // Inclusive range that excludes the 2024-05-03 record.
    let report = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.generate",
        json!({ "startDate": "2024-05-01", "endDate": "2024-05-02" }),
    );
    assert_eq!(report["count"], json!(2));
    let rows = report["rows"].as_array().expect("rows");
    assert_eq!(rows[0]["student"], json!("Ali Demir"));
    assert_eq!(rows[0]["morning"], json!("+"));
    assert_eq!(rows[0]["evening"], json!("-"));
    assert_eq!(rows[1]["student"], json!("Zeynep Yurt"));
    assert_eq!(rows[1]["service"], json!("Kampüs 1"));

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.generate",
        json!({ "startDate": "2024-05-01", "endDate": "2024-05-03" }),
    );
    assert_eq!(report["count"], json!(3));
}

#[test]
fn csv_export_writes_conventional_file_and_empty_range_noops() {
    let workspace = temp_dir("servisd-report-csv");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed(&mut stdin, &mut reader, &workspace);

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.exportCsv",
        json!({
            "startDate": "2024-05-01",
            "endDate": "2024-05-03",
            "path": workspace.to_string_lossy(),
        }),
    );
    assert_eq!(exported["written"], json!(true));
    assert_eq!(exported["rows"], json!(3));
    let path = exported["path"].as_str().expect("path").to_string();
    assert!(path.ends_with("Rapor_2024-05-01_2024-05-03.csv"), "{path}");

    let contents = std::fs::read_to_string(&path).expect("read export");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("Tarih,Servis,Öğrenci,Sabah,Akşam"));
    assert_eq!(lines.clone().count(), 3);
    assert!(lines.next().expect("first row").starts_with("2024-05-01,Kampüs 1,Ali Demir,+,-"));

    // Empty dataset: silent no-op, no file.
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.exportCsv",
        json!({
            "startDate": "2030-01-01",
            "endDate": "2030-01-02",
            "path": workspace.to_string_lossy(),
        }),
    );
    assert_eq!(exported["written"], json!(false));
    assert!(!workspace.join("Rapor_2030-01-01_2030-01-02.csv").exists());
}

#[test]
fn pdf_export_requires_fonts_and_guards_empty_dataset() {
    let workspace = temp_dir("servisd-report-pdf");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed(&mut stdin, &mut reader, &workspace);

    // An explicit fonts dir without font files fails deterministically and
    // writes nothing.
    let empty_fonts = temp_dir("servisd-report-pdf-fonts");
    let value = request(
        &mut stdin,
        &mut reader,
        "1",
        "report.exportPdf",
        json!({
            "startDate": "2024-05-01",
            "endDate": "2024-05-03",
            "path": workspace.to_string_lossy(),
            "fontsDir": empty_fonts.to_string_lossy(),
        }),
    );
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("pdf_fonts_missing"));
    assert!(!workspace.join("Rapor_2024-05-01_2024-05-03.pdf").exists());

    // The empty-dataset guard runs before font loading.
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.exportPdf",
        json!({
            "startDate": "2030-01-01",
            "endDate": "2030-01-02",
            "path": workspace.to_string_lossy(),
            "fontsDir": empty_fonts.to_string_lossy(),
        }),
    );
    assert_eq!(exported["written"], json!(false));
}
