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
    let exe = env!("CARGO_BIN_EXE_classkeeperd");
    let mut child = Command::new(exe)
        .env_remove("CLASSKEEPER_WORKSPACE")
        .env_remove("CLASSKEEPER_TEACHER_BYPASS")
        .env_remove("CLASSKEEPER_TEACHER_BYPASS_CODE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classkeeperd");
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
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
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

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn class_codes_create_list_and_delete() {
    let workspace = temp_dir("classkeeper-class-codes");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // The admin screen renders an empty table before a workspace exists.
    let empty = request_ok(&mut stdin, &mut reader, "1", "classCodes.list", json!({}));
    assert_eq!(empty["classCodes"], json!([]));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "3", "seed.demoData", json!({}));
    let listed = request_ok(&mut stdin, &mut reader, "4", "classCodes.list", json!({}));
    assert_eq!(listed["classCodes"].as_array().map(|a| a.len()), Some(5));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classCodes.create",
        json!({ "sno": 6, "year": 11, "section": "F", "code": "CA11F006" }),
    );
    let new_id = created["classCode"]["id"].as_i64().expect("new id");

    // One duplicate sno sinks the whole batch.
    let batch = request(
        &mut stdin,
        &mut reader,
        "6",
        "classCodes.createMany",
        json!({ "classCodes": [
            { "sno": 7, "year": 11, "section": "G", "code": "CA11G007" },
            { "sno": 7, "year": 11, "section": "H", "code": "CA11H008" }
        ] }),
    );
    assert_eq!(batch["ok"], false);
    let listed = request_ok(&mut stdin, &mut reader, "7", "classCodes.list", json!({}));
    assert_eq!(listed["classCodes"].as_array().map(|a| a.len()), Some(6));

    let blank = request(
        &mut stdin,
        &mut reader,
        "8",
        "classCodes.create",
        json!({ "sno": 9, "year": 11, "section": " ", "code": "X" }),
    );
    assert_eq!(error_code(&blank), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "classCodes.delete",
        json!({ "id": new_id }),
    );
    let again = request(
        &mut stdin,
        &mut reader,
        "10",
        "classCodes.delete",
        json!({ "id": new_id }),
    );
    assert_eq!(error_code(&again), "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn roster_lookups_imports_and_marks() {
    let workspace = temp_dir("classkeeper-roster");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let no_ws = request(&mut stdin, &mut reader, "0", "subjects.list", json!({}));
    assert_eq!(error_code(&no_ws), "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "2", "seed.demoData", json!({}));

    let subjects = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.list",
        json!({ "section": "A" }),
    );
    assert_eq!(subjects["subjects"].as_array().map(|a| a.len()), Some(6));
    let by_code = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.byCode",
        json!({ "code": "2856D-96T" }),
    );
    assert_eq!(by_code["subject"]["subjectName"], "DBMS");

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "seed.importStudents",
        json!({ "students": [
            {
                "id": 16, "sno": 1, "student_name": "Bhavna Bose",
                "student_code": "B1B2B3B4B5", "parent_code": "PB1B2B3B4B5", "section": "b"
            },
            { "id": 17, "studentName": "No Codes", "section": "B" }
        ] }),
    );
    assert_eq!(imported["imported"], 1);
    assert_eq!(imported["skipped"], 1);
    let section_b = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "section": "B" }),
    );
    assert_eq!(section_b["students"][0]["studentName"], "Bhavna Bose");

    let grade = json!({ "studentId": 3, "subjectId": 4, "marks": 45, "outOf": 50 });
    let anonymous = request(&mut stdin, &mut reader, "6a", "marks.upsert", grade.clone());
    assert_eq!(error_code(&anonymous), "unauthorized");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6b",
        "session.login",
        json!({ "role": "Teacher", "code": "2856D-96T", "section": "A" }),
    );

    let mark = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "marks.upsert",
        json!({ "studentId": 3, "subjectId": 4, "marks": 45, "outOf": 50 }),
    );
    assert_eq!(mark["mark"]["grade"], "A+");
    let marks = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "marks.forStudent",
        json!({ "studentId": 3 }),
    );
    assert_eq!(marks["marks"][0]["subject"], "DBMS");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "session.login",
        json!({ "role": "Admin", "code": "admin" }),
    );
    let admin = request_ok(&mut stdin, &mut reader, "10", "dashboard.admin", json!({}));
    assert_eq!(admin["counts"]["students"], 16);
    assert_eq!(admin["counts"]["classCodes"], 5);
    assert_eq!(admin["counts"]["attendance"], 0);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
