use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

const COUNTER: &str = r#"
component Main {
    mut int count = 0;
    def inc() : void { count += 1; }
    style { button { color: red; } }
    view {
        <button onclick={inc}>Add</button>
    }
}
app { title = "Counter"; }
"#;

#[test]
fn build_writes_outputs_next_to_source() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("app.coi");
    fs::write(&src, COUNTER).unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("build").arg(&src);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Generated"));

    let cpp = fs::read_to_string(dir.path().join("app.cc")).unwrap();
    assert!(cpp.contains("struct Main {"));
    assert!(cpp.contains("g_dispatcher"));
    let css = fs::read_to_string(dir.path().join("app.css")).unwrap();
    assert!(css.contains("button[coi-scope=\"Main\"]"));
    let html = fs::read_to_string(dir.path().join("index.template.html")).unwrap();
    assert!(html.contains("<title>Counter</title>"));
}

#[test]
fn build_directory_bundles_styles_from_project_root() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("widgets")).unwrap();
    fs::create_dir_all(dir.path().join("styles")).unwrap();
    fs::write(dir.path().join("styles").join("base.css"), "body { margin: 0; }").unwrap();
    fs::write(src.join("main.coi"), "component Main { view { <Card/> } }").unwrap();
    fs::write(
        src.join("widgets").join("card.coi"),
        "component Card { view { <div>card</div> } }",
    )
    .unwrap();
    let out = dir.path().join("build");

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("build").arg(&src).arg("--out-dir").arg(&out);
    cmd.assert().success();

    let cpp = fs::read_to_string(out.join("app.cc")).unwrap();
    assert!(cpp.contains("struct Card {"));
    let css = fs::read_to_string(out.join("app.css")).unwrap();
    assert!(css.starts_with("/* styles/base.css */\nbody { margin: 0; }\n"));
}

#[test]
fn build_accepts_extra_headers() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("app.coi");
    fs::write(&src, "component Main { }").unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("build").arg(&src).arg("--headers").arg("websocket,fetch");
    cmd.assert().success();

    let cpp = fs::read_to_string(dir.path().join("app.cc")).unwrap();
    assert!(cpp.contains("#include \"webcc/websocket.h\""));
    assert!(cpp.contains("#include \"webcc/fetch.h\""));
}

#[test]
fn parse_error_is_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.coi");
    fs::write(&bad, "component Main {\n").unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("check").arg(&bad);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn check_reports_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("widget.coi");
    fs::write(&src, "component Widget { }").unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("check").arg(&src);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No root component defined"));
}

#[test]
fn check_ok() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("app.coi");
    fs::write(&src, COUNTER).unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("check").arg(&src);
    cmd.assert().success().stderr(predicate::str::contains("ok:"));
    assert!(!dir.path().join("app.cc").exists());
}

#[test]
fn missing_input_is_nonzero() {
    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("build").arg("does/not/exist.coi");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn gen_defs_writes_definition_files() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    fs::write(
        &schema,
        r#"{ "commands": [
            { "ns": "storage", "func_name": "set_item",
              "params": [{ "type": "string", "name": "key" }, { "type": "string", "name": "value" }],
              "return_type": "" }
        ] }"#,
    )
    .unwrap();
    let out = dir.path().join("def").join("web");

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("gen-defs").arg(&schema).arg("--out-dir").arg(&out);
    cmd.assert().success();

    let storage = fs::read_to_string(out.join("storage.d.coi")).unwrap();
    assert!(storage.contains("shared def setItem(string key, string value): void"));
    assert!(out.join("index.d.coi").exists());
}

#[test]
fn gen_defs_rejects_bad_schema() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    fs::write(&schema, "{ \"commands\": 7 }").unwrap();

    let mut cmd = Command::cargo_bin("coi").unwrap();
    cmd.arg("gen-defs").arg(&schema).arg("--out-dir").arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid schema"));
}
