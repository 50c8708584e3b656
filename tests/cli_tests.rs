// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gloss-{}-{}", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

fn gloss() -> Command {
    Command::cargo_bin("gloss").unwrap()
}

const DOCUMENT: &str = r#"{
  "elements": [
    { "attribute_declaration": { "name": "product", "value": { "string": "Gloss" } } },
    { "paragraph": { "lines": [[ { "text": "Hello *{product}* {missing}" } ]] } }
  ]
}"#;

#[test]
fn selector_prints_block_defaults() {
    gloss()
        .args(["selector", "listing"])
        .assert()
        .success()
        .stdout("callouts\nspecialcharacters\nsplit_lines\n");
}

#[test]
fn selector_applies_directive() {
    gloss()
        .args(["selector", "paragraph", "--subs", "quotes,+macros"])
        .assert()
        .success()
        .stdout("quotes\nmacros\nsplit_lines\n");
}

#[test]
fn selector_rejects_unknown_kind() {
    gloss()
        .args(["selector", "table"])
        .assert()
        .code(1)
        .stderr(contains("gloss::validation").and(contains("unknown block kind")));
}

#[test]
fn inline_parses_under_a_rule() {
    gloss()
        .args(["inline", "a < b", "--rule", "SpecialCharacterSubs"])
        .assert()
        .success()
        .stdout(contains("special_character").and(contains("\"<\"")));
}

#[test]
fn subs_prints_the_draft_and_warnings() {
    let doc = write_temp("subs.json", DOCUMENT);
    gloss()
        .arg("subs")
        .arg(&doc)
        .assert()
        .success()
        .stdout(contains("\"Gloss\"").and(contains("\"bold\"")))
        .stderr(contains("cannot find attribute 'missing'"));
    let _ = fs::remove_file(doc);
}

#[test]
fn subs_honours_attribute_overrides_and_config() {
    let doc = write_temp("overrides.json", DOCUMENT);
    let config = write_temp("overrides.yaml", "attributes:\n  missing: found\n");
    gloss()
        .arg("subs")
        .arg(&doc)
        .args(["--config"])
        .arg(&config)
        .args(["-a", "product=Override"])
        .assert()
        .success()
        .stdout(contains("\"Override\"").and(contains(" found")))
        .stderr(contains("cannot find attribute").not());
    let _ = fs::remove_file(doc);
    let _ = fs::remove_file(config);
}

#[test]
fn trace_shows_each_step() {
    let doc = write_temp("trace.json", DOCUMENT);
    gloss()
        .arg("trace")
        .arg(&doc)
        .assert()
        .success()
        .stdout(contains("--- Step 0: inline_passthrough (paragraph) ---").and(contains("split_lines")));
    let _ = fs::remove_file(doc);
}

#[test]
fn invalid_document_fails_with_diagnostic() {
    let doc = write_temp("invalid.json", "{ not json");
    gloss()
        .arg("subs")
        .arg(&doc)
        .assert()
        .code(1)
        .stderr(contains("gloss::config").and(contains("invalid document")));
    let _ = fs::remove_file(doc);
}
