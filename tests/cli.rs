use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn autorule(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("autorule").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("AUTORULE_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn create_heavy_rule(home: &TempDir) {
    autorule(home)
        .args([
            "rule",
            "create",
            "Heavy",
            "--model",
            "courier-request",
            "--field",
            "weight",
            "--operator",
            ">",
            "--value",
            "20",
            "--set",
            "notes=heavy",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created rule: Heavy"));
}

#[test]
fn rule_list_starts_empty() {
    let home = TempDir::new().unwrap();

    autorule(&home)
        .args(["rule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No rules"));
}

#[test]
fn record_create_runs_matching_rule() {
    let home = TempDir::new().unwrap();
    create_heavy_rule(&home);

    autorule(&home)
        .args([
            "--user",
            "1",
            "record",
            "create",
            "courier-request",
            "--set",
            "weight=25",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notes\": \"heavy\""))
        .stdout(predicate::str::contains("\"rules_matched\": 1"));

    autorule(&home)
        .args(["rule", "show", "Heavy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution count: 1"));
}

#[test]
fn light_record_is_left_alone() {
    let home = TempDir::new().unwrap();
    create_heavy_rule(&home);

    autorule(&home)
        .args([
            "record",
            "create",
            "courier-request",
            "--set",
            "weight=2",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notes\": \"heavy\"").not());
}

#[test]
fn unsafe_custom_condition_is_rejected() {
    let home = TempDir::new().unwrap();

    autorule(&home)
        .args([
            "rule",
            "create",
            "Sneaky",
            "--model",
            "partner",
            "--condition",
            "exec(name)",
            "--set",
            "city=Paris",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dangerous keyword: exec"));

    autorule(&home)
        .args(["rule", "show", "Sneaky"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rule not found"));
}

#[test]
fn rule_self_test_uses_blank_record() {
    let home = TempDir::new().unwrap();
    create_heavy_rule(&home);

    autorule(&home)
        .args(["rule", "test", "Heavy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rule Test"))
        .stdout(predicate::str::contains("Conditions met: false"));
}

#[test]
fn toggle_disables_rule() {
    let home = TempDir::new().unwrap();
    create_heavy_rule(&home);

    autorule(&home)
        .args(["rule", "toggle", "Heavy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now inactive"));

    autorule(&home)
        .args([
            "record",
            "create",
            "courier-request",
            "--set",
            "weight=50",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notes\": \"heavy\"").not());
}

#[test]
fn export_then_import_into_fresh_home() {
    let home = TempDir::new().unwrap();
    create_heavy_rule(&home);
    let file = home.path().join("rules-export.yaml");

    autorule(&home)
        .args(["rule", "export"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 rules"));

    let other = TempDir::new().unwrap();
    autorule(&other)
        .args(["rule", "import"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 rules"));

    autorule(&other)
        .args(["rule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Heavy"));
}

#[test]
fn preferences_fill_new_courier_requests() {
    let home = TempDir::new().unwrap();

    autorule(&home)
        .args([
            "--user",
            "1",
            "prefs",
            "set",
            "--auto-fill",
            "true",
            "--automation",
            "true",
            "--priority",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preferences for user"));

    autorule(&home)
        .args(["--user", "1", "record", "create", "courier-request", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"auto_filled\": true"))
        .stdout(predicate::str::contains("priority_id"));

    autorule(&home)
        .args(["--user", "1", "record", "defaults", "courier-request"])
        .assert()
        .success()
        .stdout(predicate::str::contains("priority_id"));
}

#[test]
fn prefs_require_a_user() {
    let home = TempDir::new().unwrap();

    autorule(&home)
        .args(["prefs", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No user given"));
}

#[test]
fn completions_are_generated() {
    let home = TempDir::new().unwrap();

    autorule(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("autorule"));
}
