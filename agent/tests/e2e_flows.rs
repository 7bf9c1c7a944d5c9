#![cfg(unix)]

mod common;

use common::{TestEnv, CLEAN, FLAGGED};
use predicates::prelude::*;
use std::fs;
use std::time::{Duration, Instant};

/// Fake `dpkg-query` that never answers in time
const SLOW_DPKG_QUERY: &str = "#!/bin/sh\nPATH=/usr/bin:/bin\nexec sleep 5\n";

/// Fake `dpkg-query` that answers but leaves a background process on its pipes
const LINGERING_DPKG_QUERY: &str =
    "#!/bin/sh\nPATH=/usr/bin:/bin\nsleep 5 &\necho \"fake-pkg: $2\"\n";

#[test]
fn single_flagged_file_reports_grant_and_owner() {
    let env = TestEnv::new();
    let conf = env.write_etc(
        "foo.conf",
        r#"<busconfig><policy context="default"><allow own="org.foo.Bar"/></policy></busconfig>"#,
    );

    env.cmd()
        .assert()
        .code(0)
        .stdout(predicate::str::contains(format!(
            "ConfFile: {}",
            conf.display()
        )))
        .stdout(predicate::str::contains("Packages: fake-pkg other-pkg"))
        .stdout(predicate::str::contains("AllowOwnInDefaultPolicy: org.foo.Bar"))
        .stdout(predicate::str::contains("Summary:").not());
}

#[test]
fn single_clean_file_reports_no_findings() {
    let env = TestEnv::new();
    env.write_etc("clean.conf", CLEAN);

    env.cmd()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Findings: (none)"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn parse_error_is_counted_and_sets_exit_one() {
    let env = TestEnv::new();
    env.write_etc("a.conf", FLAGGED);
    env.write_usr(
        "b.conf",
        r#"<busconfig><policy context="default"><allow own="org.b.One"/><allow own="org.b.Two"/></policy></busconfig>"#,
    );
    env.write_usr("broken.conf", "<busconfig><policy");

    env.cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Summary: total=3 ok=2 error=1 flagged=2 findings=3",
        ))
        .stderr(predicate::str::contains("ERROR: xml parse error"));
}

#[test]
fn both_directories_missing_fails_naming_them() {
    let env = TestEnv::new();
    let gone_etc = env.bin.join("no-etc");
    let gone_usr = env.bin.join("no-usr");

    env.cmd_with_dirs(&gone_etc, &gone_usr)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(gone_etc.display().to_string()))
        .stderr(predicate::str::contains(gone_usr.display().to_string()));
}

#[test]
fn unowned_file_has_unknown_packages() {
    let env = TestEnv::new();
    env.write_etc("unowned.conf", FLAGGED);

    env.cmd()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Packages: (unknown)"))
        .stdout(predicate::str::contains("AllowOwnInDefaultPolicy: org.foo.Bar"));
}

#[test]
fn failing_lookup_is_a_per_file_error() {
    let env = TestEnv::new();
    env.write_etc("a.conf", FLAGGED);
    env.write_etc("locked.conf", FLAGGED);

    env.cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Summary: total=2 ok=1 error=1 flagged=1 findings=1",
        ))
        .stderr(predicate::str::contains("ERROR: dpkg-query: error: database is locked"));
}

#[test]
fn missing_dpkg_query_exits_127() {
    let env = TestEnv::without_dpkg();
    env.write_etc("a.conf", FLAGGED);

    env.cmd()
        .assert()
        .code(127)
        .stderr(predicate::str::contains("ERROR: dpkg-query not found in PATH"));
}

#[test]
fn missing_dpkg_query_is_harmless_without_findings() {
    let env = TestEnv::without_dpkg();
    env.write_etc("clean.conf", CLEAN);

    env.cmd().assert().code(0);
}

#[test]
fn missing_directory_warns_and_continues() {
    let env = TestEnv::new();
    env.write_etc("clean.conf", CLEAN);
    fs::remove_dir_all(&env.usr).expect("remove usr dir");

    env.cmd()
        .assert()
        .code(0)
        .stderr(predicate::str::contains(format!(
            "WARNING: directory not found: {}",
            env.usr.display()
        )));
}

#[test]
fn other_suffixes_are_ignored() {
    let env = TestEnv::new();
    env.write_etc("a.conf", CLEAN);
    env.write_etc("b.conf.dpkg-old", FLAGGED);
    env.write_etc("README", "not xml");

    env.cmd()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Findings: (none)"));
}

#[test]
fn json_report_lists_every_file() {
    let env = TestEnv::new();
    let flagged = env.write_etc("a.conf", FLAGGED);
    let clean = env.write_usr("b.conf", CLEAN);

    let (json, code) = env.run_json(&[]);
    assert_eq!(code, 0);

    let results = json["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["conf_file"], flagged.display().to_string());
    assert_eq!(results[0]["status"], "ok");
    assert_eq!(results[0]["flagged"], true);
    assert_eq!(results[0]["findings_count"], 1);
    assert_eq!(
        results[0]["allow_own_in_default_policy"],
        serde_json::json!(["org.foo.Bar"])
    );
    assert_eq!(
        results[0]["packages"],
        serde_json::json!(["fake-pkg", "other-pkg"])
    );

    assert_eq!(results[1]["conf_file"], clean.display().to_string());
    assert_eq!(results[1]["flagged"], false);
    assert_eq!(results[1]["packages"], serde_json::json!([]));

    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["flagged"], 1);
    assert!(json.get("missing_dirs").is_none());
}

#[test]
fn json_only_flagged_keeps_summary_totals() {
    let env = TestEnv::new();
    env.write_etc("a.conf", FLAGGED);
    env.write_etc("b.conf", CLEAN);
    env.write_etc("c.conf", "<busconfig>");

    let (json, code) = env.run_json(&["--only-flagged"]);
    assert_eq!(code, 1);

    let results = json["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["flagged"], true);
    assert_eq!(results[1]["status"], "error");
    assert!(results[1]["error"]
        .as_str()
        .expect("error message")
        .starts_with("xml parse error"));

    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["summary"]["ok"], 2);
    assert_eq!(json["summary"]["error"], 1);
}

#[test]
fn json_mode_keeps_stderr_quiet_and_lists_missing_dirs() {
    let env = TestEnv::new();
    env.write_etc("a.conf", CLEAN);
    fs::remove_dir_all(&env.usr).expect("remove usr dir");

    let output = env.cmd().arg("--json").output().expect("run binary");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(
        json["missing_dirs"],
        serde_json::json!([env.usr.display().to_string()])
    );
}

#[test]
fn settings_file_supplies_defaults() {
    let env = TestEnv::new();
    env.write_etc("a.xml", FLAGGED);
    env.write_etc("b.conf", FLAGGED);
    let settings = env.bin.join("audit.toml");
    fs::write(&settings, "suffix = \".xml\"\njson = true\n").expect("write settings");

    let (json, code) = env.run_json(&["--config", settings.to_str().expect("utf-8 path")]);
    assert_eq!(code, 0);
    assert_eq!(json["summary"]["total"], 1);
}

#[test]
fn invalid_settings_file_exits_two() {
    let env = TestEnv::new();
    let settings = env.bin.join("audit.toml");
    fs::write(&settings, "colour = \"blue\"\n").expect("write settings");

    env.cmd()
        .arg("--config")
        .arg(&settings)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid settings file"));
}

#[test]
fn deeply_nested_file_is_a_per_file_error() {
    let env = TestEnv::new();
    env.write_etc(
        "deep.conf",
        &format!("{}{}", "<x>".repeat(200_000), "</x>".repeat(200_000)),
    );
    env.write_etc("ok.conf", FLAGGED);

    env.cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("AllowOwnInDefaultPolicy: org.foo.Bar"))
        .stdout(predicate::str::contains(
            "Summary: total=2 ok=1 error=1 flagged=1 findings=1",
        ))
        .stderr(predicate::str::contains(
            "ERROR: xml parse error: nesting too deep",
        ));
}

#[test]
fn lookup_timeout_keeps_json_stderr_quiet() {
    let env = TestEnv::with_dpkg_script(SLOW_DPKG_QUERY);
    env.write_etc("a.conf", FLAGGED);

    let output = env
        .cmd()
        .args(["--json", "--timeout", "0.2"])
        .output()
        .expect("run binary");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["results"][0]["status"], "error");
    assert_eq!(
        json["results"][0]["error"],
        "command timed out after 0.2s"
    );
}

#[test]
fn lookup_timeout_covers_background_processes() {
    let env = TestEnv::with_dpkg_script(LINGERING_DPKG_QUERY);
    env.write_etc("a.conf", FLAGGED);

    let start = Instant::now();
    env.cmd()
        .args(["--timeout", "0.5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ERROR: command timed out after 0.5s",
        ));
    assert!(start.elapsed() < Duration::from_secs(4));
}
