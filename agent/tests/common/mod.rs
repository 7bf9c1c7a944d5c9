#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FLAGGED: &str = r#"<!DOCTYPE busconfig PUBLIC "-//freedesktop//DTD D-BUS Bus Configuration 1.0//EN"
 "http://www.freedesktop.org/standards/dbus/1.0/busconfig.dtd">
<busconfig>
  <policy user="root">
    <allow own="org.root.Only"/>
  </policy>
  <policy context="default">
    <allow own="org.foo.Bar"/>
    <allow send_destination="org.foo.Bar"/>
  </policy>
</busconfig>
"#;

pub const CLEAN: &str = r#"<busconfig>
  <policy context="default">
    <allow send_destination="org.foo"/>
  </policy>
</busconfig>
"#;

/// Fake `dpkg-query -S`: paths containing "unowned" belong to no package,
/// paths containing "locked" fail, everything else is owned by `fake-pkg`.
const FAKE_DPKG_QUERY: &str = r#"#!/bin/sh
case "$2" in
  *unowned*)
    echo "dpkg-query: no packages found matching $2" >&2
    exit 1
    ;;
  *locked*)
    echo "dpkg-query: error: database is locked" >&2
    exit 2
    ;;
  *)
    echo "fake-pkg, other-pkg: $2"
    ;;
esac
"#;

pub struct TestEnv {
    _tmp: TempDir,
    pub etc: PathBuf,
    pub usr: PathBuf,
    pub bin: PathBuf,
}

impl TestEnv {
    /// Both search directories exist; `dpkg-query` is the fake script
    pub fn new() -> Self {
        Self::with_dpkg_script(FAKE_DPKG_QUERY)
    }

    /// Both search directories exist; `dpkg-query` runs `script`
    pub fn with_dpkg_script(script: &str) -> Self {
        let env = Self::without_dpkg();
        let path = env.bin.join("dpkg-query");
        fs::write(&path, script).expect("write fake dpkg-query");
        make_executable(&path);
        env
    }

    /// Both search directories exist; `PATH` holds no `dpkg-query`
    pub fn without_dpkg() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let etc = tmp.path().join("etc/dbus-1/system.d");
        let usr = tmp.path().join("usr/share/dbus-1/system.d");
        let bin = tmp.path().join("bin");
        for dir in [&etc, &usr, &bin] {
            fs::create_dir_all(dir).expect("create fixture dir");
        }
        Self {
            _tmp: tmp,
            etc,
            usr,
            bin,
        }
    }

    pub fn write_etc(&self, name: &str, content: &str) -> PathBuf {
        write_file(&self.etc.join(name), content)
    }

    pub fn write_usr(&self, name: &str, content: &str) -> PathBuf {
        write_file(&self.usr.join(name), content)
    }

    /// Command with isolated PATH and both search directories set
    pub fn cmd(&self) -> Command {
        self.cmd_with_dirs(&self.etc, &self.usr)
    }

    pub fn cmd_with_dirs(&self, etc: &Path, usr: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("check_dbus_system_conf");
        cmd.env("PATH", &self.bin)
            .env_remove("DBUS_AUDIT_LOG")
            .arg("--etc-dir")
            .arg(etc)
            .arg("--usr-dir")
            .arg(usr);
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> (Value, i32) {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run binary");
        let value = serde_json::from_slice(&output.stdout).expect("valid json output");
        (value, output.status.code().unwrap_or(-1))
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write fixture file");
    path.to_path_buf()
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
