#![allow(dead_code)]

use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
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

pub fn importer_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_workmanager-import"));
    cmd.env_remove("WORKMANAGER__DATABASE_PATH")
        .env_remove("WORKMANAGER__DEFAULT_TAX_ID")
        .env_remove("WORKMANAGER__DEFAULT_CREATOR_TAG");
    cmd
}

pub fn run_import(db: &Path, args: &[&str]) -> Output {
    importer_command()
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("run workmanager-import")
}

pub fn write_json(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, serde_json::to_string_pretty(doc).expect("serialize")).expect("write json");
    p
}

/// Parses the pretty-printed summary that follows the success banner.
pub fn summary_of(out: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "import failed: stdout={} stderr={}",
        stdout,
        String::from_utf8_lossy(&out.stderr)
    );
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("Import completed successfully!"));
    let rest = lines.collect::<Vec<_>>().join("\n");
    serde_json::from_str(&rest).expect("summary json")
}

pub fn open(db: &Path) -> Connection {
    Connection::open(db).expect("open db")
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .expect("count rows")
}
