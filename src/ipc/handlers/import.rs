use crate::csv_source;
use crate::error::ImportError;
use crate::importer::{now_stamp, ImportOutcome, Importer};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, RunRecord};
use crate::summary::Section;
use serde_json::json;
use std::path::PathBuf;

fn param_path(req: &Request) -> Option<PathBuf> {
    req.params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

fn finish_run(
    state: &mut AppState,
    req: &Request,
    path: PathBuf,
    csv_kind: Option<String>,
    started_at: String,
    res: Result<ImportOutcome, ImportError>,
) -> serde_json::Value {
    let source = path.to_string_lossy().to_string();
    match res {
        Ok(outcome) => {
            state.push_run(RunRecord {
                source,
                csv_kind,
                started_at,
                finished_at: now_stamp(),
                ok: true,
                summary: Some(outcome.summary),
                skipped: outcome.skipped.len(),
                error: None,
            });
            ok(
                &req.id,
                json!({
                    "summary": outcome.summary,
                    "skipped": outcome.skipped,
                }),
            )
        }
        Err(e) => {
            state.push_run(RunRecord {
                source: source.clone(),
                csv_kind,
                started_at,
                finished_at: now_stamp(),
                ok: false,
                summary: None,
                skipped: 0,
                error: Some(e.to_string()),
            });
            err(&req.id, e.code(), e.to_string(), Some(json!({ "path": source })))
        }
    }
}

fn handle_import_run(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_path(req) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let started_at = now_stamp();
    let res = Importer::new(&state.db, &state.config).import_file(&path);
    finish_run(state, req, path, None, started_at, res)
}

fn handle_import_run_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_path(req) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let Some(kind) = req.params.get("kind").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.kind", None);
    };
    let started_at = now_stamp();
    let res = match Section::from_key(kind) {
        Some(section) => csv_source::read_csv_records(&path).and_then(|records| {
            Importer::new(&state.db, &state.config).import_section(&path, section, &records)
        }),
        None => Err(ImportError::UnknownSection(kind.to_string())),
    };
    finish_run(state, req, path, Some(kind.to_string()), started_at, res)
}

fn handle_import_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Runs are synchronous, so between requests the importer is always idle.
    ok(
        &req.id,
        json!({
            "status": "idle",
            "lastImport": state.history.back(),
        }),
    )
}

fn handle_import_log(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "runs": state.history }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.run" => Some(handle_import_run(state, req)),
        "import.runCsv" => Some(handle_import_run_csv(state, req)),
        "import.status" => Some(handle_import_status(state, req)),
        "import.log" => Some(handle_import_log(state, req)),
        _ => None,
    }
}
