use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_inventory_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    match db::inventory_stats(&state.db) {
        Ok(stats) => ok(&req.id, json!(stats)),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "inventory.stats" => Some(handle_inventory_stats(state, req)),
        _ => None,
    }
}
