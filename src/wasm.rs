//! WASM bindings for the browser extension.

use wasm_bindgen::prelude::*;

use crate::coalesce::build_file_operations_from_pending_edits;
use crate::plan::{PendingEdit, SynchronizeResult};
use crate::snapshot::{plan_pull, plan_push, PlanInput};

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the version of the core library.
#[wasm_bindgen(js_name = getCoreVersion)]
pub fn get_core_version_js() -> String {
    crate::get_core_version().to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Plan Builder WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Build a push plan.
///
/// Takes a JsValue (PlanInput) and returns a JsValue (SynchronizeResult).
#[wasm_bindgen(js_name = planPush)]
pub fn plan_push_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: PlanInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output: SynchronizeResult = plan_push(&input);

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Build a push plan using JSON strings (alternative API).
#[wasm_bindgen(js_name = planPushJson)]
pub fn plan_push_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::snapshot::plan_push_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Push planning failed: {}", e)))
}

/// Build a pull plan.
///
/// Takes a JsValue (PlanInput) and returns a JsValue (SynchronizeResult).
#[wasm_bindgen(js_name = planPull)]
pub fn plan_pull_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: PlanInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output: SynchronizeResult = plan_pull(&input);

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Build a pull plan using JSON strings (alternative API).
#[wasm_bindgen(js_name = planPullJson)]
pub fn plan_pull_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::snapshot::plan_pull_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Pull planning failed: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Edit Coalescer WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Coalesce pending edits into whole-file operations.
///
/// Takes a JsValue (array of PendingEdit) and returns a JsValue (SynchronizeResult).
#[wasm_bindgen(js_name = buildFileOperations)]
pub fn build_file_operations_js(edits: JsValue) -> Result<JsValue, JsValue> {
    let edits: Vec<PendingEdit> = serde_wasm_bindgen::from_value(edits)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output = build_file_operations_from_pending_edits(edits);

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}
