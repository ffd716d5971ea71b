//! C FFI exports for .NET P/Invoke.
//!
//! These functions provide a C-compatible interface for calling Rust functions from C#.
//! All functions use JSON strings for input/output to simplify marshalling.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::coalesce::build_file_operations_from_pending_edits;
use crate::plan::PendingEdit;
use crate::snapshot::{plan_pull, plan_push, PlanInput};

/// Build a push plan from a snapshot.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (SynchronizeResult).
/// Returns null on error.
#[no_mangle]
pub unsafe extern "C" fn plan_push_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(c_str) = read_c_str(input_json) else {
        return ptr::null_mut();
    };

    let input: PlanInput = match serde_json::from_str(c_str) {
        Ok(i) => i,
        Err(e) => {
            return create_error_response(&format!("Failed to parse input: {}", e));
        }
    };

    to_json_response(&plan_push(&input))
}

/// Build a pull plan from a snapshot.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (SynchronizeResult).
/// Returns null on error.
#[no_mangle]
pub unsafe extern "C" fn plan_pull_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(c_str) = read_c_str(input_json) else {
        return ptr::null_mut();
    };

    let input: PlanInput = match serde_json::from_str(c_str) {
        Ok(i) => i,
        Err(e) => {
            return create_error_response(&format!("Failed to parse input: {}", e));
        }
    };

    to_json_response(&plan_pull(&input))
}

/// Coalesce pending edits into file operations.
///
/// # Safety
///
/// - `edits_json` must be a valid null-terminated C string holding a JSON array
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub unsafe extern "C" fn build_file_operations_ffi(edits_json: *const c_char) -> *mut c_char {
    let Some(c_str) = read_c_str(edits_json) else {
        return ptr::null_mut();
    };

    let edits: Vec<PendingEdit> = match serde_json::from_str(c_str) {
        Ok(e) => e,
        Err(e) => {
            return create_error_response(&format!("Failed to parse input: {}", e));
        }
    };

    to_json_response(&build_file_operations_from_pending_edits(edits))
}

/// Get the library version.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub extern "C" fn get_core_version_ffi() -> *mut c_char {
    string_to_c_char(crate::get_core_version().to_string())
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Borrow a C string as UTF-8, or `None` for null / invalid input.
unsafe fn read_c_str<'a>(input: *const c_char) -> Option<&'a str> {
    if input.is_null() {
        return None;
    }
    CStr::from_ptr(input).to_str().ok()
}

fn to_json_response<T: serde::Serialize>(output: &T) -> *mut c_char {
    match serde_json::to_string(output) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Failed to serialize output: {}", e)),
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message }).to_string();
    string_to_c_char(error_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SynchronizeResult;
    use std::ffi::CString;

    #[test]
    fn test_null_input() {
        unsafe {
            assert!(plan_push_ffi(ptr::null()).is_null());
            assert!(plan_pull_ffi(ptr::null()).is_null());
            assert!(build_file_operations_ffi(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_invalid_json_input() {
        let invalid_json = CString::new("not valid json").unwrap();
        unsafe {
            let result = plan_push_ffi(invalid_json.as_ptr());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            assert!(json.contains("error"));
            free_string(result);
        }
    }

    #[test]
    fn test_pull_without_remote_reports_message() {
        let input = CString::new(r#"{"table":{"name":"pastes"},"root":"sync"}"#).unwrap();
        unsafe {
            let result = plan_pull_ffi(input.as_ptr());
            let json = CStr::from_ptr(result).to_str().unwrap();
            let output: SynchronizeResult = serde_json::from_str(json).unwrap();
            assert!(output.has_errors());
            free_string(result);
        }
    }

    #[test]
    fn test_get_core_version() {
        let result = get_core_version_ffi();
        unsafe {
            assert_eq!(CStr::from_ptr(result).to_str().unwrap(), crate::get_core_version());
            free_string(result);
        }
    }
}
