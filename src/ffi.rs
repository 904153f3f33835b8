//! FFI bindings for Sighting Flux
//!
//! This module provides C-compatible functions for calling Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `sighting_flux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{AnalyzerConfig, InvalidRecordPolicy, TieBreak};
use crate::error::AnalyticsError;
use crate::pipeline::{sightings_to_report, subject_to_report, SightingProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result across the boundary, recording any error
fn report_to_cstr(result: Result<String, AnalyticsError>) -> *mut c_char {
    match result {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a JSON array of sighting records and return the report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sighting_flux_free_string`.
/// - Returns NULL on error; call `sighting_flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_analyze(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    report_to_cstr(sightings_to_report(json_str))
}

/// Analyze a subject document (`{"fullName", "locations"}`) and return the report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sighting_flux_free_string`.
/// - Returns NULL on error; call `sighting_flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_analyze_subject(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    report_to_cstr(subject_to_report(json_str))
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a SightingProcessor
pub struct SightingProcessorHandle {
    processor: SightingProcessor,
}

/// Create a processor.
///
/// - `visit_gap_secs`: negative selects the default (900).
/// - `lexicographic_ties`: non-zero breaks most-frequent ties by smallest key.
/// - `skip_invalid`: non-zero drops invalid records instead of failing the batch.
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `sighting_flux_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_processor_new(
    visit_gap_secs: i64,
    lexicographic_ties: i32,
    skip_invalid: i32,
) -> *mut SightingProcessorHandle {
    clear_last_error();

    let mut config = AnalyzerConfig::default();
    if let Ok(secs) = u64::try_from(visit_gap_secs) {
        config = config.with_visit_gap_secs(secs);
    }
    if lexicographic_ties != 0 {
        config = config.with_tie_break(TieBreak::Lexicographic);
    }
    if skip_invalid != 0 {
        config = config.with_invalid_records(InvalidRecordPolicy::SkipInvalid);
    }

    let handle = Box::new(SightingProcessorHandle {
        processor: SightingProcessor::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sighting_flux_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_processor_free(processor: *mut SightingProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Analyze a JSON array of records with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sighting_flux_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sighting_flux_free_string`.
/// - Returns NULL on error; call `sighting_flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_processor_analyze(
    processor: *const SightingProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    report_to_cstr(handle.processor.process_array(&json_str))
}

/// Analyze a subject document with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `sighting_flux_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sighting_flux_free_string`.
/// - Returns NULL on error; call `sighting_flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_processor_analyze_subject(
    processor: *const SightingProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    report_to_cstr(handle.processor.process_subject(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Flux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sighting_flux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
