//! FFI bindings for Keycadence
//!
//! This module provides C-compatible functions for embedding the recorder and
//! the scoring functions in other runtimes. Strings are null-terminated UTF-8;
//! returned strings are heap-allocated and must be freed with `kc_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::capture::KeystrokeRecorder;
use crate::clock::MonotonicClock;
use crate::config::{AnalyzerConfig, CaptureConfig, ComparatorConfig};
use crate::pipeline::{analyze_json, compare_json};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

// ============================================================================
// Recorder API
// ============================================================================

/// Opaque handle to a live keystroke recorder
pub struct KeycadenceRecorderHandle {
    recorder: KeystrokeRecorder<MonotonicClock>,
}

/// Create an idle recorder on the monotonic clock.
///
/// A non-zero `start_on_first_press` starts recording on the first key press.
///
/// # Safety
/// - Returns a pointer that must be freed with `kc_recorder_free`.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_new(start_on_first_press: i32) -> *mut KeycadenceRecorderHandle {
    clear_last_error();

    let config = CaptureConfig {
        start_on_first_press: start_on_first_press != 0,
    };
    let recorder = KeystrokeRecorder::with_config(MonotonicClock::new(), config);
    Box::into_raw(Box::new(KeycadenceRecorderHandle { recorder }))
}

/// Free a recorder.
///
/// # Safety
/// - `handle` must be a pointer returned by `kc_recorder_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_free(handle: *mut KeycadenceRecorderHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start (or restart) recording. Returns 0 on success, -1 on a null handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_start(handle: *mut KeycadenceRecorderHandle) -> i32 {
    with_recorder(handle, |recorder| recorder.start())
}

/// Report a key press. Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
/// - `key` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_press(
    handle: *mut KeycadenceRecorderHandle,
    key: *const c_char,
) -> i32 {
    let Some(key) = cstr_to_string(key) else {
        set_last_error("Invalid key string pointer");
        return -1;
    };
    with_recorder(handle, |recorder| recorder.on_press(&key))
}

/// Report a key release. Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
/// - `key` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_release(
    handle: *mut KeycadenceRecorderHandle,
    key: *const c_char,
) -> i32 {
    let Some(key) = cstr_to_string(key) else {
        set_last_error("Invalid key string pointer");
        return -1;
    };
    with_recorder(handle, |recorder| recorder.on_release(&key))
}

/// Return to idle, discarding all records. Returns 0 on success.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_reset(handle: *mut KeycadenceRecorderHandle) -> i32 {
    with_recorder(handle, |recorder| recorder.reset())
}

/// 1 if recording, 0 if not, -1 on a null handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_is_recording(handle: *const KeycadenceRecorderHandle) -> i32 {
    if handle.is_null() {
        return -1;
    }
    i32::from((*handle).recorder.is_recording())
}

/// Stop recording and return the payload JSON.
///
/// `password` is the current content of the password field.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `kc_recorder_new`.
/// - `password` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kc_free_string`.
/// - Returns NULL on error; call `kc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kc_recorder_stop(
    handle: *mut KeycadenceRecorderHandle,
    password: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null recorder pointer");
        return ptr::null_mut();
    }
    let Some(password) = cstr_to_string(password) else {
        set_last_error("Invalid password string pointer");
        return ptr::null_mut();
    };

    let payload = (*handle).recorder.stop(password.as_str());
    match serde_json::to_string(&payload) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

unsafe fn with_recorder<F>(handle: *mut KeycadenceRecorderHandle, f: F) -> i32
where
    F: FnOnce(&mut KeystrokeRecorder<MonotonicClock>),
{
    clear_last_error();
    if handle.is_null() {
        set_last_error("Null recorder pointer");
        return -1;
    }
    f(&mut (*handle).recorder);
    0
}

// ============================================================================
// Stateless Scoring API
// ============================================================================

/// Compare two payload JSON documents.
///
/// A `threshold` outside [0, 1] selects the default of 0.7.
///
/// # Safety
/// - `reference` and `candidate` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `kc_free_string`.
/// - Returns NULL on error; call `kc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kc_compare_json(
    reference: *const c_char,
    candidate: *const c_char,
    threshold: f64,
) -> *mut c_char {
    clear_last_error();

    let Some(reference) = cstr_to_string(reference) else {
        set_last_error("Invalid reference string pointer");
        return ptr::null_mut();
    };
    let Some(candidate) = cstr_to_string(candidate) else {
        set_last_error("Invalid candidate string pointer");
        return ptr::null_mut();
    };

    let mut config = ComparatorConfig::default();
    if (0.0..=1.0).contains(&threshold) {
        config.threshold = threshold;
    }

    match compare_json(&reference, &candidate, &config) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Analyze a payload JSON document.
///
/// # Safety
/// - `payload` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kc_free_string`.
/// - Returns NULL on error; call `kc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kc_analyze_json(payload: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(payload) = cstr_to_string(payload) else {
        set_last_error("Invalid payload string pointer");
        return ptr::null_mut();
    };

    match analyze_json(&payload, &AnalyzerConfig::default()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Keycadence functions.
///
/// # Safety
/// - `ptr` must be a pointer returned by a Keycadence function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kc_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Keycadence call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn kc_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn kc_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
