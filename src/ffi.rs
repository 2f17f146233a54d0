//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Strings returned by `wpdf_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `wpdf_free_string`.
//! - Passing a null pointer to the free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `wpdf_last_error`.
//!
//! ## Threading
//! - Each call runs its job to completion on a private single-threaded
//!   runtime, so the call blocks. Do not call it from inside a tokio runtime.
//! - `wpdf_last_error` uses a thread-local.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lwebpdf_forge
//! // extern int wpdf_generate(const char* options_json, char** out_path);
//! // extern const char* wpdf_last_error();
//! // extern void wpdf_free_string(char* s);
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;

use crate::error::GenerationError;
use crate::job::JobOptions;

/// Return codes.
pub const WPDF_OK: c_int = 0;
pub const WPDF_ERR_NULL: c_int = 1;
pub const WPDF_ERR_UTF8: c_int = 2;
pub const WPDF_ERR_OPTIONS: c_int = 3;
pub const WPDF_ERR_GENERATION: c_int = 4;
pub const WPDF_ERR_TIMEOUT: c_int = 5;
pub const WPDF_ERR_RUNTIME: c_int = 6;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Read a non-null, null-terminated UTF-8 string.
///
/// # Safety
/// `ptr` must be null or point to a valid null-terminated string.
unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, c_int> {
    if ptr.is_null() {
        set_last_error("Null pointer argument");
        return Err(WPDF_ERR_NULL);
    }
    CStr::from_ptr(ptr).to_str().map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        WPDF_ERR_UTF8
    })
}

fn run_job(job: JobOptions) -> Result<PathBuf, c_int> {
    let builder = job.into_builder().map_err(report_generation_error)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            set_last_error(&format!("Failed to start runtime: {e}"));
            WPDF_ERR_RUNTIME
        })?;

    runtime
        .block_on(builder.create_async())
        .map_err(report_generation_error)
}

fn report_generation_error(err: GenerationError) -> c_int {
    set_last_error(&err.to_string());
    match err {
        GenerationError::Timeout { .. } => WPDF_ERR_TIMEOUT,
        _ => WPDF_ERR_GENERATION,
    }
}

/// Write `path` into `*out_path` as a heap string.
unsafe fn write_path(path: PathBuf, out_path: *mut *mut c_char) -> c_int {
    match CString::new(path.display().to_string()) {
        Ok(cs) => {
            *out_path = cs.into_raw();
            WPDF_OK
        }
        Err(_) => {
            *out_path = ptr::null_mut();
            set_last_error("Output path contains a NUL byte");
            WPDF_ERR_GENERATION
        }
    }
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Run one job described by a JSON document (see [`JobOptions`]).
///
/// # Parameters
/// - `options_json`: null-terminated UTF-8 JSON
/// - `out_path`: on success, receives the absolute path of the saved PDF
///
/// # Returns
/// `0` on success, `5` on timeout, another non-zero code on error. On error,
/// call `wpdf_last_error`.
///
/// # Safety
/// - `options_json` must be a valid null-terminated string.
/// - `out_path` must be a valid pointer.
/// - The caller must free `*out_path` by calling `wpdf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn wpdf_generate(
    options_json: *const c_char,
    out_path: *mut *mut c_char,
) -> c_int {
    if out_path.is_null() {
        set_last_error("Null pointer argument");
        return WPDF_ERR_NULL;
    }
    let json = match read_str(options_json) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let job = match JobOptions::from_json(json) {
        Ok(job) => job,
        Err(e) => {
            set_last_error(&format!("Invalid job options: {e}"));
            return WPDF_ERR_OPTIONS;
        }
    };

    match run_job(job) {
        Ok(path) => write_path(path, out_path),
        Err(code) => code,
    }
}

/// Convert inline HTML with default page settings.
///
/// # Parameters
/// - `name`: document name (`.pdf` appended if missing)
/// - `html`: null-terminated UTF-8 markup
/// - `output_dir`: target directory, or `NULL` for the cache directory
/// - `out_path`: on success, receives the absolute path of the saved PDF
///
/// # Safety
/// Same as `wpdf_generate`; `output_dir` may be null.
#[no_mangle]
pub unsafe extern "C" fn wpdf_generate_html(
    name: *const c_char,
    html: *const c_char,
    output_dir: *const c_char,
    out_path: *mut *mut c_char,
) -> c_int {
    if out_path.is_null() {
        set_last_error("Null pointer argument");
        return WPDF_ERR_NULL;
    }
    let name = match read_str(name) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let html = match read_str(html) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let output_dir = if output_dir.is_null() {
        None
    } else {
        match read_str(output_dir) {
            Ok(s) => Some(PathBuf::from(s)),
            Err(code) => return code,
        }
    };

    let job = JobOptions {
        name: name.to_string(),
        html: Some(html.to_string()),
        output_dir,
        ..JobOptions::default()
    };
    match run_job(job) {
        Ok(path) => write_path(path, out_path),
        Err(code) => code,
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a string previously returned by a `wpdf_*` function.
///
/// # Safety
/// `s` must have been returned by this library and not freed before.
#[no_mangle]
pub unsafe extern "C" fn wpdf_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Last error message on this thread, or `NULL`. The pointer stays valid
/// until the next failing call on the same thread; do not free it.
#[no_mangle]
pub extern "C" fn wpdf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cs) => cs.as_ptr(),
        None => ptr::null(),
    })
}

/// Library version as a static null-terminated string.
#[no_mangle]
pub extern "C" fn wpdf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error() -> String {
        let ptr = wpdf_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn ffi_version() {
        let v = unsafe { CStr::from_ptr(wpdf_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn ffi_null_input() {
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate(ptr::null(), &mut out) };
        assert_eq!(rc, WPDF_ERR_NULL);
        assert!(out.is_null());
        assert_eq!(last_error(), "Null pointer argument");
    }

    #[test]
    fn ffi_invalid_options() {
        let json = CString::new("{\"name\": 3}").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate(json.as_ptr(), &mut out) };
        assert_eq!(rc, WPDF_ERR_OPTIONS);
        assert!(last_error().starts_with("Invalid job options"));
    }

    #[test]
    fn ffi_configuration_error_is_reported() {
        let json = CString::new("{\"html\": \"<p>x</p>\"}").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate(json.as_ptr(), &mut out) };
        assert_eq!(rc, WPDF_ERR_GENERATION);
        assert!(last_error().contains("name must not be empty"));
    }

    #[test]
    fn ffi_several_sources_are_rejected() {
        let json =
            CString::new(r#"{"name": "a", "html": "<p>x</p>", "url": "https://example.com"}"#)
                .unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate(json.as_ptr(), &mut out) };
        assert_eq!(rc, WPDF_ERR_GENERATION);
        assert!(last_error().contains("ambiguous content source"));
        assert!(out.is_null());
    }

    #[test]
    fn ffi_missing_exporter_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobOptions {
            name: "Doc".into(),
            html: Some("<p>x</p>".into()),
            output_dir: Some(dir.path().to_path_buf()),
            exporter: Some("/nonexistent/wkhtmltopdf".into()),
            ..JobOptions::default()
        };
        let json = CString::new(job.to_json().unwrap()).unwrap();

        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate(json.as_ptr(), &mut out) };
        assert_eq!(rc, WPDF_ERR_GENERATION);
        assert!(last_error().contains("failed to run"));
        assert!(out.is_null());
    }

    #[test]
    fn ffi_html_requires_name() {
        let html = CString::new("<p>x</p>").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { wpdf_generate_html(ptr::null(), html.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, WPDF_ERR_NULL);
    }

    #[test]
    fn ffi_free_null_is_noop() {
        unsafe { wpdf_free_string(ptr::null_mut()) };
    }
}
