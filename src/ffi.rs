//! C-compatible entry points for repository walkers.
//!
//! These functions expose the three-call session contract to walkers built
//! in C or other languages: `init` produces an opaque context on success,
//! `visit` is called once per object with that context, and `free` must be
//! called exactly once per successful `init`.
//!
//! The API follows a status-code pattern: `init` returns `0` on success,
//! `2` for a malformed filter argument and `1` for an unrecoverable
//! index-preparation failure. `visit` returns the directive bits directly
//! and reports omission through an out-parameter. Fatal mid-pass conditions
//! (lookup failures, protocol violations) abort the process — silently
//! continuing would corrupt the derived result set, and a C caller cannot
//! unwind through this boundary.

use crate::error::FilterError;
use crate::filter::{FilterSession, ObjectKind, ObjectRef, Situation};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar};
use std::path::Path;
use std::process;
use std::ptr;

/// Success.
pub const GEOSIEVE_OK: c_int = 0;
/// Index present but session preparation failed.
pub const GEOSIEVE_ERR_PREPARE: c_int = 1;
/// Malformed filter argument or invalid call arguments.
pub const GEOSIEVE_ERR_CONFIG: c_int = 2;

/// Situation codes accepted by [`geosieve_visit`].
pub const GEOSIEVE_SITUATION_COMMIT: c_int = 0;
/// See [`GEOSIEVE_SITUATION_COMMIT`].
pub const GEOSIEVE_SITUATION_TAG: c_int = 1;
/// See [`GEOSIEVE_SITUATION_COMMIT`].
pub const GEOSIEVE_SITUATION_BEGIN_TREE: c_int = 2;
/// See [`GEOSIEVE_SITUATION_COMMIT`].
pub const GEOSIEVE_SITUATION_END_TREE: c_int = 3;
/// See [`GEOSIEVE_SITUATION_COMMIT`].
pub const GEOSIEVE_SITUATION_BLOB: c_int = 4;

/// Object-kind codes accepted by [`geosieve_visit`].
pub const GEOSIEVE_OBJ_COMMIT: c_int = 1;
/// See [`GEOSIEVE_OBJ_COMMIT`].
pub const GEOSIEVE_OBJ_TREE: c_int = 2;
/// See [`GEOSIEVE_OBJ_COMMIT`].
pub const GEOSIEVE_OBJ_BLOB: c_int = 3;
/// See [`GEOSIEVE_OBJ_COMMIT`].
pub const GEOSIEVE_OBJ_TAG: c_int = 4;

/// Opaque session handle exposed to C callers.
#[repr(C)]
pub struct GeosieveContext {
    session: FilterSession,
}

fn situation_from(code: c_int) -> Option<Situation> {
    match code {
        GEOSIEVE_SITUATION_COMMIT => Some(Situation::Commit),
        GEOSIEVE_SITUATION_TAG => Some(Situation::Tag),
        GEOSIEVE_SITUATION_BEGIN_TREE => Some(Situation::BeginTree),
        GEOSIEVE_SITUATION_END_TREE => Some(Situation::EndTree),
        GEOSIEVE_SITUATION_BLOB => Some(Situation::Blob),
        _ => None,
    }
}

fn kind_from(code: c_int) -> Option<ObjectKind> {
    match code {
        GEOSIEVE_OBJ_COMMIT => Some(ObjectKind::Commit),
        GEOSIEVE_OBJ_TREE => Some(ObjectKind::Tree),
        GEOSIEVE_OBJ_BLOB => Some(ObjectKind::Blob),
        GEOSIEVE_OBJ_TAG => Some(ObjectKind::Tag),
        _ => None,
    }
}

/// Initialize a filter session.
///
/// On success, writes the context pointer through `context`; the caller
/// must pass it unchanged to every subsequent call and release it with
/// [`geosieve_free`].
///
/// # Safety
/// `meta_dir` and `filter_arg` must point to valid, null-terminated
/// strings; `context` must point to writable storage for one pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn geosieve_init(
    meta_dir: *const c_char,
    filter_arg: *const c_char,
    context: *mut *mut GeosieveContext,
) -> c_int {
    if meta_dir.is_null() || filter_arg.is_null() || context.is_null() {
        return GEOSIEVE_ERR_CONFIG;
    }
    let meta_dir = match unsafe { CStr::from_ptr(meta_dir) }.to_str() {
        Ok(s) => s,
        Err(_) => return GEOSIEVE_ERR_CONFIG,
    };
    let filter_arg = match unsafe { CStr::from_ptr(filter_arg) }.to_str() {
        Ok(s) => s,
        Err(_) => return GEOSIEVE_ERR_CONFIG,
    };

    match FilterSession::init(Path::new(meta_dir), filter_arg) {
        Ok(session) => {
            let handle = Box::into_raw(Box::new(GeosieveContext { session }));
            unsafe { *context = handle };
            GEOSIEVE_OK
        }
        Err(err @ FilterError::Config(_)) => {
            log::error!("{err}; expected '<lng_w>,<lat_s>,<lng_e>,<lat_n>'");
            unsafe { *context = ptr::null_mut() };
            GEOSIEVE_ERR_CONFIG
        }
        Err(err) => {
            log::error!("spatial filter init failed: {err}");
            unsafe { *context = ptr::null_mut() };
            GEOSIEVE_ERR_PREPARE
        }
    }
}

/// Decide traversal directives for one visited object.
///
/// Returns the directive bits ([`Directive`](crate::Directive) values) and
/// sets `*omit` to `1` when the object must be excluded from the result
/// set. Unknown situation or kind codes, lookup failures and protocol
/// violations abort the process.
///
/// # Safety
/// `context` must be a live pointer from a successful [`geosieve_init`].
/// `object_id` must point to `object_id_len` readable bytes. `path` and
/// `filename`, when non-null, must be valid null-terminated strings.
/// `omit`, when non-null, must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn geosieve_visit(
    context: *mut GeosieveContext,
    situation: c_int,
    kind: c_int,
    object_id: *const c_uchar,
    object_id_len: usize,
    path: *const c_char,
    _filename: *const c_char,
    omit: *mut c_int,
) -> c_int {
    if context.is_null() || object_id.is_null() {
        log::error!("visit called with null context or object id");
        process::abort();
    }
    let (Some(situation), Some(kind)) = (situation_from(situation), kind_from(kind)) else {
        log::error!("unknown situation/kind codes: {situation}/{kind}");
        process::abort();
    };
    let id = unsafe { std::slice::from_raw_parts(object_id, object_id_len) };
    let path = if path.is_null() {
        ""
    } else {
        match unsafe { CStr::from_ptr(path) }.to_str() {
            Ok(s) => s,
            Err(_) => {
                log::error!("object path is not valid UTF-8");
                process::abort();
            }
        }
    };

    let ctx = unsafe { &mut *context };
    match ctx.session.visit(situation, ObjectRef { kind, id }, path) {
        Ok(visit) => {
            if visit.omit && !omit.is_null() {
                unsafe { *omit = 1 };
            }
            c_int::from(visit.directive.bits())
        }
        Err(err) => {
            log::error!("fatal during spatial filtering: {err}");
            process::abort();
        }
    }
}

/// Release a session: finalizes the prepared statement, closes the index
/// and logs the final counters. Must be called exactly once per successful
/// [`geosieve_init`].
///
/// # Safety
/// `context` must be a live pointer from a successful [`geosieve_init`];
/// it is invalid after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn geosieve_free(context: *mut GeosieveContext) {
    if context.is_null() {
        return;
    }
    let boxed = unsafe { Box::from_raw(context) };
    let GeosieveContext { session } = *boxed;
    let _ = session.finish();
}
