mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::CString;
use std::os::raw::c_char;

use bmm_core::Batch;

/// Execute a closure that returns a `BmmStatus`, catching any panics
/// and converting them into `BmmStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> BmmStatus + std::panic::UnwindSafe>(f: F) -> BmmStatus {
    match std::panic::catch_unwind(f) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            BmmStatus::ErrorInternal
        }
    }
}

fn write_context(ctx: BmmContext, ctx_out: *mut *mut BmmContext) -> BmmStatus {
    if ctx_out.is_null() {
        set_last_error("ctx_out is null".to_string());
        return BmmStatus::ErrorInvalidArgument;
    }
    unsafe {
        *ctx_out = Box::into_raw(Box::new(ctx));
    }
    BmmStatus::Ok
}

/// Create an offload context with default device limits.
///
/// On success, writes a heap-allocated `BmmContext` pointer into `*ctx_out`.
/// The caller must later call `bmm_context_destroy` to free it.
#[no_mangle]
pub extern "C" fn bmm_context_create(ctx_out: *mut *mut BmmContext) -> BmmStatus {
    catch_panic(|| write_context(BmmContext::default(), ctx_out))
}

/// Create an offload context with explicit device limits.
#[no_mangle]
pub extern "C" fn bmm_context_create_with(
    params: BmmDeviceParams,
    ctx_out: *mut *mut BmmContext,
) -> BmmStatus {
    catch_panic(|| write_context(BmmContext::new(params), ctx_out))
}

/// Destroy a context previously created by `bmm_context_create`.
///
/// Passing a null pointer is a no-op and returns `BmmStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn bmm_context_destroy(ctx: *mut BmmContext) -> BmmStatus {
    if ctx.is_null() {
        return BmmStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    BmmStatus::Ok
}

/// Multiply `batch_size` pairs of `order` x `order` row-major i32 matrices.
///
/// `a`, `b` and `out` must each point to `batch_size * order * order`
/// elements. When `batch_size` is zero the pointers are not read and may be
/// null. On error `out` is left untouched and `bmm_last_error` describes the
/// failing pipeline step.
#[no_mangle]
pub unsafe extern "C" fn bmm_batched_multiply(
    ctx: *const BmmContext,
    a: *const i32,
    b: *const i32,
    out: *mut i32,
    order: usize,
    batch_size: usize,
) -> BmmStatus {
    catch_panic(|| {
        if ctx.is_null() {
            set_last_error("ctx is null".to_string());
            return BmmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &*ctx };
        let numel = match order
            .checked_mul(order)
            .and_then(|m| m.checked_mul(batch_size))
        {
            Some(n) if order > 0 => n,
            _ => {
                set_last_error(format!(
                    "invalid batch: {} matrices of order {}",
                    batch_size, order
                ));
                return BmmStatus::ErrorInvalidArgument;
            }
        };
        let (a, b): (&[i32], &[i32]) = if numel == 0 {
            (&[], &[])
        } else {
            if a.is_null() || b.is_null() || out.is_null() {
                set_last_error("null buffer".to_string());
                return BmmStatus::ErrorInvalidArgument;
            }
            unsafe {
                (
                    std::slice::from_raw_parts(a, numel),
                    std::slice::from_raw_parts(b, numel),
                )
            }
        };
        let operands = Batch::from_vec(a.to_vec(), order, batch_size)
            .and_then(|a| Ok((a, Batch::from_vec(b.to_vec(), order, batch_size)?)));
        let result = operands.and_then(|(a, b)| ctx.multiplier.multiply(&a, &b));

        match result {
            Ok(c) => {
                if numel > 0 {
                    let out = unsafe { std::slice::from_raw_parts_mut(out, numel) };
                    out.copy_from_slice(c.as_slice());
                }
                BmmStatus::Ok
            }
            Err(e) => {
                record_offload_error(&e);
                BmmStatus::from(e.kind())
            }
        }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error, or
/// null if no error has occurred. The caller must free the returned string
/// with `bmm_free_string`.
#[no_mangle]
pub extern "C" fn bmm_last_error() -> *const c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null(),
    }
}

/// Pipeline step in which the most recent error on this thread was raised.
///
/// Returns `BmmStage::None` when that error was not raised by a pipeline
/// step or no error has occurred. Unlike `bmm_last_error`, reading the stage
/// does not clear it.
#[no_mangle]
pub extern "C" fn bmm_last_error_stage() -> BmmStage {
    error::last_error_stage()
}

/// Free a string previously returned by `bmm_last_error`.
#[no_mangle]
pub unsafe extern "C" fn bmm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
