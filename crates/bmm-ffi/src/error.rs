use std::cell::{Cell, RefCell};
use std::ffi::CString;

use bmm_core::OffloadError;

use crate::types::BmmStage;

thread_local! {
    static LAST_MESSAGE: RefCell<Option<CString>> = const { RefCell::new(None) };
    static LAST_STAGE: Cell<BmmStage> = const { Cell::new(BmmStage::None) };
}

/// Record an argument or internal error that did not come from a pipeline
/// step.
pub fn set_last_error(msg: String) {
    store(msg, BmmStage::None);
}

/// Record an offload failure together with the step that failed.
pub fn record_offload_error(err: &OffloadError) {
    let stage = err.stage().map(BmmStage::from).unwrap_or(BmmStage::None);
    store(err.to_string(), stage);
}

fn store(msg: String, stage: BmmStage) {
    LAST_MESSAGE.with(|m| *m.borrow_mut() = CString::new(msg).ok());
    LAST_STAGE.with(|s| s.set(stage));
}

/// Take the last error message, leaving `None` in its place. The recorded
/// stage is kept until the next error.
pub fn take_last_error() -> Option<CString> {
    LAST_MESSAGE.with(|m| m.borrow_mut().take())
}

/// Pipeline step of the most recent error on this thread.
pub fn last_error_stage() -> BmmStage {
    LAST_STAGE.with(|s| s.get())
}
