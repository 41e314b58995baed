//! Process-wide runtime used by compiled programs.
//!
//! A compiled module calls [`load_constants_blob`] from its initialisation
//! code and has no way to recover from a damaged blob, so every failure here
//! ends the process with a diagnostic instead of returning an error.

use std::sync::{Mutex, OnceLock, PoisonError};

use crate::{
    error::{BlobError, BlobResult},
    runtime::ConstantsRuntime,
    value::Value,
};

static RUNTIME: OnceLock<Mutex<ConstantsRuntime>> = OnceLock::new();

/// Installs the process-wide runtime. Only the first call succeeds.
pub fn install(runtime: ConstantsRuntime) -> BlobResult<()> {
    RUNTIME
        .set(Mutex::new(runtime))
        .map_err(|_| BlobError::AlreadyInstalled)
}

#[must_use]
pub fn is_installed() -> bool {
    RUNTIME.get().is_some()
}

/// Fills `output` with the constants of the named segment.
///
/// Aborts the process if no runtime is installed or the segment cannot be
/// decoded.
pub fn load_constants_blob(name: &str, output: &mut [Value]) {
    let Some(runtime) = RUNTIME.get() else {
        fatal(&BlobError::NotInstalled);
    };
    let mut runtime = runtime.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(err) = runtime.load_constants_blob(name, output) {
        fatal(&err);
    }
}

/// Runs `f` with the installed runtime, if any.
pub fn with_runtime<R>(f: impl FnOnce(&mut ConstantsRuntime) -> R) -> Option<R> {
    let runtime = RUNTIME.get()?;
    let mut runtime = runtime.lock().unwrap_or_else(PoisonError::into_inner);
    Some(f(&mut runtime))
}

/// Unwraps a result or aborts with the blob error.
pub fn or_abort<T>(result: BlobResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fatal(&err),
    }
}

/// Reports an unusable blob and aborts the process.
pub fn fatal(err: &BlobError) -> ! {
    tracing::error!(error = %err, "constants blob is unusable");
    eprintln!("Error, corrupted constants object: {err}");
    std::process::abort()
}
