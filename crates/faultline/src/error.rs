//! The injected fault value and its classification helpers.
//!
//! There is exactly one kind of injected error.  Callers that need
//! domain-specific failure shapes map a [`Fault`] into their own error
//! through the engine's callback hook; everything else classifies faults
//! with [`is_injected`] and decides whether to retry, fall back, or
//! propagate.  Exercising that decision is the entire point of the tool.

use std::fmt;

use thiserror::Error;

use crate::stack::Frame;

/// Boxed error type returned by trigger operations.
///
/// The box keeps the trigger surface open: the default payload is a
/// [`Fault`], but a configured callback may substitute any error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Process-wide sentinel for injected faults.
///
/// Every [`Fault`] reports this as its [`source`](std::error::Error::source),
/// so classification survives arbitrary wrapping as long as the chain is
/// preserved.  Use [`is_injected`] rather than matching on this directly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("injected fault")]
pub struct Injected;

/// An error injected by an [`Engine`](crate::engine::Engine).
///
/// Carries the call stack that was captured when the fault fired, at its
/// real depth rather than the padded fingerprint width.  The stack is
/// raw instruction pointers; [`Fault::symbols`] resolves them on demand
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct Fault {
    stack: Box<[Frame]>,
}

impl Fault {
    pub(crate) fn new(frames: &[Frame]) -> Self {
        Self {
            stack: frames.into(),
        }
    }

    /// The captured call stack, innermost frame first.
    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }

    /// Resolve the captured frames to symbol names, innermost first.
    ///
    /// Resolution is best-effort: frames that cannot be symbolized come
    /// back as empty strings.  Intended for test assertions about which
    /// call site triggered, not for hot paths.
    pub fn symbols(&self) -> Vec<String> {
        self.stack
            .iter()
            .map(|&ip| {
                let mut name = String::new();
                backtrace::resolve(ip as *mut std::ffi::c_void, |symbol| {
                    if name.is_empty() {
                        if let Some(resolved) = symbol.name() {
                            name = resolved.to_string();
                        }
                    }
                });
                name
            })
            .collect()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "injected fault")
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&Injected)
    }
}

/// Returns `true` if `err`, or anything in its source chain, was
/// injected by an engine.
///
/// # Example
///
/// ```rust,ignore
/// match store.read_block(id) {
///     Err(err) if faultline::is_injected(err.as_ref()) => retries += 1,
///     Err(err) => return Err(err),
///     Ok(block) => return Ok(block),
/// }
/// ```
pub fn is_injected(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<Fault>() || e.is::<Injected>() {
            return true;
        }
        current = e.source();
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
