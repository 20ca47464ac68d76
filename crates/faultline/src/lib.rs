//! Deterministic fault injection keyed by call stack.
//!
//! Faultline improves test coverage of error-handling paths by
//! deterministically injecting synthetic failures.  Its unit of identity
//! is the *call stack*, not the call site: the same function can be made
//! to fail the first N times it is reached through one chain of callers
//! while succeeding when reached through another.  Retry loops and
//! fallback paths get exercised without hand-wiring a fault point into
//! every test.
//!
//! # Architecture
//!
//! ```text
//! Injection site            Engine                      Policy
//! ──────────────            ──────                      ──────
//! trigger(scope)? ──→ capture fingerprint ──→ lookup / create entry
//!                     (top 25 frames)         skip window? budget left?
//!                                        ──→ Ok(()) | Err(Fault)
//! ```
//!
//! 1. **[`stack`]**: bounded call-stack fingerprinting
//! 2. **[`engine`]**: growth-only entry cache and limit/skip policy
//! 3. **[`error`]**: the injected [`Fault`] value and classification
//! 4. **[`gate`]**: process-wide enablement, off in production builds
//! 5. **[`scope`]**: engine handles threaded through operations
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use faultline::{Engine, Scope};
//!
//! // Decorate an error path: "return Ok(())" becomes "trigger(scope)".
//! fn commit(scope: &Scope, batch: &Batch) -> Result<(), faultline::BoxError> {
//!     faultline::trigger(scope)?;
//!     batch.write()
//! }
//!
//! // In a test: two faults per unique call path, first arrival clean.
//! let engine = Arc::new(Engine::builder().limit(2).skip(1).build());
//! let scope = Scope::new().attach(engine);
//!
//! for _ in 0..4 {
//!     match commit(&scope, &batch) {
//!         Err(err) if faultline::is_injected(err.as_ref()) => recover(),
//!         other => other?,
//!     }
//! }
//! ```
//!
//! # Enablement
//!
//! Everything above is inert unless the process opts in: build with the
//! `enabled` feature, or with `env-gate` and `FAULTLINE_ENABLED=1` in
//! the environment.  Gated call sites in a closed-gate build cost one
//! branch.  See [`gate`].

pub mod engine;
pub mod error;
pub mod gate;
pub mod scope;
pub mod stack;

pub use engine::{Builder, Engine, FaultHook};
pub use error::{is_injected, BoxError, Fault, Injected};
pub use gate::{enabled, ENABLED_ENV};
pub use scope::{trigger, Scope};
pub use stack::{Frame, STACK_DEPTH};
