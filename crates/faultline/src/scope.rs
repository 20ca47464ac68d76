//! Operation-scoped engine handles.
//!
//! A [`Scope`] threads an engine through a request or test operation as
//! an explicit, cheaply cloned value.  Cloning is the inheritance
//! mechanism: every clone shares the same engine, so nested operations
//! draw on one fault budget per call path.  Attachment is idempotent,
//! which keeps a hierarchy of operations on the engine attached at its
//! root.
//!
//! Injection points call the free [`trigger`] function.  It checks the
//! [enablement gate](crate::gate::enabled) before touching anything
//! else, so with the gate closed a decorated call site costs one branch
//! and nothing more.
//!
//! # Example
//!
//! ```rust,ignore
//! use faultline::{Engine, Scope};
//!
//! fn flush(scope: &Scope, buf: &[u8]) -> Result<(), faultline::BoxError> {
//!     faultline::trigger(scope)?;
//!     write_out(buf)
//! }
//!
//! let scope = Scope::new().attach(Arc::new(Engine::builder().limit(2).build()));
//! flush(&scope, b"payload")?;
//! ```

use std::sync::{Arc, OnceLock};

use crate::engine::{Engine, TRIGGER_SKIP};
use crate::error::BoxError;
use crate::gate;

/// A cheaply cloned handle carrying at most one [`Engine`].
///
/// Scopes are plain values: pass them down call chains, clone them into
/// spawned tasks, store them in request state.  All copies share the
/// attached engine.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    engine: Option<Arc<Engine>>,
}

impl Scope {
    /// A scope with no engine; triggers through it are no-ops.
    pub fn new() -> Self {
        Self { engine: None }
    }

    /// The process-wide default scope, bound to a shared engine with the
    /// default policy (limit 1, skip 0).
    ///
    /// Every call returns a handle to the same engine, making this a
    /// convenient root for ad hoc usage.
    pub fn background() -> Self {
        static BACKGROUND: OnceLock<Scope> = OnceLock::new();
        BACKGROUND
            .get_or_init(|| Scope {
                engine: Some(Arc::new(Engine::new())),
            })
            .clone()
    }

    /// Attach an engine, returning the decorated scope.
    ///
    /// Attachment is idempotent: a scope that already carries an engine
    /// is returned unchanged and keeps its original engine, so nested
    /// attach calls in a call hierarchy collapse to the outermost one.
    /// When the enablement gate is closed the scope is also returned
    /// unchanged, keeping production builds engine-free.
    pub fn attach(&self, engine: Arc<Engine>) -> Scope {
        if !gate::enabled() || self.engine.is_some() {
            return self.clone();
        }
        Scope {
            engine: Some(engine),
        }
    }

    /// The attached engine, if any.
    pub fn engine(&self) -> Option<&Arc<Engine>> {
        self.engine.as_ref()
    }
}

/// Maybe inject a fault for the current call stack.
///
/// This is the decorated-call-site entry point: existing code opts in by
/// replacing an infallible step with `trigger(scope)?`.  Returns
/// `Ok(())` when the gate is closed, when the scope carries no engine,
/// or when the engine decides against a fault.
#[inline(never)]
pub fn trigger(scope: &Scope) -> Result<(), BoxError> {
    if !gate::enabled() {
        return Ok(());
    }
    match scope.engine() {
        Some(engine) => engine.trigger_from(TRIGGER_SKIP),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is_injected, Fault};
    use std::hint::black_box;

    #[inline(never)]
    fn fire(scope: &Scope) -> Result<(), BoxError> {
        black_box(1u32);
        trigger(scope)
    }

    #[inline(never)]
    fn fire_elsewhere(scope: &Scope) -> Result<(), BoxError> {
        black_box(2u32);
        trigger(scope)
    }

    #[test]
    fn undecorated_scope_is_a_noop() {
        let scope = Scope::new();
        for _ in 0..3 {
            assert!(fire(&scope).is_ok());
        }
    }

    #[test]
    fn attached_engine_applies_the_default_limit() {
        let scope = Scope::new().attach(Arc::new(Engine::new()));

        let mut captured = Vec::new();
        let mut faulted = Vec::new();
        for _ in 0..3 {
            match fire(&scope) {
                Err(err) => {
                    assert!(is_injected(err.as_ref()));
                    let fault = err.downcast_ref::<Fault>().expect("default payload");
                    captured.push(fault.clone());
                    faulted.push(true);
                }
                Ok(()) => faulted.push(false),
            }
        }
        assert_eq!(faulted, [true, false, false]);

        // The captured stack resolves back to our stably named call site.
        let symbols = captured[0].symbols().join("\n");
        assert!(symbols.contains("fire"), "unexpected stack:\n{symbols}");
    }

    #[test]
    fn attach_is_idempotent() {
        let first = Arc::new(Engine::builder().limit(7).build());
        let second = Arc::new(Engine::new());

        let scope = Scope::new().attach(Arc::clone(&first));
        let reattached = scope.attach(second);

        let kept = reattached.engine().expect("engine still attached");
        assert!(Arc::ptr_eq(kept, &first));
        assert_eq!(kept.limit(), 7);
    }

    #[test]
    fn clones_share_one_budget() {
        let scope = Scope::new().attach(Arc::new(Engine::new()));
        let inherited = scope.clone();

        let outcomes: Vec<bool> = (0..2)
            .map(|pass| {
                let s = if pass == 0 { &scope } else { &inherited };
                fire(s).is_err()
            })
            .collect();
        assert_eq!(outcomes, [true, false]);
    }

    #[test]
    fn background_scope_is_shared_and_uses_defaults() {
        let a = Scope::background();
        let b = Scope::background();

        let engine_a = a.engine().expect("background scope has an engine");
        let engine_b = b.engine().expect("background scope has an engine");
        assert!(Arc::ptr_eq(engine_a, engine_b));
        assert_eq!(engine_a.limit(), 1);
        assert_eq!(engine_a.skip(), 0);
    }

    #[test]
    fn skip_then_limit_pattern_per_call_path() {
        let engine = Arc::new(Engine::builder().limit(2).skip(1).build());
        let scope = Scope::new().attach(engine);

        let first: Vec<bool> = (0..4).map(|_| fire(&scope).is_err()).collect();
        assert_eq!(first, [false, true, true, false]);

        // A different call path starts its own skip window and budget.
        let second: Vec<bool> = (0..4).map(|_| fire_elsewhere(&scope).is_err()).collect();
        assert_eq!(second, [false, true, true, false]);
    }
}
