//! The fault-injection engine: per-call-path trigger accounting.
//!
//! An [`Engine`] owns a growth-only cache mapping call-stack
//! [`Fingerprint`]s to trigger state and decides, on every
//! [`trigger`](Engine::trigger), whether to emit a fault.  The policy is
//! limit/skip per unique stack: the first `skip` arrivals on a path pass
//! through clean, the next `limit` arrivals receive a fault, and the
//! path then goes permanently silent.
//!
//! # Decision algorithm
//!
//! ```text
//! capture fingerprint ──→ lookup / insert-if-absent entry
//!   entry.done?        ──→ no fault        (steady-state fast path)
//!   next = count + 1
//!   next <= 0          ──→ no fault        (inside the skip window)
//!   next > limit       ──→ set done, no fault
//!   else               ──→ emit fault      (callback may remap it)
//! ```
//!
//! The counter hands out unique sequence numbers, so no more than
//! `limit` faults are ever emitted per fingerprint even under unbounded
//! concurrency.  The raw count may transiently overshoot `limit`, by at
//! most the number of callers racing ahead of the `done` flag.
//!
//! Entries are never removed: memory grows with the number of distinct
//! call paths observed, which for a test-scoped tool is bounded by the
//! test workload itself.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{BoxError, Fault};
use crate::stack::{self, Fingerprint};

const DEFAULT_LIMIT: u32 = 1;

/// Unwinder callbacks to drop during capture: the capture routine, the
/// shared trigger path, and the public entry point, each pinned as its
/// own frame with `#[inline(never)]`.
pub(crate) const TRIGGER_SKIP: usize = 3;

/// Callback invoked with a pending [`Fault`].
///
/// Returning `None` suppresses the fault; returning `Some(err)` makes
/// `err` the trigger result, whether that is the original fault boxed or
/// a substituted domain error.
pub type FaultHook = dyn Fn(Fault) -> Option<BoxError> + Send + Sync;

/// Per-fingerprint trigger state.
///
/// `count` starts at `-skip` so the skip window is consumed before the
/// sequence numbers that emit faults.  `done` short-circuits exhausted
/// paths without further read-modify-write traffic.
struct Entry {
    count: AtomicI64,
    done: AtomicBool,
}

impl Entry {
    fn with_skip(skip: u32) -> Self {
        Self {
            count: AtomicI64::new(-i64::from(skip)),
            done: AtomicBool::new(false),
        }
    }
}

/// Emits a configured number of faults for each unique call stack that
/// reaches [`Engine::trigger`].
///
/// Engines are safe to share across any number of concurrent callers
/// and are immutable after construction apart from cache growth and
/// counters.  Construction works regardless of the
/// [enablement gate](crate::gate::enabled); gating is applied by the
/// scope-level [`trigger`](crate::scope::trigger) entry point.
///
/// # Example
///
/// ```
/// use faultline::Engine;
///
/// let engine = Engine::builder().limit(2).build();
/// let faulted: Vec<bool> = (0..4).map(|_| engine.trigger().is_err()).collect();
/// assert_eq!(faulted, [true, true, false, false]);
/// ```
pub struct Engine {
    entries: DashMap<Fingerprint, Arc<Entry>>,
    limit: u32,
    skip: u32,
    on_fault: Option<Box<FaultHook>>,
    emitted: AtomicU64,
}

impl Engine {
    /// Create an engine with the default policy: limit 1, skip 0, no
    /// callback.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building an engine with a custom policy.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Faults emitted per unique call stack before it goes silent.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Leading triggers absorbed per unique call stack before the limit
    /// starts counting.
    pub fn skip(&self) -> u32 {
        self.skip
    }

    /// Number of distinct call-stack fingerprints observed so far.
    pub fn stacks_seen(&self) -> usize {
        self.entries.len()
    }

    /// Total emit decisions across all fingerprints.
    ///
    /// Counted at decision time, so faults the callback later suppresses
    /// are still included.
    pub fn faults_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Decide whether to inject a fault for the current call stack.
    ///
    /// Returns `Err` carrying a [`Fault`], or whatever the configured
    /// callback substituted for it.  `Ok(())` means no fault this time:
    /// the path is inside its skip window, has exhausted its budget, or
    /// the callback suppressed the emission.  This call never blocks and
    /// never fails for internal reasons.
    #[inline(never)]
    pub fn trigger(&self) -> Result<(), BoxError> {
        self.trigger_from(TRIGGER_SKIP)
    }

    /// Shared decision path; `skip_frames` is fixed by the call boundary
    /// so caller code starts at the top of every fingerprint.
    #[inline(never)]
    pub(crate) fn trigger_from(&self, skip_frames: usize) -> Result<(), BoxError> {
        let (fingerprint, depth) = stack::capture(skip_frames);

        let entry = if let Some(found) = self.entries.get(&fingerprint) {
            Arc::clone(&found)
        } else {
            // Racing creators reconcile here: one insert wins and the
            // losers adopt it.
            Arc::clone(
                self.entries
                    .entry(fingerprint)
                    .or_insert_with(|| Arc::new(Entry::with_skip(self.skip)))
                    .value(),
            )
        };

        // Steady-state fast path once the budget is spent.
        if entry.done.load(Ordering::Acquire) {
            return Ok(());
        }

        let next = entry.count.fetch_add(1, Ordering::AcqRel) + 1;
        if next <= 0 {
            // Inside the skip window; the callback is not consulted.
            return Ok(());
        }
        if next > i64::from(self.limit) {
            entry.done.store(true, Ordering::Release);
            return Ok(());
        }

        self.emitted.fetch_add(1, Ordering::Relaxed);
        log::trace!("emitting fault {next}/{} ({depth} frames)", self.limit);

        let fault = Fault::new(fingerprint.frames(depth));
        match &self.on_fault {
            Some(hook) => match hook(fault) {
                Some(err) => Err(err),
                None => Ok(()),
            },
            None => Err(fault.into()),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("limit", &self.limit)
            .field("skip", &self.skip)
            .field("stacks_seen", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`] policy.
///
/// Setters are applied in order and the last write to each knob wins.
/// Because the builder is consumed by [`build`](Builder::build), policy
/// cannot change once the engine starts taking triggers.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Engine::builder()
///     .limit(2)                       // two faults per unique stack
///     .skip(1)                        // let the first arrival succeed
///     .on_fault(|fault| Some(MyError::from(fault).into()))
///     .build();
/// ```
pub struct Builder {
    limit: u32,
    skip: u32,
    on_fault: Option<Box<FaultHook>>,
}

impl Builder {
    fn new() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            skip: 0,
            on_fault: None,
        }
    }

    /// Number of faults to emit per unique call stack.  Default 1.
    ///
    /// A limit of 0 never faults: paths are still fingerprinted and
    /// counted in [`Engine::stacks_seen`], which suits tests that only
    /// want call-path accounting.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Number of leading triggers per unique call stack to absorb with
    /// no fault before the limit starts counting.  Default 0.
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    /// Hook invoked synchronously with each pending fault.
    ///
    /// Replaces any previously configured hook.  The hook runs under no
    /// lock and must be safe to call concurrently.  A hook that calls
    /// back into the same engine will be fingerprinted as its own call
    /// path; that re-entrant growth is the caller's responsibility.
    pub fn on_fault<F>(mut self, hook: F) -> Self
    where
        F: Fn(Fault) -> Option<BoxError> + Send + Sync + 'static,
    {
        self.on_fault = Some(Box::new(hook));
        self
    }

    /// Finish the policy and produce an immutable engine.
    pub fn build(self) -> Engine {
        Engine {
            entries: DashMap::new(),
            limit: self.limit,
            skip: self.skip,
            on_fault: self.on_fault,
            emitted: AtomicU64::new(0),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
