//! Call-stack fingerprinting.
//!
//! A [`Fingerprint`] condenses the live call stack into a fixed-width,
//! comparable key.  Two invocations reached through the same chain of
//! callers produce the same fingerprint; invocations reached through
//! different chains produce different ones.  The engine uses these keys
//! to meter fault emission per call path rather than per call site.
//!
//! Capture is a bounded walk over raw instruction pointers with no
//! allocation and no symbol resolution, cheap enough to run on every
//! injection point.  Symbolization happens lazily, and only for
//! diagnostics (see [`Fault::symbols`](crate::error::Fault::symbols)).

/// Maximum number of call stack entries used to determine uniqueness.
///
/// Stacks deeper than this are truncated: two call paths that agree on
/// their innermost `STACK_DEPTH` frames share a fingerprint.  That
/// approximation is intentional and keeps capture bounded.
pub const STACK_DEPTH: usize = 25;

/// A single captured stack frame, stored as a raw instruction pointer.
pub type Frame = usize;

/// Fixed-width encoding of the innermost [`STACK_DEPTH`] frames.
///
/// Shallower stacks are zero-padded; padding participates in equality
/// and hashing, so a shallow stack never aliases a deeper one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Fingerprint([Frame; STACK_DEPTH]);

impl Fingerprint {
    /// The real frames of this fingerprint, excluding zero padding.
    ///
    /// `depth` is the captured-frame count reported by [`capture`].
    pub(crate) fn frames(&self, depth: usize) -> &[Frame] {
        &self.0[..depth.min(STACK_DEPTH)]
    }
}

/// Walk the live call stack and build a [`Fingerprint`].
///
/// The first `skip` unwinder callbacks are dropped so that the engine's
/// own frames stay out of the key; what remains is caller code.  Returns
/// the fingerprint and the number of real frames stored, which may be
/// less than [`STACK_DEPTH`] for shallow stacks.
///
/// This function and the engine entry points above it are
/// `#[inline(never)]`, keeping the internal frame count stable across
/// optimization levels.  Any unwinder frames that survive the skip are
/// identical for every caller and cannot affect distinctness.
#[inline(never)]
pub(crate) fn capture(skip: usize) -> (Fingerprint, usize) {
    let mut frames = [0 as Frame; STACK_DEPTH];
    let mut stored = 0usize;
    let mut skipped = 0usize;

    backtrace::trace(|frame| {
        if skipped < skip {
            skipped += 1;
            return true;
        }
        frames[stored] = frame.ip() as Frame;
        stored += 1;
        stored < STACK_DEPTH
    });

    (Fingerprint(frames), stored)
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::hint::black_box;

    #[inline(never)]
    fn capture_here() -> (Fingerprint, usize) {
        black_box(1u32);
        capture(0)
    }

    #[inline(never)]
    fn capture_elsewhere() -> (Fingerprint, usize) {
        black_box(2u32);
        capture(0)
    }

    #[test]
    fn capture_records_real_frames() {
        let (fingerprint, depth) = capture_here();
        assert!(depth > 0);
        assert!(depth <= STACK_DEPTH);
        // The innermost frame is a real instruction pointer.
        assert_ne!(fingerprint.frames(depth)[0], 0);
    }

    #[test]
    fn same_call_site_repeats_the_same_fingerprint() {
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(capture_here().0);
        }
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1], seen[2]);
    }

    #[test]
    fn different_call_paths_differ() {
        let (a, _) = capture_here();
        let (b, _) = capture_elsewhere();
        assert_ne!(a, b);
    }

    #[test]
    fn skipping_past_the_whole_stack_yields_empty_padding() {
        let (fingerprint, depth) = capture(4096);
        assert_eq!(depth, 0);
        assert_eq!(fingerprint, Fingerprint([0; STACK_DEPTH]));
    }

    #[test]
    fn padding_participates_in_equality() {
        let (real, depth) = capture_here();
        assert!(depth > 0);
        assert_ne!(real, Fingerprint([0; STACK_DEPTH]));
    }
}
