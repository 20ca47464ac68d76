//! Process-wide enablement gate.
//!
//! Fault injection is off by default so that production builds carry no
//! behavior change and no overhead beyond a single branch.  Two cargo
//! features open the gate:
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `enabled`  | Injection is unconditionally on at compile time         |
//! | `env-gate` | Injection is on when [`ENABLED_ENV`] is set and truthy  |
//!
//! Unit-test builds behave as gate-on so the scoped trigger paths stay
//! testable.  The environment is consulted once per process; the result
//! is cached for the lifetime of the program.

use std::sync::OnceLock;

/// Environment variable consulted by the `env-gate` feature.
///
/// Set `FAULTLINE_ENABLED=1` to turn injection on in builds compiled
/// with that feature.  An empty value, `0`, or `false` leaves the gate
/// closed.
pub const ENABLED_ENV: &str = "FAULTLINE_ENABLED";

static ENV_GATE: OnceLock<bool> = OnceLock::new();

/// Returns `true` if fault injection is enabled for this process.
///
/// Call sites must check this before any fingerprinting or engine
/// lookup; the scope-level [`trigger`](crate::scope::trigger) does so on
/// every call.  When the gate is closed every injection point behaves
/// exactly as if this crate were absent.
#[inline]
pub fn enabled() -> bool {
    if cfg!(any(test, feature = "enabled")) {
        return true;
    }
    if cfg!(feature = "env-gate") {
        return *ENV_GATE.get_or_init(resolve_env);
    }
    false
}

fn resolve_env() -> bool {
    let on = std::env::var(ENABLED_ENV)
        .map(|value| truthy(&value))
        .unwrap_or(false);
    log::debug!("{ENABLED_ENV} resolved: injection {}", if on { "on" } else { "off" });
    on
}

fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
