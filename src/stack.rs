//! Stack growth for the recursive passes.
//!
//! Parsing, resolving and evaluating all recurse once per nesting level of
//! the program (and evaluation once more per Ling call), so a deep but valid
//! script would otherwise exhaust the native stack.

/// Run `f`, first moving to a fresh stack segment if the current one is
/// nearly used up.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Space that must remain before `f` runs (128 KiB).
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each newly allocated segment (2 MiB).
    const SEGMENT: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, SEGMENT, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
