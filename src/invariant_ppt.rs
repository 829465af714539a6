//! Runtime invariant checks with a process-wide record of which invariants
//! were exercised.
//!
//! The session actor runs on a tokio worker, not on the test thread, so the
//! record is global rather than thread-local. Contract tests assert that the
//! invariants they care about were actually evaluated.
//!
//! ```rust,ignore
//! use crablens::assert_invariant;
//!
//! assert_invariant!(
//!     zoom.min <= zoom.current,
//!     "Published zoom range must satisfy 0 < min <= current <= max"
//! );
//!
//! crablens::invariant_ppt::contract_test("zoom", &[
//!     "Published zoom range must satisfy 0 < min <= current <= max",
//! ]);
//! ```

use std::collections::HashSet;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref CHECKED: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics with `INVARIANT VIOLATION` if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    if let Ok(mut checked) = CHECKED.lock() {
        if !checked.contains(message) {
            checked.insert(message.to_string());
        }
    }

    if !condition {
        panic!(
            "INVARIANT VIOLATION [{}]: {}",
            context.unwrap_or("unknown"),
            message
        );
    }
}

/// Whether `message` has been asserted at least once in this process.
pub fn was_checked(message: &str) -> bool {
    CHECKED
        .lock()
        .map(|checked| checked.contains(message))
        .unwrap_or(false)
}

/// Panic unless every listed invariant was evaluated.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !was_checked(inv))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}
