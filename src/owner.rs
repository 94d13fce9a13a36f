//! # Single Owner
//!
//! Lazy, first-call-wins accessor for one long-lived instance.
//!
//! Kept as a legacy convenience for embedding contexts that cannot thread
//! an explicit handle to the polling loop; the application itself
//! constructs an [`crate::input::system::InputSystem`] once and passes it
//! explicitly. Built on [`std::sync::OnceLock`], so concurrent first-access
//! is safe; the first-call-wins semantics are otherwise identical to the
//! original behavior: the initializer is honored only on the first call and
//! silently ignored afterward, every access returns the same instance, and
//! there is no destruction path.
//!
//! # Examples
//!
//! ```
//! use hotas_input::owner::SingleOwner;
//!
//! static COUNTER_START: SingleOwner<u32> = SingleOwner::new();
//!
//! let first = COUNTER_START.instance(|| 7);
//! let second = COUNTER_START.instance(|| 99); // initializer ignored
//! assert_eq!(*first, 7);
//! assert_eq!(*second, 7);
//! ```

use std::sync::OnceLock;

/// Holds at most one lazily constructed `T` for the rest of the process.
#[derive(Debug)]
pub struct SingleOwner<T> {
    slot: OnceLock<T>,
}

impl<T> SingleOwner<T> {
    /// An empty owner; nothing is constructed until the first access.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// The instance, constructing it with `init` on the first call only.
    pub fn instance<F: FnOnce() -> T>(&self, init: F) -> &T {
        self.slot.get_or_init(init)
    }

    /// The instance if it has been constructed already.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }
}

impl<T> Default for SingleOwner<T> {
    fn default() -> Self {
        Self::new()
    }
}
