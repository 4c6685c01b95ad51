use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};

/// A value that may be accessed from interrupt handlers and from the
/// cooperative run loop.
///
/// Every access runs inside a critical section, so closures passed to
/// [`IrqCell::lock()`] must be short and must never block.
pub struct IrqCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> IrqCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Runs the given closure with exclusive access to the protected value.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| self.lock_in(cs, f))
    }

    /// Like [`IrqCell::lock()`] but re-uses a critical section that the
    /// caller already entered. This allows several cells to be updated
    /// atomically.
    ///
    /// Nesting `lock_in()` calls on the same cell panics, just like nested
    /// [`RefCell::borrow_mut()`] calls.
    pub fn lock_in<R>(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_ref_mut(cs))
    }

    /// Get access to the protected value without entering a critical
    /// section. Similar to `Mutex::get_mut()` in std.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().get_mut()
    }
}

impl<T: Copy> IrqCell<T> {
    /// Returns a copy of the protected value.
    pub fn get(&self) -> T {
        self.lock(|value| *value)
    }

    /// Replaces the protected value.
    pub fn set(&self, value: T) {
        self.lock(|inner| *inner = value)
    }
}

impl<T: Default> Default for IrqCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
