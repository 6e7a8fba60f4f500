//! Scoped critical sections.
//!
//! Every mutation of the pool state happens while a [`CriticalSection`] guard
//! is alive. The guard masks interrupts (or whatever the host's
//! `critical-section` implementation does) on creation and restores the
//! previous state when dropped, so every early return releases it.

use core::{
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use critical_section::RestoreState;

/// RAII guard for one acquisition of the host critical section.
#[derive(Debug)]
pub struct CriticalSection {
    restore: RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl CriticalSection {
    #[must_use]
    pub fn enter() -> Self {
        let restore = unsafe { critical_section::acquire() };
        Self {
            restore,
            _not_send: PhantomData,
        }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        unsafe { critical_section::release(self.restore) }
    }
}

/// A spin mutex that also holds the critical section while locked.
///
/// The critical section keeps interrupt handlers on the same core out; the
/// spin lock keeps other cores out.
pub struct IrqMutex<T> {
    inner: spin::Mutex<T>,
}

impl<T> IrqMutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: spin::Mutex::new(data),
        }
    }

    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let critical_section = CriticalSection::enter();
        IrqMutexGuard {
            guard: self.inner.lock(),
            _critical_section: critical_section,
        }
    }

    pub fn try_lock(&self) -> Option<IrqMutexGuard<'_, T>> {
        let critical_section = CriticalSection::enter();
        let guard = self.inner.try_lock()?;
        Some(IrqMutexGuard {
            guard,
            _critical_section: critical_section,
        })
    }
}

impl<T> fmt::Debug for IrqMutex<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("IrqMutex");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &"<locked>"),
        };
        d.finish()
    }
}

/// Lock guard of [`IrqMutex`].
///
/// Fields drop in declaration order: the spin lock is released before the
/// critical section ends.
pub struct IrqMutexGuard<'a, T> {
    guard: spin::MutexGuard<'a, T>,
    _critical_section: CriticalSection,
}

impl<T> Deref for IrqMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
