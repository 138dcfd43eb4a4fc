//! Mutex - pode bloquear thread

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// Mutex - cede a CPU se não conseguir lock
///
/// # Diferença do Spinlock
///
/// - Mutex PODE dormir (cede a CPU entre tentativas)
/// - Spinlock NÃO pode dormir (busy-wait)
///
/// Use Mutex para seções mais longas. É o único lock aceito por `CondVar`.
pub struct Mutex<T> {
    /// Estado do lock
    locked: AtomicBool,
    /// Dados protegidos
    data: UnsafeCell<T>,
}

// SAFETY: Mutex protege acesso com lock
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock (pode bloquear)
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let mut spins = 0u32;
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Backoff curto antes de ceder a CPU
            if spins < super::SPIN_LIMIT {
                spins += 1;
                core::hint::spin_loop();
            } else {
                super::relax();
            }
        }

        MutexGuard { lock: self }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(MutexGuard { lock: self })
        } else {
            None
        }
    }

    /// Acesso exclusivo sem lock (o borrow checker já garante exclusão)
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consome o mutex e devolve os dados
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct MutexGuard<'a, T> {
    lock: &'a Mutex<T>,
}

impl<'a, T> MutexGuard<'a, T> {
    /// Mutex dono deste guard (usado pela CondVar para religar o lock)
    pub(crate) fn mutex(&self) -> &'a Mutex<T> {
        self.lock
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_unlock() {
        let m = Mutex::new(5);
        {
            let mut g = m.lock();
            *g += 1;
            assert!(m.try_lock().is_none());
        }
        assert_eq!(*m.lock(), 6);
        assert_eq!(m.into_inner(), 6);
    }

    #[test]
    fn test_mutual_exclusion() {
        let m = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4u8)
            .map(|id| {
                let m = m.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let mut v = m.lock();
                        // Par push/push deve ficar contíguo
                        v.push(id);
                        v.push(id);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let v = m.lock();
        assert_eq!(v.len(), 4000);
        for pair in v.chunks(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }
}
