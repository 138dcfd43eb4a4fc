//! Reader-Writer Lock

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// RwLock - múltiplos leitores OU um escritor
///
/// Contador:
/// - 0 = Livre
/// - N>0 = N leitores ativos
/// - -1 = Escritor ativo
///
/// Escritores têm preferência: com um escritor na fila, novos leitores
/// esperam.
pub struct RwLock<T> {
    state: AtomicI32,
    writer_waiting: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            state: AtomicI32::new(0),
            writer_waiting: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire lock de leitura
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        loop {
            let state = self.state.load(Ordering::Acquire);

            // Se escritor ativo ou esperando, esperar
            if state < 0 || self.writer_waiting.load(Ordering::Relaxed) {
                super::relax();
                continue;
            }

            // Tentar incrementar leitores
            if self
                .state
                .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return RwLockReadGuard { lock: self };
            }
        }
    }

    /// Adquire lock de escrita
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        loop {
            if self
                .state
                .compare_exchange_weak(0, -1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                self.writer_waiting.store(false, Ordering::Relaxed);
                return RwLockWriteGuard { lock: self };
            }
            self.writer_waiting.store(true, Ordering::Relaxed);
            super::relax();
        }
    }

    /// Acesso exclusivo sem lock
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: Lock de leitura adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: Lock de escrita adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock de escrita adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_readers() {
        let lock = RwLock::new(7);
        let a = lock.read();
        let b = lock.read();
        assert_eq!(*a + *b, 14);
    }

    #[test]
    fn test_writer_after_readers_release() {
        let lock = RwLock::new(0);
        {
            let _r = lock.read();
        }
        *lock.write() = 3;
        assert_eq!(*lock.read(), 3);
    }
}
