//! Condition Variable

use core::sync::atomic::{AtomicUsize, Ordering};

use super::mutex::MutexGuard;

/// Condition Variable
///
/// Permite que threads esperem por uma condição protegida por um `Mutex`.
/// Implementada com um contador de gerações: `wait` libera o mutex, espera
/// a geração mudar e religa o lock. Acordar sem a condição ser verdadeira é
/// permitido, então o chamador SEMPRE testa o predicado em loop:
///
/// ```ignore
/// let mut state = lock.lock();
/// while state.refs != 0 {
///     state = cond.wait(state);
/// }
/// ```
pub struct CondVar {
    generation: AtomicUsize,
}

impl CondVar {
    pub const fn new() -> Self {
        Self {
            generation: AtomicUsize::new(0),
        }
    }

    /// Espera por uma notificação.
    ///
    /// Libera o lock atomicamente em relação a notificadores que alteram o
    /// predicado com o lock adquirido, e o religa antes de retornar.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let mutex = guard.mutex();
        // Geração lida com o lock adquirido: quem muda o predicado depois
        // daqui também incrementa a geração depois daqui.
        let seen = self.generation.load(Ordering::Acquire);
        drop(guard);

        while self.generation.load(Ordering::Acquire) == seen {
            super::relax();
        }

        mutex.lock()
    }

    /// Espera até `condition` retornar false.
    pub fn wait_while<'a, T, F>(&self, mut guard: MutexGuard<'a, T>, mut condition: F) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut *guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// Acorda uma thread esperando.
    ///
    /// Sem fila de espera do scheduler todos os waiters observam a nova
    /// geração; os que perderem a corrida voltam a dormir pelo predicado.
    pub fn notify_one(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Acorda todas as threads esperando.
    pub fn notify_all(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}
