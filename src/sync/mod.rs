//! # Synchronization Primitives
//!
//! Primitivas de sincronização usadas pelo ring buffer e pelo multiplexador.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! Spinlock   → Seções críticas curtas (não pode dormir)
//! Mutex      → Seções que podem bloquear (pode dormir)
//! RwLock     → Muitos leitores, poucos escritores (tabela de slots)
//! CondVar    → Espera por condição (ativação/destruição de descritores)
//! ```
//!
//! ## Regras
//!
//! - **Spinlock**: Usar apenas quando NÃO pode dormir
//! - **Mutex**: Preferir para seções normais do kernel
//! - **Ordem de Lock**: tabela de slots ANTES do lock do descritor

// =============================================================================
// PRIMITIVAS BÁSICAS
// =============================================================================

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

/// Mutex (pode bloquear thread)
pub mod mutex;

// =============================================================================
// PRIMITIVAS AVANÇADAS
// =============================================================================

/// Reader-Writer Lock
pub mod rwlock;

/// Condition Variable
pub mod condvar;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use condvar::CondVar;
pub use mutex::{Mutex, MutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spinlock::{Spinlock, SpinlockGuard};

/// Tentativas de spin antes de ceder a CPU em locks que podem dormir.
const SPIN_LIMIT: u32 = 64;

/// Cede a CPU enquanto espera por um lock que pode dormir.
///
/// No host (testes) devolve o time slice ao SO; no kernel é um hint de spin.
#[inline]
pub(crate) fn relax() {
    #[cfg(test)]
    std::thread::yield_now();
    #[cfg(not(test))]
    core::hint::spin_loop();
}
