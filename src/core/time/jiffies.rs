//! Arquivo: core/time/jiffies.rs
//!
//! Propósito: Jiffies (Contador de ticks do sistema).
//! "Jiffies" é o termo histórico (do Linux) para ticks de relógio.
//! O subsistema de I/O usa para carimbar ativações de slots do multiplexador.
//!
//! Detalhes de Implementação:
//! - Usa AtomicU64 para ser thread-safe e lock-free.
//! - Incrementado pelo handler do timer (registro do IRQ fica fora deste crate).

use core::sync::atomic::{AtomicU64, Ordering};

/// Ticks desde o boot.
static JIFFIES: AtomicU64 = AtomicU64::new(0);

/// Frequência do Tick (Ticks por segundo)
pub const HZ: u64 = 100;

/// Retorna o número atual de jiffies.
#[inline]
pub fn get_jiffies() -> u64 {
    JIFFIES.load(Ordering::Relaxed)
}

/// Incrementa o contador de jiffies e retorna o novo valor.
/// Deve ser chamado APENAS pelo handler de interrupção do timer.
#[inline]
pub fn inc_jiffies() -> u64 {
    JIFFIES.fetch_add(1, Ordering::Relaxed) + 1
}

/// Converte segundos para jiffies.
#[inline]
pub const fn seconds_to_jiffies(seconds: u64) -> u64 {
    seconds * HZ
}

/// Converte milisegundos para jiffies.
#[inline]
pub const fn millis_to_jiffies(millis: u64) -> u64 {
    (millis * HZ) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inc_is_monotonic() {
        let before = get_jiffies();
        let after = inc_jiffies();
        assert!(after > before);
        assert!(get_jiffies() >= after);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(seconds_to_jiffies(3), 300);
        assert_eq!(millis_to_jiffies(1000), HZ);
        assert_eq!(millis_to_jiffies(10), 1);
        assert_eq!(millis_to_jiffies(5), 0);
    }
}
