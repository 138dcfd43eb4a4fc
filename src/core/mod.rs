//! Core Module
//!
//! Serviços mínimos de que o subsistema de I/O precisa: logging,
//! saída de debug e o contador de ticks.

pub mod debug;
pub mod logging;
pub mod time;
