//! Forge Device I/O.
//!
//! Infraestrutura de I/O de dispositivos do kernel Forge: multiplexador de
//! dispositivos, ring buffer thread-safe e a cola mínima em volta deles
//! (catálogo de IOCTLs, helpers de storage, print de debug, jiffies).
//!
//! Sem `std` no kernel; os testes rodam no host com `std`.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Box/Arc/BTreeMap)
extern crate alloc;

// --- Base (debug, logging, tempo) ---
pub mod core;
pub mod sync; // Primitivas de Sincronização
pub mod sys; // Definições de Sistema (Erros)

// --- Utilitários Internos ---
pub mod klib;

// --- Camada de Dispositivos ---
pub mod drivers;
