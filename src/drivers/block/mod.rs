//! # Dispositivos de Bloco
//!
//! Helpers que traduzem operações de bloco para os IOCTLs de storage.
//! O despacho dos IOCTLs fica no driver que implementa `Stream`.

pub mod storage;

pub use storage::{get_block_count, get_block_size, read_blocks, write_blocks};
