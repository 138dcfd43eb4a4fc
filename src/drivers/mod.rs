//! # Camada de I/O de Dispositivos
//!
//! Infraestrutura que fica entre os drivers e os clientes: o multiplexador
//! de dispositivos, o ring buffer e a cola mínima (IOCTLs, helpers de
//! storage, a trait `Stream`).
//!
//! ## Módulos
//!
//! | Módulo        | Papel |
//! |---------------|-------|
//! | `stream`      | Trait `Stream`, provider por caminho, registro |
//! | `ioctl`       | Catálogo de códigos e argumentos |
//! | `ring_buffer` | Buffer circular thread-safe |
//! | `block`       | Helpers de storage sobre `Stream::ioctl` |
//! | `mux`         | Multiplexador (16 slots + stream virtual) |
//! | `loopback`    | Stream de eco sobre ring buffer |
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         Clientes (áudio, input, fs)         │
//! └─────────────────────────────────────────────┘
//!                      │ Stream
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │  mux::VirtualStream → slot ativo → driver   │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │   Drivers (staging em ring_buffer)          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod block;
pub mod ioctl;
pub mod loopback;
pub mod mux;
pub mod ring_buffer;
pub mod stream;

#[cfg(feature = "self_test")]
pub mod test;

#[cfg(test)]
mod tests;
