//! # Device Multiplexer
//!
//! Permite que vários dispositivos lógicos compartilhem um único stream de
//! driver e alternem o acesso a ele.
//!
//! ## Arquitetura
//!
//! ```text
//!              clientes (read/write/ioctl/close)
//!                            │
//!                            ▼
//!                 ┌─────────────────────┐
//!                 │    VirtualStream    │  snapshot: slot ativo → descritor
//!                 └──────────┬──────────┘
//!                            │ (slot ativo)
//!   ┌─────┬─────┬─────┬──────▼─────┬─────┬───────────┐
//!   │  0  │  1  │  2  │     3      │ ... │    15     │  16 slots secundários
//!   └─────┴─────┴─────┴────────────┴─────┴───────────┘
//!                 + descritor primário (owned ou borrowed)
//! ```
//!
//! ## Protocolo de troca
//!
//! - `add_device`/`remove_device`/`switch_to` adquirem a tabela em escrita.
//! - O forwarding lê `active_slot` e adquire uma referência no descritor
//!   com a tabela em leitura; o I/O roda fora do lock, segurando a referência.
//! - `switch_to` só conclui depois que os forwards em voo no descritor
//!   antigo terminam; `remove_device` só libera o descritor depois que a
//!   contagem de referências chega a zero.
//! - Remover o slot ativo falha com `DeviceBusy`: troque antes.

use core::fmt;

use crate::drivers::stream::StreamError;
use crate::sys::Errno;

pub mod descriptor;
pub mod multiplexer;
pub mod vstream;

pub use multiplexer::{DeviceMultiplexer, DeviceSource, Direction, SlotInfo, SlotRequest};
pub use vstream::VirtualStream;

/// Número de slots secundários
pub const MAX_SLOTS: usize = 16;

/// Sentinela: nenhum slot ativo
pub const NO_ACTIVE_SLOT: usize = MAX_SLOTS;

/// Erros do multiplexador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxError {
    /// Todos os slots ocupados, ou o índice pedido está ocupado/fora da faixa
    NoFreeSlot,
    /// Slot fora da faixa ou vazio
    InvalidSlot,
    /// Slot ativo não pode ser removido
    DeviceBusy,
    /// Falha do stream subjacente, sem alteração
    Stream(StreamError),
}

impl MuxError {
    pub fn errno(self) -> Errno {
        match self {
            MuxError::NoFreeSlot => Errno::ENOSPC,
            MuxError::InvalidSlot => Errno::EINVAL,
            MuxError::DeviceBusy => Errno::EBUSY,
            MuxError::Stream(e) => e.errno(),
        }
    }
}

impl From<StreamError> for MuxError {
    fn from(e: StreamError) -> Self {
        MuxError::Stream(e)
    }
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuxError::NoFreeSlot => write!(f, "Nenhum slot livre"),
            MuxError::InvalidSlot => write!(f, "Slot inválido"),
            MuxError::DeviceBusy => write!(f, "Dispositivo ocupado (slot ativo)"),
            MuxError::Stream(e) => write!(f, "Stream: {}", e),
        }
    }
}
