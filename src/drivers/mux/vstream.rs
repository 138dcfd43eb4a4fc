//! Stream virtual do multiplexador
//!
//! Implementa `Stream` encaminhando cada chamada para o descritor do slot
//! ativo. O snapshot (slot ativo → descritor → referência) é feito com a
//! tabela em leitura; o I/O roda fora do lock, segurando a referência.

use alloc::sync::Arc;

use super::multiplexer::{Direction, MuxShared};
use super::NO_ACTIVE_SLOT;
use crate::drivers::ioctl::{self, IoctlArg};
use crate::drivers::stream::{Stream, StreamError};

/// Stream exposto pelo multiplexador
pub struct VirtualStream {
    /// Reservado: sempre `NO_ACTIVE_SLOT` (segue o slot ativo)
    slot: usize,
    owner: Arc<MuxShared>,
}

impl VirtualStream {
    pub(crate) fn new(owner: Arc<MuxShared>) -> Self {
        Self {
            slot: NO_ACTIVE_SLOT,
            owner,
        }
    }

    /// Slot fixo do stream (`NO_ACTIVE_SLOT` = segue o ativo)
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// ID do multiplexador dono
    pub fn owner_id(&self) -> u32 {
        self.owner.id
    }

    fn require(&self, dir: Direction) -> Result<(), StreamError> {
        if self.owner.direction.contains(dir) {
            Ok(())
        } else {
            Err(StreamError::NotSupported)
        }
    }
}

impl Stream for VirtualStream {
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.require(Direction::INPUT)?;
        let target = self.owner.acquire_active()?;
        target.stream().read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        self.require(Direction::OUTPUT)?;
        let target = self.owner.acquire_active()?;
        target.stream().write(buf)
    }

    fn ioctl(&self, cmd: u32, arg: IoctlArg<'_>) -> Result<usize, StreamError> {
        let target = self.owner.acquire_active()?;
        crate::ktrace!("(Mux) ioctl encaminhado, slot=", target.slot());
        let result = target.stream().ioctl(cmd, arg);
        if result.is_err() {
            crate::kdebug!("(Mux) ioctl falhou, cmd=", cmd);
            crate::kdebug!(ioctl::name_of(cmd));
        }
        result
    }

    fn close(&self) -> Result<(), StreamError> {
        let target = self.owner.acquire_active()?;
        target.stream().close()
    }
}
