//! Multiplexador de dispositivos
//!
//! Um stream primário, 16 slots secundários e um stream virtual que
//! encaminha toda chamada para o slot ativo.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

use super::descriptor::{DescriptorRef, DeviceDescriptor, PRIMARY_SLOT};
use super::vstream::VirtualStream;
use super::{MuxError, MAX_SLOTS, NO_ACTIVE_SLOT};
use crate::drivers::stream::{Stream, StreamError, StreamHandle, StreamProvider};
use crate::sync::RwLock;

bitflags! {
    /// Direção do fluxo de dados do multiplexador
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Direction: u32 {
        /// Clientes leem (ex: microfone, teclado)
        const INPUT = 1 << 0;
        /// Clientes escrevem (ex: saída de áudio)
        const OUTPUT = 1 << 1;
        const BIDIRECTIONAL = Self::INPUT.bits() | Self::OUTPUT.bits();
    }
}

/// Escolha de slot no `add_device`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequest {
    /// Menor índice livre
    Auto,
    /// Índice exato
    Index(usize),
}

/// Origem do dispositivo no `add_device`
pub enum DeviceSource<'a> {
    /// Aberto pelo provider; fechado na remoção
    Path(&'a str),
    /// Já aberto pelo chamador; nunca fechado por nós
    Stream(Arc<dyn Stream>),
}

/// Estado público de um slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: usize,
    pub active: bool,
    /// Forwards em voo
    pub refs: usize,
    /// Jiffies da última ativação (0 se nunca ativado)
    pub activated_at: u64,
    /// Stream aberto pelo multiplexador
    pub owned: bool,
}

/// ID do próximo multiplexador
static NEXT_MUX_ID: AtomicU32 = AtomicU32::new(1);

// =============================================================================
// TABELA DE SLOTS
// =============================================================================

pub(crate) enum Slot {
    Empty,
    Occupied(Arc<DeviceDescriptor>),
}

pub(crate) struct SlotTable {
    slots: [Slot; MAX_SLOTS],
    active: usize,
    occupied: usize,
    torn_down: bool,
}

impl SlotTable {
    fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::Empty),
            active: NO_ACTIVE_SLOT,
            occupied: 0,
            torn_down: false,
        }
    }

    fn descriptor(&self, slot: usize) -> Option<&Arc<DeviceDescriptor>> {
        match self.slots.get(slot) {
            Some(Slot::Occupied(desc)) => Some(desc),
            _ => None,
        }
    }

    fn active_descriptor(&self) -> Option<Arc<DeviceDescriptor>> {
        self.descriptor(self.active).cloned()
    }

    /// First-fit crescente para `Auto`
    fn pick(&self, request: SlotRequest) -> Result<usize, MuxError> {
        match request {
            SlotRequest::Auto => self
                .slots
                .iter()
                .position(|s| matches!(s, Slot::Empty))
                .ok_or(MuxError::NoFreeSlot),
            SlotRequest::Index(i) => match self.slots.get(i) {
                Some(Slot::Empty) => Ok(i),
                _ => Err(MuxError::NoFreeSlot),
            },
        }
    }
}

/// Estado compartilhado entre o multiplexador e seu stream virtual
pub(crate) struct MuxShared {
    pub(crate) id: u32,
    pub(crate) direction: Direction,
    table: RwLock<SlotTable>,
}

impl MuxShared {
    /// Snapshot do slot ativo: adquire referência com a tabela em leitura.
    pub(crate) fn acquire_active(&self) -> Result<DescriptorRef, StreamError> {
        let table = self.table.read();
        if table.torn_down {
            return Err(StreamError::Closed);
        }
        match table.descriptor(table.active) {
            Some(desc) => {
                debug_assert_eq!(desc.owner(), self.id);
                desc.acquire()
            }
            None => Err(StreamError::NoActiveDevice),
        }
    }
}

// =============================================================================
// MULTIPLEXADOR
// =============================================================================

/// Multiplexador de dispositivos
pub struct DeviceMultiplexer {
    shared: Arc<MuxShared>,
    primary: Arc<DeviceDescriptor>,
    provider: Option<Arc<dyn StreamProvider>>,
    vstream: Arc<VirtualStream>,
}

impl DeviceMultiplexer {
    /// Cria um multiplexador abrindo `primary_path` pelo provider.
    ///
    /// O primário é nosso: fechado no `destroy`.
    pub fn create(
        direction: Direction,
        primary_path: &str,
        provider: Arc<dyn StreamProvider>,
    ) -> Result<Self, MuxError> {
        let stream = provider.open(primary_path).map_err(|e| {
            crate::kerror!("(Mux) Falha ao abrir primário, errno=", e.errno().as_usize());
            MuxError::Stream(e)
        })?;
        Ok(Self::build(direction, StreamHandle::Owned(stream), Some(provider)))
    }

    /// Cria um multiplexador sobre um stream já aberto (emprestado).
    pub fn create2(direction: Direction, primary: Arc<dyn Stream>) -> Self {
        Self::build(direction, StreamHandle::Borrowed(primary), None)
    }

    fn build(
        direction: Direction,
        primary: StreamHandle,
        provider: Option<Arc<dyn StreamProvider>>,
    ) -> Self {
        let id = NEXT_MUX_ID.fetch_add(1, Ordering::Relaxed);
        let owned = primary.is_owned();

        let desc = Arc::new(DeviceDescriptor::new(id, PRIMARY_SLOT));
        desc.attach(primary);

        let shared = Arc::new(MuxShared {
            id,
            direction,
            table: RwLock::new(SlotTable::new()),
        });
        let vstream = Arc::new(VirtualStream::new(shared.clone()));

        if owned {
            crate::kinfo!("(Mux) Criado (primário próprio) id=", id);
        } else {
            crate::kinfo!("(Mux) Criado (primário emprestado) id=", id);
        }

        Self {
            shared,
            primary: desc,
            provider,
            vstream,
        }
    }

    /// Destrói o multiplexador.
    ///
    /// Desativa o slot ativo (drenando forwards), destrói todos os
    /// descritores e fecha o primário se ele for nosso. Retorna o erro de
    /// fechamento do primário, se houver; a destruição acontece de qualquer
    /// forma.
    pub fn destroy(mut self) -> Result<(), MuxError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), MuxError> {
        let mut table = self.shared.table.write();
        if table.torn_down {
            return Ok(());
        }
        table.torn_down = true;

        if let Some(active) = table.active_descriptor() {
            active.deactivate();
        }
        table.active = NO_ACTIVE_SLOT;

        for slot in table.slots.iter_mut() {
            if let Slot::Occupied(desc) = core::mem::replace(slot, Slot::Empty) {
                // Erro de fechamento de secundário não impede o teardown
                if desc.destroy().is_err() {
                    crate::kwarn!("(Mux) Falha ao fechar secundário, slot=", desc.slot());
                }
            }
        }
        table.occupied = 0;
        drop(table);

        crate::kinfo!("(Mux) Destruído id=", self.shared.id);
        self.primary.destroy()
    }

    /// Adiciona um dispositivo num slot.
    ///
    /// Retorna o índice escolhido e o stream do dispositivo (emprestado).
    /// Falha de abertura não altera a tabela.
    pub fn add_device(
        &self,
        request: SlotRequest,
        source: DeviceSource<'_>,
    ) -> Result<(usize, Arc<dyn Stream>), MuxError> {
        let mut table = self.shared.table.write();
        let slot = table.pick(request).map_err(|e| {
            crate::kwarn!("(Mux) Sem slot livre, ocupados=", table.occupied);
            e
        })?;

        let handle = match source {
            DeviceSource::Path(path) => {
                let provider = self.provider.as_ref().ok_or(StreamError::NotFound)?;
                StreamHandle::Owned(provider.open(path)?)
            }
            DeviceSource::Stream(stream) => StreamHandle::Borrowed(stream),
        };
        let stream = handle.stream().clone();

        let desc = Arc::new(DeviceDescriptor::new(self.shared.id, slot));
        desc.attach(handle);
        table.slots[slot] = Slot::Occupied(desc);
        table.occupied += 1;

        crate::kdebug!("(Mux) Dispositivo adicionado, slot=", slot);
        Ok((slot, stream))
    }

    /// Remove o dispositivo de um slot.
    ///
    /// Bloqueia até as referências em voo terminarem. Slot ativo falha com
    /// `DeviceBusy`. Falha ao fechar um dispositivo próprio é devolvida como
    /// `Stream`, mas o slot já está livre nesse ponto.
    pub fn remove_device(&self, slot: usize) -> Result<(), MuxError> {
        let mut table = self.shared.table.write();
        let desc = table.descriptor(slot).cloned().ok_or(MuxError::InvalidSlot)?;
        if table.active == slot {
            crate::kwarn!("(Mux) Remoção do slot ativo recusada, slot=", slot);
            return Err(MuxError::DeviceBusy);
        }

        let result = desc.destroy();
        table.slots[slot] = Slot::Empty;
        table.occupied -= 1;

        crate::kdebug!("(Mux) Dispositivo removido, slot=", slot);
        result
    }

    /// Stream do dispositivo num slot (emprestado: não feche).
    pub fn get_device_stream(&self, slot: usize) -> Result<Arc<dyn Stream>, MuxError> {
        let table = self.shared.table.read();
        table
            .descriptor(slot)
            .and_then(|d| d.stream())
            .ok_or(MuxError::InvalidSlot)
    }

    /// Torna `slot` o destino do I/O.
    ///
    /// Retorna depois que os forwards em voo no slot anterior terminam.
    pub fn switch_to(&self, slot: usize) -> Result<(), MuxError> {
        let mut table = self.shared.table.write();
        let new = table.descriptor(slot).cloned().ok_or(MuxError::InvalidSlot)?;

        if table.active != slot {
            let old = table.active_descriptor();
            table.active = slot;
            if let Some(old) = old {
                old.deactivate();
            }
        }
        new.activate();

        crate::kdebug!("(Mux) Slot ativo=", slot);
        Ok(())
    }

    /// Deixa o multiplexador sem slot ativo.
    pub fn deactivate(&self) {
        let mut table = self.shared.table.write();
        if let Some(old) = table.active_descriptor() {
            table.active = NO_ACTIVE_SLOT;
            old.deactivate();
            crate::kdebug!("(Mux) Nenhum slot ativo, anterior=", old.slot());
        }
    }

    pub fn direction(&self) -> Direction {
        self.shared.direction
    }

    /// Slot ativo, ou `None` se nenhum
    pub fn active_slot(&self) -> Option<usize> {
        let active = self.shared.table.read().active;
        (active != NO_ACTIVE_SLOT).then_some(active)
    }

    pub fn occupied_count(&self) -> usize {
        self.shared.table.read().occupied
    }

    /// Stream virtual exposto aos clientes
    pub fn stream(&self) -> Arc<dyn Stream> {
        self.vstream.clone()
    }

    /// Stream primário (emprestado: não feche)
    pub fn primary_stream(&self) -> Option<Arc<dyn Stream>> {
        self.primary.stream()
    }

    pub fn slot_info(&self, slot: usize) -> Result<SlotInfo, MuxError> {
        let table = self.shared.table.read();
        let desc = table.descriptor(slot).ok_or(MuxError::InvalidSlot)?;
        let status = desc.status();
        Ok(SlotInfo {
            slot,
            active: table.active == slot,
            refs: status.refs,
            activated_at: status.activated_at,
            owned: status.owned,
        })
    }

    /// Bloqueia até `slot` ficar ativo.
    ///
    /// Para drivers que só devem produzir I/O quando selecionados.
    pub fn wait_active(&self, slot: usize) -> Result<(), MuxError> {
        let desc = self
            .shared
            .table
            .read()
            .descriptor(slot)
            .cloned()
            .ok_or(MuxError::InvalidSlot)?;
        desc.wait_activation().map_err(MuxError::Stream)
    }
}

impl Drop for DeviceMultiplexer {
    fn drop(&mut self) {
        if self.teardown().is_err() {
            crate::kwarn!("(Mux) Falha ao fechar primário no drop, id=", self.shared.id);
        }
    }
}
