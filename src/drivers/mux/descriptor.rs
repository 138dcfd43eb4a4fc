//! Descritor de dispositivo
//!
//! Wrapper com contagem de referências em volta de um stream aberto.
//! Interno ao multiplexador: clientes só veem o stream.
//!
//! ## Ciclo de vida
//!
//! ```text
//! new() ──attach()──> inicializado ──activate()──> ativo
//!   (vazio)               ▲   │                     │
//!                         │   └──────destroy()──┐   │ deactivate()
//!                         └─────────────────────┼───┘ (espera refs == 0)
//!                                               ▼
//!                                 destruído (refs == 0, handle solto)
//! ```
//!
//! O lock do descritor protege contagem, flags e handle; NÃO protege a
//! pertença à tabela de slots (isso é da tabela).

use alloc::sync::Arc;

use super::{MuxError, NO_ACTIVE_SLOT};
use crate::core::time::jiffies;
use crate::drivers::stream::{Stream, StreamError, StreamHandle};
use crate::sync::{CondVar, Mutex};

/// Índice usado pelo descritor primário
pub const PRIMARY_SLOT: usize = NO_ACTIVE_SLOT;

struct DescriptorState {
    refs: usize,
    initialized: bool,
    destroying: bool,
    active: bool,
    activated_at: u64,
    handle: Option<StreamHandle>,
}

pub(crate) struct DeviceDescriptor {
    /// Multiplexador dono
    owner: u32,
    /// Slot na tabela (PRIMARY_SLOT para o primário)
    slot: usize,
    state: Mutex<DescriptorState>,
    /// Sinalizada quando o slot passa a receber I/O
    activation: CondVar,
    /// Sinalizada quando a última referência é solta
    destruction: CondVar,
}

/// Fotografia do estado, para introspecção
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DescriptorStatus {
    pub refs: usize,
    pub active: bool,
    pub activated_at: u64,
    pub owned: bool,
}

impl DeviceDescriptor {
    /// Descritor vazio (ainda sem stream)
    pub(crate) fn new(owner: u32, slot: usize) -> Self {
        Self {
            owner,
            slot,
            state: Mutex::new(DescriptorState {
                refs: 0,
                initialized: false,
                destroying: false,
                active: false,
                activated_at: 0,
                handle: None,
            }),
            activation: CondVar::new(),
            destruction: CondVar::new(),
        }
    }

    /// Liga um stream e marca o descritor como inicializado.
    pub(crate) fn attach(&self, handle: StreamHandle) {
        let mut state = self.state.lock();
        state.handle = Some(handle);
        state.initialized = true;
        state.destroying = false;
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    /// Stream emprestado (sem contar referência)
    pub(crate) fn stream(&self) -> Option<Arc<dyn Stream>> {
        self.state.lock().handle.as_ref().map(|h| h.stream().clone())
    }

    pub(crate) fn status(&self) -> DescriptorStatus {
        let state = self.state.lock();
        DescriptorStatus {
            refs: state.refs,
            active: state.active,
            activated_at: state.activated_at,
            owned: state.handle.as_ref().is_some_and(|h| h.is_owned()),
        }
    }

    /// Adquire uma referência para I/O.
    ///
    /// Falha se o descritor não tem stream ou se a destruição já começou.
    pub(crate) fn acquire(self: &Arc<Self>) -> Result<DescriptorRef, StreamError> {
        let mut state = self.state.lock();
        if !state.initialized || state.destroying {
            return Err(StreamError::NoActiveDevice);
        }
        let stream = match state.handle.as_ref() {
            Some(h) => h.stream().clone(),
            None => return Err(StreamError::NoActiveDevice),
        };
        state.refs += 1;
        Ok(DescriptorRef {
            desc: self.clone(),
            stream,
        })
    }

    fn release_ref(&self) {
        let mut state = self.state.lock();
        state.refs -= 1;
        if state.refs == 0 {
            self.destruction.notify_all();
        }
    }

    /// Marca o slot como ativo e acorda quem espera pela ativação.
    pub(crate) fn activate(&self) {
        let mut state = self.state.lock();
        state.active = true;
        state.activated_at = jiffies::get_jiffies();
        drop(state);
        self.activation.notify_all();
        crate::ktrace!("(Mux) Slot ativado=", self.slot);
    }

    /// Tira o slot do ar e espera os forwards em voo terminarem.
    pub(crate) fn deactivate(&self) {
        let mut state = self.state.lock();
        state.active = false;
        if state.refs > 0 {
            crate::kdebug!("(Mux) Drenando forwards no slot=", self.slot);
        }
        let _state = self.destruction.wait_while(state, |s| s.refs > 0);
    }

    /// Bloqueia até o slot ficar ativo.
    pub(crate) fn wait_activation(&self) -> Result<(), StreamError> {
        let state = self.state.lock();
        let state = self
            .activation
            .wait_while(state, |s| !s.active && s.initialized && !s.destroying);
        if state.active {
            Ok(())
        } else {
            Err(StreamError::Closed)
        }
    }

    /// Destrói o descritor: bloqueia novas referências, espera as atuais
    /// terminarem e solta o handle (fechando apenas streams próprios).
    ///
    /// Nunca destrói um descritor ativo. Falha ao fechar é propagada, mas a
    /// destruição já está completa quando isso acontece.
    pub(crate) fn destroy(&self) -> Result<(), MuxError> {
        let mut state = self.state.lock();
        if state.active {
            crate::kwarn!("(Mux) Recusado destruir descritor ativo, slot=", self.slot);
            return Err(MuxError::DeviceBusy);
        }
        if !state.initialized {
            return Ok(());
        }

        state.destroying = true;
        let mut state = self.destruction.wait_while(state, |s| s.refs > 0);
        let handle = state.handle.take();
        state.initialized = false;
        drop(state);

        // Quem espera ativação precisa ver que o descritor morreu
        self.activation.notify_all();

        crate::ktrace!("(Mux) Descritor destruído, slot=", self.slot);
        match handle {
            Some(h) => h.release().map_err(|e| {
                crate::kwarn!("(Mux) Falha ao fechar stream, errno=", e.errno().as_usize());
                MuxError::Stream(e)
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn owner(&self) -> u32 {
        self.owner
    }
}

/// Referência contada: enquanto viva, o descritor não é destruído nem
/// desativado.
pub(crate) struct DescriptorRef {
    desc: Arc<DeviceDescriptor>,
    stream: Arc<dyn Stream>,
}

impl DescriptorRef {
    pub(crate) fn stream(&self) -> &dyn Stream {
        &*self.stream
    }

    pub(crate) fn slot(&self) -> usize {
        self.desc.slot
    }
}

impl Drop for DescriptorRef {
    fn drop(&mut self) {
        self.desc.release_ref();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::loopback::LoopbackStream;
    use crate::drivers::ring_buffer::LockPolicy;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn attached(handle_owned: bool) -> (Arc<DeviceDescriptor>, Arc<LoopbackStream>) {
        let stream = Arc::new(LoopbackStream::new(32, LockPolicy::Mutex).unwrap());
        let desc = Arc::new(DeviceDescriptor::new(1, 0));
        let handle = if handle_owned {
            StreamHandle::Owned(stream.clone())
        } else {
            StreamHandle::Borrowed(stream.clone())
        };
        desc.attach(handle);
        (desc, stream)
    }

    #[test]
    fn test_empty_descriptor_rejects_acquire() {
        let desc = Arc::new(DeviceDescriptor::new(1, 3));
        assert_eq!(desc.acquire().err(), Some(StreamError::NoActiveDevice));
        assert!(desc.stream().is_none());
        assert_eq!(desc.slot(), 3);
        assert_eq!(desc.owner(), 1);
    }

    #[test]
    fn test_refcount_tracks_refs() {
        let (desc, _stream) = attached(false);
        let a = desc.acquire().unwrap();
        let b = desc.acquire().unwrap();
        assert_eq!(desc.status().refs, 2);
        assert_eq!(a.slot(), 0);
        drop(a);
        drop(b);
        assert_eq!(desc.status().refs, 0);
    }

    #[test]
    fn test_destroy_refuses_active() {
        let (desc, _stream) = attached(true);
        desc.activate();
        assert_eq!(desc.destroy(), Err(MuxError::DeviceBusy));
        desc.deactivate();
        assert_eq!(desc.destroy(), Ok(()));
    }

    #[test]
    fn test_destroy_closes_only_owned() {
        let (owned, owned_stream) = attached(true);
        owned.destroy().unwrap();
        assert!(owned_stream.is_closed());

        let (borrowed, borrowed_stream) = attached(false);
        borrowed.destroy().unwrap();
        assert!(!borrowed_stream.is_closed());
        assert_eq!(borrowed.acquire().err(), Some(StreamError::NoActiveDevice));
    }

    #[test]
    fn test_destroy_waits_for_outstanding_ref() {
        let (desc, _stream) = attached(false);
        let held = desc.acquire().unwrap();
        let destroyed = Arc::new(AtomicBool::new(false));

        let waiter = {
            let desc = desc.clone();
            let destroyed = destroyed.clone();
            thread::spawn(move || {
                desc.destroy().unwrap();
                destroyed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!destroyed.load(Ordering::SeqCst));

        // Destruição pendente bloqueia novas referências
        assert_eq!(desc.acquire().err(), Some(StreamError::NoActiveDevice));

        drop(held);
        waiter.join().unwrap();
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_wait_activation() {
        let (desc, _stream) = attached(false);
        let waiter = {
            let desc = desc.clone();
            thread::spawn(move || desc.wait_activation())
        };
        thread::sleep(Duration::from_millis(20));
        desc.activate();
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert!(desc.status().active);
    }

    #[test]
    fn test_wait_activation_fails_on_destroy() {
        let (desc, _stream) = attached(false);
        let waiter = {
            let desc = desc.clone();
            thread::spawn(move || desc.wait_activation())
        };
        thread::sleep(Duration::from_millis(20));
        desc.destroy().unwrap();
        assert_eq!(waiter.join().unwrap(), Err(StreamError::Closed));
    }
}
