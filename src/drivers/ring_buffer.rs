//! Ring Buffer
//!
//! Buffer circular de bytes thread-safe. Separa produtores e consumidores
//! que trabalham em ritmos diferentes (áudio, storage, teclado).
//!
//! ## Layout
//!
//! ```text
//!  0                                          C-1
//! ┌──────────────────────────────────────────────┐
//! │....DDDDDDDDDDDDDDD...........................│
//! └────▲──────────────▲──────────────────────────┘
//!      read           write
//! ```
//!
//! - `read == write` → vazio
//! - Um byte fica SEMPRE livre (guard byte), então cabem no máximo C-1 bytes
//!   e `write + 1 == read (mod C)` significa cheio.
//! - Escritas/leituras que cruzam o fim do storage viram duas cópias
//!   (cauda, depois início).
//!
//! ## Concorrência
//!
//! Toda operação segura o guard do início ao fim. Nenhuma operação espera
//! por espaço ou dados: falta de espaço é `Overflow`, falta de dados é
//! `Underflow`, e em ambos os casos nada é alterado.
//!
//! Com `LockPolicy::None` os mutadores tomam uma flag de posse (disputa vira
//! `Busy`). As consultas de tamanho não tomam a flag: leem apenas os cursores
//! atômicos e a capacidade, nunca o storage.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::sync::{Mutex, MutexGuard, Spinlock, SpinlockGuard};
use crate::sys::Errno;

/// Política de exclusão mútua do buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Sem lock: o chamador serializa o acesso
    None,
    /// Mutex (pode ceder a CPU na disputa)
    Mutex,
    /// Spinlock (busy-wait, seções curtas / vizinhas de IRQ)
    Spinlock,
}

/// Erros do ring buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// Falha ao alocar o storage
    NoMemory,
    /// Capacidade menor que 2 (não caberia nenhum byte)
    InvalidCapacity,
    /// Escrita maior que o espaço livre
    Overflow,
    /// Leitura maior que os bytes disponíveis
    Underflow,
    /// Acesso concorrente a um buffer `LockPolicy::None`
    Busy,
}

impl RingError {
    pub fn errno(self) -> Errno {
        match self {
            RingError::NoMemory => Errno::ENOMEM,
            RingError::InvalidCapacity => Errno::EINVAL,
            RingError::Overflow => Errno::ENOSPC,
            RingError::Underflow => Errno::EAGAIN,
            RingError::Busy => Errno::EBUSY,
        }
    }
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::NoMemory => write!(f, "Sem memória para o ring buffer"),
            RingError::InvalidCapacity => write!(f, "Capacidade inválida"),
            RingError::Overflow => write!(f, "Ring buffer cheio"),
            RingError::Underflow => write!(f, "Ring buffer sem dados suficientes"),
            RingError::Busy => write!(f, "Ring buffer em uso"),
        }
    }
}

/// Guard de acordo com a política
enum RingLock {
    None(AtomicBool),
    Mutex(Mutex<()>),
    Spinlock(Spinlock<()>),
}

/// Prova de que o guard está adquirido (solto no Drop)
enum Held<'a> {
    Flag { _guard: FlagGuard<'a> },
    Mutex { _guard: MutexGuard<'a, ()> },
    Spinlock { _guard: SpinlockGuard<'a, ()> },
}

struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Buffer circular de bytes com capacidade fixa
pub struct RingBuffer {
    lock: RingLock,
    /// Tamanho do storage, fixo desde a criação
    capacity: usize,
    storage: UnsafeCell<Box<[u8]>>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
}

// SAFETY: storage só é tocado com o guard adquirido; cursores são atômicos
// e a capacidade é um campo imutável
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Cria um buffer vazio com `capacity` bytes de storage.
    ///
    /// Cabem no máximo `capacity - 1` bytes ao mesmo tempo.
    pub fn create(capacity: usize, policy: LockPolicy) -> Result<Self, RingError> {
        if capacity < 2 {
            crate::kwarn!("(Ring) Capacidade inválida=", capacity);
            return Err(RingError::InvalidCapacity);
        }

        let mut storage = Vec::new();
        if storage.try_reserve_exact(capacity).is_err() {
            crate::kerror!("(Ring) Falha ao alocar storage, capacity=", capacity);
            return Err(RingError::NoMemory);
        }
        storage.resize(capacity, 0u8);

        let lock = match policy {
            LockPolicy::None => RingLock::None(AtomicBool::new(false)),
            LockPolicy::Mutex => RingLock::Mutex(Mutex::new(())),
            LockPolicy::Spinlock => RingLock::Spinlock(Spinlock::new(())),
        };

        crate::ktrace!("(Ring) Criado, capacity=", capacity);
        Ok(Self {
            lock,
            capacity,
            storage: UnsafeCell::new(storage.into_boxed_slice()),
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        })
    }

    /// Destrói o buffer, liberando storage e guard.
    ///
    /// Adquire e solta o guard uma vez para cercar quem ainda estiver
    /// terminando uma operação.
    pub fn destroy(self) {
        match self.acquire() {
            Ok(held) => drop(held),
            Err(_) => crate::kwarn!("(Ring) destroy com operação em andamento"),
        }
        crate::ktrace!("(Ring) Destruído, capacity=", self.capacity());
    }

    /// Capacidade total do storage (inclui o guard byte)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lock_policy(&self) -> LockPolicy {
        match self.lock {
            RingLock::None(_) => LockPolicy::None,
            RingLock::Mutex(_) => LockPolicy::Mutex,
            RingLock::Spinlock(_) => LockPolicy::Spinlock,
        }
    }

    /// Escreve `data` inteiro ou nada.
    pub fn write(&self, data: &[u8]) -> Result<(), RingError> {
        let _held = self.acquire()?;
        let cap = self.capacity();
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Relaxed);

        if data.len() > free_bytes(read, write, cap) {
            return Err(RingError::Overflow);
        }

        // SAFETY: guard adquirido
        let storage = unsafe { &mut *self.storage.get() };
        let tail = data.len().min(cap - write);
        storage[write..write + tail].copy_from_slice(&data[..tail]);
        storage[..data.len() - tail].copy_from_slice(&data[tail..]);

        self.write_pos
            .store((write + data.len()) % cap, Ordering::Relaxed);
        Ok(())
    }

    /// Lê exatamente `dst.len()` bytes ou nada.
    pub fn read(&self, dst: &mut [u8]) -> Result<(), RingError> {
        let _held = self.acquire()?;
        self.read_locked(dst)
    }

    /// Lê até `dst.len()` bytes e retorna quantos foram lidos.
    ///
    /// Sem nenhum byte para entregar retorna `Underflow` e não toca `dst`.
    pub fn read_upto(&self, dst: &mut [u8]) -> Result<usize, RingError> {
        let _held = self.acquire()?;
        let used = used_bytes(
            self.read_pos.load(Ordering::Relaxed),
            self.write_pos.load(Ordering::Relaxed),
            self.capacity(),
        );

        let n = dst.len().min(used);
        if n == 0 {
            return Err(RingError::Underflow);
        }
        self.read_locked(&mut dst[..n])?;
        Ok(n)
    }

    /// Bytes disponíveis para leitura
    pub fn get_read_size(&self) -> usize {
        let _held = self.acquire_for_query();
        used_bytes(
            self.read_pos.load(Ordering::Relaxed),
            self.write_pos.load(Ordering::Relaxed),
            self.capacity(),
        )
    }

    /// Bytes livres para escrita (já descontado o guard byte)
    pub fn get_write_size(&self) -> usize {
        let _held = self.acquire_for_query();
        free_bytes(
            self.read_pos.load(Ordering::Relaxed),
            self.write_pos.load(Ordering::Relaxed),
            self.capacity(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.get_read_size() == 0
    }

    /// Descarta todos os bytes pendentes.
    pub fn clear(&self) -> Result<(), RingError> {
        let _held = self.acquire()?;
        let write = self.write_pos.load(Ordering::Relaxed);
        self.read_pos.store(write, Ordering::Relaxed);
        Ok(())
    }

    // =========================================================================
    // INTERNOS
    // =========================================================================

    /// Cópia com o guard já adquirido.
    fn read_locked(&self, dst: &mut [u8]) -> Result<(), RingError> {
        let cap = self.capacity();
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Relaxed);

        if dst.len() > used_bytes(read, write, cap) {
            return Err(RingError::Underflow);
        }

        // SAFETY: guard adquirido pelo chamador
        let storage = unsafe { &*self.storage.get() };
        let len = dst.len();
        let tail = len.min(cap - read);
        dst[..tail].copy_from_slice(&storage[read..read + tail]);
        dst[tail..].copy_from_slice(&storage[..len - tail]);

        self.read_pos.store((read + len) % cap, Ordering::Relaxed);
        Ok(())
    }

    fn acquire(&self) -> Result<Held<'_>, RingError> {
        match &self.lock {
            RingLock::None(flag) => {
                if flag
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
                {
                    crate::kwarn!("(Ring) Acesso concorrente em buffer sem lock");
                    return Err(RingError::Busy);
                }
                Ok(Held::Flag {
                    _guard: FlagGuard(flag),
                })
            }
            RingLock::Mutex(m) => Ok(Held::Mutex { _guard: m.lock() }),
            RingLock::Spinlock(s) => Ok(Held::Spinlock { _guard: s.lock() }),
        }
    }

    /// Consultas em buffers sem lock leem só os cursores atômicos e
    /// `capacity`; o storage fica fora de alcance.
    fn acquire_for_query(&self) -> Option<Held<'_>> {
        match &self.lock {
            RingLock::None(_) => None,
            _ => self.acquire().ok(),
        }
    }
}

#[inline]
fn used_bytes(read: usize, write: usize, cap: usize) -> usize {
    if write >= read {
        write - read
    } else {
        cap - read + write
    }
}

#[inline]
fn free_bytes(read: usize, write: usize, cap: usize) -> usize {
    cap - used_bytes(read, write, cap) - 1
}
