//! # Stream - capacidade opaca de I/O
//!
//! Tudo que o multiplexador consome de um dispositivo cabe nesta trait:
//! ler, escrever, controlar (ioctl) e fechar. Abrir por caminho é uma
//! capacidade separada (`StreamProvider`).
//!
//! ## Propriedade
//!
//! ```text
//! StreamHandle::Owned     → aberto por nós, fechado no release()
//! StreamHandle::Borrowed  → entregue pelo chamador, NUNCA fechado por nós
//! ```

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::ioctl::{self, IoctlArg};
use crate::sync::Mutex;
use crate::sys::Errno;

/// Número máximo de dispositivos no registro
pub const MAX_DEVICES: usize = 256;

/// Erros de stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Caminho não corresponde a nenhum dispositivo
    NotFound,
    /// Operação não suportada pelo dispositivo (ou pela direção)
    NotSupported,
    /// Argumento inválido (ex: variante de IoctlArg errada)
    InvalidArgument,
    /// Nenhum dispositivo ativo para receber a chamada
    NoActiveDevice,
    /// Stream já fechado
    Closed,
    /// Código definido pelo driver, propagado sem alteração
    Io(Errno),
}

impl StreamError {
    pub fn errno(self) -> Errno {
        match self {
            StreamError::NotFound => Errno::ENOENT,
            StreamError::NotSupported => Errno::ENOTTY,
            StreamError::InvalidArgument => Errno::EINVAL,
            StreamError::NoActiveDevice => Errno::ENXIO,
            StreamError::Closed => Errno::EBADF,
            StreamError::Io(e) => e,
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::NotFound => write!(f, "Dispositivo não encontrado"),
            StreamError::NotSupported => write!(f, "Operação não suportada"),
            StreamError::InvalidArgument => write!(f, "Argumento inválido"),
            StreamError::NoActiveDevice => write!(f, "Nenhum dispositivo ativo"),
            StreamError::Closed => write!(f, "Stream fechado"),
            StreamError::Io(e) => write!(f, "Erro do driver ({})", e.name()),
        }
    }
}

/// Stream genérico de dispositivo
pub trait Stream: Send + Sync {
    /// Lê do dispositivo
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// Escreve no dispositivo
    fn write(&self, buf: &[u8]) -> Result<usize, StreamError>;

    /// ioctl (controle de dispositivo)
    fn ioctl(&self, _cmd: u32, _arg: IoctlArg<'_>) -> Result<usize, StreamError> {
        Err(StreamError::NotSupported)
    }

    /// Fecha o dispositivo
    fn close(&self) -> Result<(), StreamError> {
        Ok(())
    }
}

/// Capacidade de abrir streams por caminho
pub trait StreamProvider: Send + Sync {
    fn open(&self, path: &str) -> Result<Arc<dyn Stream>, StreamError>;
}

/// Handle de stream com a decisão de propriedade explícita
#[derive(Clone)]
pub enum StreamHandle {
    /// Aberto por quem guarda o handle; fechado no `release`
    Owned(Arc<dyn Stream>),
    /// Fornecido de fora; o dono original fecha
    Borrowed(Arc<dyn Stream>),
}

impl StreamHandle {
    /// Stream por trás do handle
    pub fn stream(&self) -> &Arc<dyn Stream> {
        match self {
            StreamHandle::Owned(s) | StreamHandle::Borrowed(s) => s,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, StreamHandle::Owned(_))
    }

    /// Solta o handle, fechando o stream apenas se for nosso.
    pub fn release(self) -> Result<(), StreamError> {
        match self {
            StreamHandle::Owned(s) => s.close(),
            StreamHandle::Borrowed(_) => Ok(()),
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamHandle::Owned(_) => f.write_str("StreamHandle::Owned"),
            StreamHandle::Borrowed(_) => f.write_str("StreamHandle::Borrowed"),
        }
    }
}

// =============================================================================
// REGISTRO DE DISPOSITIVOS
// =============================================================================

/// Dispositivo registrado e quantos handles abertos ele tem
struct Registered {
    stream: Arc<dyn Stream>,
    opens: Mutex<usize>,
}

impl Registered {
    /// Primeira abertura envia `DEVICE_OPEN` (drivers sem suporte ignoram).
    fn open(&self) -> Result<(), StreamError> {
        let mut opens = self.opens.lock();
        if *opens == 0 {
            match self.stream.ioctl(ioctl::DEVICE_OPEN, IoctlArg::None) {
                Ok(_) | Err(StreamError::NotSupported) => {}
                Err(e) => return Err(e),
            }
        }
        *opens += 1;
        Ok(())
    }

    /// Última liberação fecha o dispositivo.
    fn release(&self) -> Result<(), StreamError> {
        let mut opens = self.opens.lock();
        *opens -= 1;
        if *opens == 0 {
            self.stream.close()
        } else {
            Ok(())
        }
    }
}

/// Handle devolvido pelo `open` do registro
///
/// Cada `open` gera um handle próprio; `close` solta só esta abertura.
/// Handle descartado sem `close` é liberado no Drop.
struct OpenStream {
    device: Arc<Registered>,
    closed: AtomicBool,
}

impl OpenStream {
    fn check_open(&self) -> Result<(), StreamError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StreamError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Stream for OpenStream {
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.check_open()?;
        self.device.stream.read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        self.check_open()?;
        self.device.stream.write(buf)
    }

    fn ioctl(&self, cmd: u32, arg: IoctlArg<'_>) -> Result<usize, StreamError> {
        if cmd == ioctl::DEVICE_CLOSE {
            return self.close().map(|_| 0);
        }
        self.check_open()?;
        self.device.stream.ioctl(cmd, arg)
    }

    fn close(&self) -> Result<(), StreamError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Closed);
        }
        self.device.release()
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) && self.device.release().is_err() {
            crate::kwarn!("(Stream) Falha ao fechar handle descartado");
        }
    }
}

/// Registro de dispositivos por nome (ex: "/dev/snd0")
///
/// Provider em memória. Cada `open` devolve um handle novo e conta a
/// abertura; o dispositivo só é fechado quando o último handle fecha, e a
/// próxima abertura o reabre com `DEVICE_OPEN`.
pub struct DeviceRegistry {
    devices: spin::Mutex<BTreeMap<String, Arc<Registered>>>,
}

impl DeviceRegistry {
    /// Cria um novo registro
    pub const fn new() -> Self {
        Self {
            devices: spin::Mutex::new(BTreeMap::new()),
        }
    }

    /// Registra um dispositivo
    pub fn register(&self, name: &str, stream: Arc<dyn Stream>) -> Result<(), Errno> {
        let mut devices = self.devices.lock();
        if devices.contains_key(name) {
            return Err(Errno::EBUSY);
        }
        if devices.len() >= MAX_DEVICES {
            crate::kwarn!("(Stream) Registro de dispositivos cheio");
            return Err(Errno::ENOSPC);
        }
        devices.insert(
            String::from(name),
            Arc::new(Registered {
                stream,
                opens: Mutex::new(0),
            }),
        );
        crate::ktrace!("(Stream) Registrado, total=", devices.len());
        Ok(())
    }

    /// Remove um dispositivo
    ///
    /// Handles já abertos continuam válidos até fecharem.
    pub fn unregister(&self, name: &str) -> Result<Arc<dyn Stream>, Errno> {
        self.devices
            .lock()
            .remove(name)
            .map(|d| d.stream.clone())
            .ok_or(Errno::ENOENT)
    }

    /// Verifica se um nome está registrado
    pub fn contains(&self, name: &str) -> bool {
        self.devices.lock().contains_key(name)
    }

    /// Handles abertos de um dispositivo
    pub fn open_count(&self, name: &str) -> Option<usize> {
        let device = self.devices.lock().get(name).cloned()?;
        let count = *device.opens.lock();
        Some(count)
    }

    /// Número de dispositivos registrados
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }
}

impl StreamProvider for DeviceRegistry {
    fn open(&self, path: &str) -> Result<Arc<dyn Stream>, StreamError> {
        let device = self.devices.lock().get(path).cloned();
        let device = match device {
            Some(d) => d,
            None => {
                crate::kdebug!("(Stream) open: caminho não registrado");
                return Err(StreamError::NotFound);
            }
        };

        device.open()?;
        Ok(Arc::new(OpenStream {
            device,
            closed: AtomicBool::new(false),
        }))
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    struct CountingStream {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl Stream for CountingStream {
        fn read(&self, _buf: &mut [u8]) -> Result<usize, StreamError> {
            Ok(0)
        }

        fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
            Ok(buf.len())
        }

        fn ioctl(&self, cmd: u32, _arg: IoctlArg<'_>) -> Result<usize, StreamError> {
            if cmd == ioctl::DEVICE_OPEN {
                self.opens.fetch_add(1, Ordering::SeqCst);
                return Ok(0);
            }
            Err(StreamError::NotSupported)
        }

        fn close(&self) -> Result<(), StreamError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting() -> Arc<CountingStream> {
        Arc::new(CountingStream {
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_release_closes_only_owned() {
        let owned = counting();
        StreamHandle::Owned(owned.clone()).release().unwrap();
        assert_eq!(owned.closes.load(Ordering::SeqCst), 1);

        let borrowed = counting();
        StreamHandle::Borrowed(borrowed.clone()).release().unwrap();
        assert_eq!(borrowed.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_open_handle_forwards_ioctl() {
        let s = counting();
        let registry = DeviceRegistry::new();
        registry.register("/dev/a", s).unwrap();
        let handle = registry.open("/dev/a").unwrap();
        assert_eq!(
            handle.ioctl(ioctl::AUDIO_PLAY, IoctlArg::None),
            Err(StreamError::NotSupported)
        );
    }

    #[test]
    fn test_shared_path_closes_on_last_release() {
        let device = counting();
        let registry = DeviceRegistry::new();
        registry.register("/dev/snd", device.clone()).unwrap();

        let a = registry.open("/dev/snd").unwrap();
        let b = registry.open("/dev/snd").unwrap();
        assert_eq!(registry.open_count("/dev/snd"), Some(2));
        assert_eq!(device.opens.load(Ordering::SeqCst), 1);

        a.close().unwrap();
        assert_eq!(a.write(b"x"), Err(StreamError::Closed));
        assert_eq!(a.close(), Err(StreamError::Closed));
        assert_eq!(device.closes.load(Ordering::SeqCst), 0);
        assert_eq!(b.write(b"x"), Ok(1));

        b.ioctl(ioctl::DEVICE_CLOSE, IoctlArg::None).unwrap();
        assert_eq!(device.closes.load(Ordering::SeqCst), 1);
        assert_eq!(registry.open_count("/dev/snd"), Some(0));

        // Reabertura depois do último close envia DEVICE_OPEN de novo
        let c = registry.open("/dev/snd").unwrap();
        assert_eq!(device.opens.load(Ordering::SeqCst), 2);
        drop(c);
        assert_eq!(device.closes.load(Ordering::SeqCst), 2);
        assert_eq!(registry.open_count("/dev/snd"), Some(0));
    }

    #[test]
    fn test_registry_open() {
        let registry = DeviceRegistry::new();
        registry.register("/dev/a", counting()).unwrap();
        assert_eq!(registry.register("/dev/a", counting()), Err(Errno::EBUSY));
        assert!(registry.contains("/dev/a"));

        assert!(registry.open("/dev/a").is_ok());
        assert_eq!(registry.open("/dev/b").err(), Some(StreamError::NotFound));

        assert_eq!(registry.open_count("/dev/a"), Some(0));
        assert_eq!(registry.open_count("/dev/b"), None);

        registry.unregister("/dev/a").unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.unregister("/dev/a").err(), Some(Errno::ENOENT));
    }

    #[test]
    fn test_upstream_errno_passthrough() {
        assert_eq!(StreamError::Io(Errno::EIO).errno(), Errno::EIO);
        assert_eq!(StreamError::NoActiveDevice.errno(), Errno::ENXIO);
    }
}
