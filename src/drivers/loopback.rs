//! Stream de loopback
//!
//! O que é escrito volta na leitura, via ring buffer. Serve de dispositivo
//! de teste para o multiplexador e de exemplo mínimo de driver `Stream`.
//! `DEVICE_OPEN` reabre um loopback fechado.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::ioctl::{self, IoctlArg};
use crate::drivers::ring_buffer::{LockPolicy, RingBuffer, RingError};
use crate::drivers::stream::{Stream, StreamError};
use crate::sys::Errno;

pub struct LoopbackStream {
    buffer: RingBuffer,
    closed: AtomicBool,
}

impl LoopbackStream {
    pub fn new(capacity: usize, policy: LockPolicy) -> Result<Self, RingError> {
        Ok(Self {
            buffer: RingBuffer::create(capacity, policy)?,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Bytes aguardando leitura
    pub fn pending(&self) -> usize {
        self.buffer.get_read_size()
    }

    fn check_open(&self) -> Result<(), StreamError> {
        if self.is_closed() {
            Err(StreamError::Closed)
        } else {
            Ok(())
        }
    }
}

fn ring_to_stream(e: RingError) -> StreamError {
    StreamError::Io(e.errno())
}

impl Stream for LoopbackStream {
    /// Lê o que houver, até `buf.len()`. Sem dados: `EAGAIN`.
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        match self.buffer.read_upto(buf) {
            Ok(n) => Ok(n),
            Err(RingError::Underflow) => Err(StreamError::Io(Errno::EAGAIN)),
            Err(e) => Err(ring_to_stream(e)),
        }
    }

    /// Escrita parcial até o espaço livre. Buffer cheio: `EAGAIN`.
    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(self.buffer.get_write_size());
        if n == 0 {
            return Err(StreamError::Io(Errno::EAGAIN));
        }
        self.buffer.write(&buf[..n]).map_err(ring_to_stream)?;
        Ok(n)
    }

    fn ioctl(&self, cmd: u32, arg: IoctlArg<'_>) -> Result<usize, StreamError> {
        // Reabre um loopback fechado; dados pendentes são descartados
        if cmd == ioctl::DEVICE_OPEN {
            if self.closed.swap(false, Ordering::AcqRel) {
                self.buffer.clear().map_err(ring_to_stream)?;
            }
            return Ok(0);
        }
        self.check_open()?;
        match (cmd, arg) {
            (ioctl::AUDIO_FLUSH, IoctlArg::None) => {
                self.buffer.clear().map_err(ring_to_stream)?;
                Ok(0)
            }
            (ioctl::DEVICE_CLOSE, IoctlArg::None) => {
                self.close()?;
                Ok(0)
            }
            (ioctl::AUDIO_FLUSH | ioctl::DEVICE_CLOSE, _) => Err(StreamError::InvalidArgument),
            _ => Err(StreamError::NotSupported),
        }
    }

    fn close(&self) -> Result<(), StreamError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        let lo = LoopbackStream::new(16, LockPolicy::Spinlock).unwrap();
        assert_eq!(lo.write(b"abc").unwrap(), 3);
        assert_eq!(lo.pending(), 3);

        let mut out = [0u8; 8];
        assert_eq!(lo.read(&mut out).unwrap(), 3);
        assert_eq!(&out[..3], b"abc");
        assert_eq!(lo.read(&mut out), Err(StreamError::Io(Errno::EAGAIN)));
    }

    #[test]
    fn test_partial_write_when_nearly_full() {
        let lo = LoopbackStream::new(8, LockPolicy::Mutex).unwrap();
        assert_eq!(lo.write(b"0123456789").unwrap(), 7);
        assert_eq!(lo.write(b"x"), Err(StreamError::Io(Errno::EAGAIN)));
    }

    #[test]
    fn test_flush_and_close() {
        let lo = LoopbackStream::new(8, LockPolicy::Mutex).unwrap();
        lo.write(b"abc").unwrap();
        lo.ioctl(ioctl::AUDIO_FLUSH, IoctlArg::None).unwrap();
        assert_eq!(lo.pending(), 0);

        assert_eq!(
            lo.ioctl(ioctl::AUDIO_PLAY, IoctlArg::None),
            Err(StreamError::NotSupported)
        );
        assert_eq!(
            lo.ioctl(ioctl::AUDIO_FLUSH, IoctlArg::Value(1)),
            Err(StreamError::InvalidArgument)
        );

        lo.ioctl(ioctl::DEVICE_CLOSE, IoctlArg::None).unwrap();
        assert!(lo.is_closed());
        assert_eq!(lo.write(b"a"), Err(StreamError::Closed));
        assert_eq!(lo.close(), Err(StreamError::Closed));

        lo.ioctl(ioctl::DEVICE_OPEN, IoctlArg::None).unwrap();
        assert!(!lo.is_closed());
        assert_eq!(lo.write(b"a").unwrap(), 1);
    }
}
