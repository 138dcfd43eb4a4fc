//! # Standard Error Codes (Errno)
//!
//! Define os códigos de erro que o subsistema de I/O devolve para a camada
//! de syscalls. Baseado no padrão POSIX para compatibilidade com ferramentas
//! existentes.
//!
//! Cada subsistema tem seu próprio enum de erro (`RingError`, `StreamError`,
//! `MuxError`) e converte para `Errno` apenas na fronteira com o userspace.
//! Valores negativos são usados em retornos de syscalls (isize).

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Success = 0,
    EPERM = 1,    // Operation not permitted
    ENOENT = 2,   // No such file or directory
    EIO = 5,      // I/O error
    ENXIO = 6,    // No such device or address
    EBADF = 9,    // Bad file number
    EAGAIN = 11,  // Try again
    ENOMEM = 12,  // Out of memory
    EFAULT = 14,  // Bad address
    EBUSY = 16,   // Device or resource busy
    ENODEV = 19,  // No such device
    EINVAL = 22,  // Invalid argument
    ENOTTY = 25,  // Not a typewriter (ioctl desconhecido)
    ENOSPC = 28,  // No space left on device
    EPIPE = 32,   // Broken pipe
    ENOSYS = 38,  // Function not implemented
}

impl Errno {
    pub fn as_usize(self) -> usize {
        self as usize
    }

    pub fn as_isize(self) -> isize {
        -(self as i32) as isize
    }

    /// Nome simbólico (para logs)
    pub const fn name(self) -> &'static str {
        match self {
            Errno::Success => "Success",
            Errno::EPERM => "EPERM",
            Errno::ENOENT => "ENOENT",
            Errno::EIO => "EIO",
            Errno::ENXIO => "ENXIO",
            Errno::EBADF => "EBADF",
            Errno::EAGAIN => "EAGAIN",
            Errno::ENOMEM => "ENOMEM",
            Errno::EFAULT => "EFAULT",
            Errno::EBUSY => "EBUSY",
            Errno::ENODEV => "ENODEV",
            Errno::EINVAL => "EINVAL",
            Errno::ENOTTY => "ENOTTY",
            Errno::ENOSPC => "ENOSPC",
            Errno::EPIPE => "EPIPE",
            Errno::ENOSYS => "ENOSYS",
        }
    }
}
