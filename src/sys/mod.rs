//! System Definitions (ABI).
//!
//! Contém os códigos de erro que atravessam a fronteira kernel/userspace.

pub mod error;

pub use error::Errno;
