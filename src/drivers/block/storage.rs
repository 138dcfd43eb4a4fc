//! # Helpers de Storage
//!
//! Atalhos para os IOCTLs de storage. Cada helper monta o argumento,
//! chama `Stream::ioctl` e devolve o resultado do driver sem alteração.
//!
//! ```text
//! read_blocks(s, 10, 2, buf)
//!     └─> s.ioctl(STORAGE_READ_BLOCKS, ReadBlocks { start: 10, count: 2, buffer })
//! ```

use crate::drivers::ioctl::{
    BlockRequest, IoctlArg, STORAGE_GET_BLOCK_COUNT, STORAGE_GET_BLOCK_SIZE,
    STORAGE_READ_BLOCKS, STORAGE_WRITE_BLOCKS,
};
use crate::drivers::stream::{Stream, StreamError};

/// Lê `count` blocos a partir de `start` para `buffer`.
pub fn read_blocks(
    stream: &dyn Stream,
    start: u64,
    count: u64,
    buffer: &mut [u8],
) -> Result<usize, StreamError> {
    crate::ktrace!("(Storage) read_blocks start=", start);
    stream.ioctl(
        STORAGE_READ_BLOCKS,
        IoctlArg::ReadBlocks(BlockRequest {
            start,
            count,
            buffer,
        }),
    )
}

/// Escreve `count` blocos a partir de `start` usando `buffer`.
pub fn write_blocks(
    stream: &dyn Stream,
    start: u64,
    count: u64,
    buffer: &[u8],
) -> Result<usize, StreamError> {
    crate::ktrace!("(Storage) write_blocks start=", start);
    stream.ioctl(
        STORAGE_WRITE_BLOCKS,
        IoctlArg::WriteBlocks(BlockRequest {
            start,
            count,
            buffer,
        }),
    )
}

/// Tamanho do bloco em bytes.
pub fn get_block_size(stream: &dyn Stream) -> Result<u64, StreamError> {
    let mut size = 0u64;
    stream.ioctl(STORAGE_GET_BLOCK_SIZE, IoctlArg::Size(&mut size))?;
    Ok(size)
}

/// Número total de blocos do dispositivo.
pub fn get_block_count(stream: &dyn Stream) -> Result<u64, StreamError> {
    let mut count = 0u64;
    stream.ioctl(STORAGE_GET_BLOCK_COUNT, IoctlArg::Size(&mut count))?;
    Ok(count)
}
