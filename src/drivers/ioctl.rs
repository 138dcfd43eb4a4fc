//! # Catálogo de IOCTLs
//!
//! Códigos numéricos de controle de dispositivo, agrupados por classe.
//!
//! ## Layout do código
//!
//! ```text
//!  31            16 15             0
//! ┌────────────────┬────────────────┐
//! │     classe     │     número     │
//! └────────────────┴────────────────┘
//! ```
//!
//! Códigos de fabricante começam em `IOCTL_VENDOR_BASE` (bit 31 setado) e
//! nunca colidem com as classes genéricas.
//!
//! O despacho dos códigos fica com cada driver (`Stream::ioctl`); este
//! módulo só define números e o formato dos argumentos.

/// Classe de um IOCTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IoctlClass {
    Generic = 0,
    Storage = 1,
    Audio = 2,
    Graphics = 3,
    Pointing = 4,
}

/// Primeiro código reservado para fabricantes.
pub const IOCTL_VENDOR_BASE: u32 = 0x8000_0000;

/// Monta um código a partir de classe e número.
pub const fn ioctl_code(class: IoctlClass, number: u16) -> u32 {
    ((class as u32) << 16) | number as u32
}

/// Monta um código de fabricante.
pub const fn vendor_code(number: u32) -> u32 {
    IOCTL_VENDOR_BASE | (number & !IOCTL_VENDOR_BASE)
}

/// Verifica se o código pertence à faixa de fabricante.
pub const fn is_vendor(code: u32) -> bool {
    code & IOCTL_VENDOR_BASE != 0
}

/// Extrai a classe de um código genérico.
pub const fn class_of(code: u32) -> Option<IoctlClass> {
    if is_vendor(code) {
        return None;
    }
    match code >> 16 {
        0 => Some(IoctlClass::Generic),
        1 => Some(IoctlClass::Storage),
        2 => Some(IoctlClass::Audio),
        3 => Some(IoctlClass::Graphics),
        4 => Some(IoctlClass::Pointing),
        _ => None,
    }
}

// =============================================================================
// GENÉRICOS
// =============================================================================

pub const DEVICE_OPEN: u32 = ioctl_code(IoctlClass::Generic, 0x01);
pub const DEVICE_CLOSE: u32 = ioctl_code(IoctlClass::Generic, 0x02);

// =============================================================================
// STORAGE
// =============================================================================

/// Argumento: `IoctlArg::ReadBlocks`
pub const STORAGE_READ_BLOCKS: u32 = ioctl_code(IoctlClass::Storage, 0x01);
/// Argumento: `IoctlArg::WriteBlocks`
pub const STORAGE_WRITE_BLOCKS: u32 = ioctl_code(IoctlClass::Storage, 0x02);
/// Argumento: `IoctlArg::Size`
pub const STORAGE_GET_BLOCK_SIZE: u32 = ioctl_code(IoctlClass::Storage, 0x03);
/// Argumento: `IoctlArg::Size`
pub const STORAGE_GET_BLOCK_COUNT: u32 = ioctl_code(IoctlClass::Storage, 0x04);

// =============================================================================
// ÁUDIO (controle de transporte)
// =============================================================================

pub const AUDIO_PLAY: u32 = ioctl_code(IoctlClass::Audio, 0x01);
pub const AUDIO_PAUSE: u32 = ioctl_code(IoctlClass::Audio, 0x02);
pub const AUDIO_RESUME: u32 = ioctl_code(IoctlClass::Audio, 0x03);
pub const AUDIO_STOP: u32 = ioctl_code(IoctlClass::Audio, 0x04);
pub const AUDIO_FLUSH: u32 = ioctl_code(IoctlClass::Audio, 0x05);
/// Argumento: `IoctlArg::Size` (0..=100)
pub const AUDIO_GET_VOLUME: u32 = ioctl_code(IoctlClass::Audio, 0x06);
/// Argumento: `IoctlArg::Value` (0..=100)
pub const AUDIO_SET_VOLUME: u32 = ioctl_code(IoctlClass::Audio, 0x07);

// =============================================================================
// GRÁFICOS
// =============================================================================

/// Argumento: `IoctlArg::Bytes` (descritor da interface preenchido pelo driver)
pub const GRAPHICS_GET_INTERFACE: u32 = ioctl_code(IoctlClass::Graphics, 0x01);

// =============================================================================
// APONTADORES (mouse, touchpad)
// =============================================================================

pub const POINTING_REGISTER: u32 = ioctl_code(IoctlClass::Pointing, 0x01);
pub const POINTING_UNREGISTER: u32 = ioctl_code(IoctlClass::Pointing, 0x02);
/// Argumento: `IoctlArg::Size`
pub const POINTING_GET_SENSITIVITY: u32 = ioctl_code(IoctlClass::Pointing, 0x03);
/// Argumento: `IoctlArg::Value`
pub const POINTING_SET_SENSITIVITY: u32 = ioctl_code(IoctlClass::Pointing, 0x04);

/// Nome simbólico de um código (para logs).
pub fn name_of(code: u32) -> &'static str {
    match code {
        DEVICE_OPEN => "DEVICE_OPEN",
        DEVICE_CLOSE => "DEVICE_CLOSE",
        STORAGE_READ_BLOCKS => "STORAGE_READ_BLOCKS",
        STORAGE_WRITE_BLOCKS => "STORAGE_WRITE_BLOCKS",
        STORAGE_GET_BLOCK_SIZE => "STORAGE_GET_BLOCK_SIZE",
        STORAGE_GET_BLOCK_COUNT => "STORAGE_GET_BLOCK_COUNT",
        AUDIO_PLAY => "AUDIO_PLAY",
        AUDIO_PAUSE => "AUDIO_PAUSE",
        AUDIO_RESUME => "AUDIO_RESUME",
        AUDIO_STOP => "AUDIO_STOP",
        AUDIO_FLUSH => "AUDIO_FLUSH",
        AUDIO_GET_VOLUME => "AUDIO_GET_VOLUME",
        AUDIO_SET_VOLUME => "AUDIO_SET_VOLUME",
        GRAPHICS_GET_INTERFACE => "GRAPHICS_GET_INTERFACE",
        POINTING_REGISTER => "POINTING_REGISTER",
        POINTING_UNREGISTER => "POINTING_UNREGISTER",
        POINTING_GET_SENSITIVITY => "POINTING_GET_SENSITIVITY",
        POINTING_SET_SENSITIVITY => "POINTING_SET_SENSITIVITY",
        c if is_vendor(c) => "VENDOR",
        _ => "UNKNOWN",
    }
}

// =============================================================================
// ARGUMENTOS
// =============================================================================

/// Requisição de blocos: {start, count, buffer}
#[derive(Debug)]
pub struct BlockRequest<B> {
    /// Primeiro bloco (LBA)
    pub start: u64,
    /// Quantidade de blocos
    pub count: u64,
    /// Buffer de dados (count * block_size bytes)
    pub buffer: B,
}

/// Argumento de um IOCTL.
///
/// Substitui o `usize` cru da ABI: cada código documenta qual variante
/// espera, e o driver recusa variantes erradas com `InvalidArgument`.
#[derive(Debug)]
pub enum IoctlArg<'a> {
    /// Sem argumento
    None,
    /// Valor de entrada
    Value(u64),
    /// Saída de um único valor (tamanho, contagem, volume)
    Size(&'a mut u64),
    /// Leitura de blocos para o buffer
    ReadBlocks(BlockRequest<&'a mut [u8]>),
    /// Escrita de blocos a partir do buffer
    WriteBlocks(BlockRequest<&'a [u8]>),
    /// Bloco opaco de bytes (códigos de fabricante, descritores)
    Bytes(&'a mut [u8]),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_extraction() {
        assert_eq!(class_of(DEVICE_OPEN), Some(IoctlClass::Generic));
        assert_eq!(class_of(STORAGE_GET_BLOCK_COUNT), Some(IoctlClass::Storage));
        assert_eq!(class_of(AUDIO_SET_VOLUME), Some(IoctlClass::Audio));
        assert_eq!(class_of(GRAPHICS_GET_INTERFACE), Some(IoctlClass::Graphics));
        assert_eq!(class_of(POINTING_SET_SENSITIVITY), Some(IoctlClass::Pointing));
        assert_eq!(class_of(0x0009_0001), None);
    }

    #[test]
    fn test_vendor_range() {
        let code = vendor_code(0x42);
        assert!(is_vendor(code));
        assert!(code >= IOCTL_VENDOR_BASE);
        assert_eq!(class_of(code), None);
        assert_eq!(name_of(code), "VENDOR");

        // Nenhum código genérico cai na faixa de fabricante
        for c in [DEVICE_OPEN, STORAGE_READ_BLOCKS, AUDIO_PLAY, POINTING_REGISTER] {
            assert!(!is_vendor(c));
        }
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            DEVICE_OPEN,
            DEVICE_CLOSE,
            STORAGE_READ_BLOCKS,
            STORAGE_WRITE_BLOCKS,
            STORAGE_GET_BLOCK_SIZE,
            STORAGE_GET_BLOCK_COUNT,
            AUDIO_PLAY,
            AUDIO_PAUSE,
            AUDIO_RESUME,
            AUDIO_STOP,
            AUDIO_FLUSH,
            AUDIO_GET_VOLUME,
            AUDIO_SET_VOLUME,
            GRAPHICS_GET_INTERFACE,
            POINTING_REGISTER,
            POINTING_UNREGISTER,
            POINTING_GET_SENSITIVITY,
            POINTING_SET_SENSITIVITY,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(name_of(*a), "UNKNOWN");
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
