// =============================================================================
// KPRINT - DEBUG PRINT HELPER
// =============================================================================
//
// Ponto único de saída de diagnóstico do subsistema de I/O.
//
// ARQUITETURA:
// O transporte (serial, framebuffer, buffer de memória) NÃO pertence a este
// crate. Quem faz o boot registra um sink uma única vez e todos os macros de
// log (kinfo!, kerror!, ...) passam por aqui.
// - SEM core::fmt - Evita geração de código SSE/AVX
// - SEM alocação - Dígitos montados em buffer na stack
// - SEM lock - Em SMP as linhas podem se intercalar (aceitável para debug)
//
// FUNÇÕES DISPONÍVEIS:
// - set_sink(f)      : Registra o destino dos bytes (apenas uma vez)
// - emit(byte)       : Envia um byte
// - emit_str(s)      : Envia string literal
// - emit_hex(v)      : Envia u64 em hexadecimal (0x + 16 dígitos)
// - emit_dec(v)      : Envia u64 em decimal
// - emit_nl()        : Envia newline (\r\n)
//
// =============================================================================

use spin::Once;

/// Destino dos bytes de debug.
pub type Sink = fn(&[u8]);

static SINK: Once<Sink> = Once::new();

/// Registra o sink de saída.
///
/// Retorna `false` se outro sink já estava registrado (o primeiro vence).
pub fn set_sink(sink: Sink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

/// Indica se existe um sink registrado.
#[inline]
pub fn has_sink() -> bool {
    SINK.get().is_some()
}

#[inline(always)]
fn out(bytes: &[u8]) {
    if let Some(sink) = SINK.get() {
        sink(bytes);
    }
}

// =============================================================================
// FUNÇÕES DE ESCRITA - CORE
// =============================================================================

/// Envia um único byte.
#[inline(always)]
pub fn emit(byte: u8) {
    out(&[byte]);
}

/// Envia uma string.
#[inline(never)]
pub fn emit_str(s: &str) {
    out(s.as_bytes());
}

/// Envia uma nova linha (CRLF).
#[inline(never)]
pub fn emit_nl() {
    out(b"\r\n");
}

// =============================================================================
// FUNÇÕES DE ESCRITA - FORMATAÇÃO NUMÉRICA
// =============================================================================

/// Envia um valor u64 em formato hexadecimal.
///
/// Formato de saída: 0x0123456789ABCDEF (sempre 18 caracteres)
#[inline(never)]
pub fn emit_hex(value: u64) {
    out(&hex_digits(value));
}

/// Envia um valor u64 em decimal, sem zeros à esquerda.
#[inline(never)]
pub fn emit_dec(value: u64) {
    let mut buf = [0u8; 20];
    let start = dec_digits(value, &mut buf);
    out(&buf[start..]);
}

/// Monta "0x" + 16 nibbles em maiúsculas.
pub(crate) fn hex_digits(value: u64) -> [u8; 18] {
    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let nibble = ((value >> (60 - i * 4)) & 0xF) as u8;
        buf[2 + i] = if nibble < 10 {
            b'0' + nibble
        } else {
            b'A' + (nibble - 10)
        };
    }
    buf
}

/// Preenche `buf` da direita para a esquerda e retorna o índice inicial.
pub(crate) fn dec_digits(mut value: u64, buf: &mut [u8; 20]) -> usize {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            return pos;
        }
    }
}
