/// Arquivo: core/debug/mod.rs
///
/// Propósito: Saída de diagnóstico do subsistema de I/O.
///
/// Módulos contidos:
/// - `kprint`: Helper de debug print (sink registrável + formatação sem fmt).
pub mod kprint;
