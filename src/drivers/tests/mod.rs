//! Testes de cenário da camada de I/O
//!
//! Testes que atravessam mais de um módulo (multiplexador + streams +
//! ring buffer). Os testes unitários ficam junto de cada módulo.
//!
//! # Como Executar
//!
//! ```bash
//! cargo test --lib drivers::tests
//! cargo test --lib drivers::tests::mux
//! ```
//!
//! # Estrutura
//!
//! - `mux.rs` - Slots, troca, remoção e teardown
//! - `concurrency.rs` - Forwards em voo, produtor/consumidor
