//! Self-test da camada de I/O
//!
//! Smoke test rodado dentro do kernel (feature `self_test`): sem harness
//! `#[test]`, cada caso retorna um `TestResult`.

use alloc::sync::Arc;

use crate::drivers::ioctl::{self, IoctlArg};
use crate::drivers::loopback::LoopbackStream;
use crate::drivers::mux::{DeviceMultiplexer, DeviceSource, Direction, MuxError, SlotRequest};
use crate::drivers::ring_buffer::{LockPolicy, RingBuffer, RingError};
use crate::drivers::stream::DeviceRegistry;
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};

/// Casos de teste de drivers
const DRIVER_TESTS: &[TestCase] = &[
    TestCase::new("ring_wrap", test_ring_wrap),
    TestCase::new("ring_overflow", test_ring_overflow),
    TestCase::new("mux_lifecycle", test_mux_lifecycle),
    TestCase::new("mux_busy_slot", test_mux_busy_slot),
    TestCase::new("mux_owned_primary", test_mux_owned_primary),
];

/// Executa todos os testes de drivers
pub fn run_driver_tests() -> SuiteReport {
    run_test_suite("Drivers", DRIVER_TESTS)
}

fn loopback() -> Option<Arc<LoopbackStream>> {
    LoopbackStream::new(64, LockPolicy::Spinlock).ok().map(Arc::new)
}

/// Escrita que cruza o fim do storage volta na ordem certa
fn test_ring_wrap() -> TestResult {
    let ring = match RingBuffer::create(8, LockPolicy::Spinlock) {
        Ok(r) => r,
        Err(_) => return TestResult::Fail,
    };

    let mut out = [0u8; 5];
    let ok = ring.write(&[1, 2, 3, 4, 5, 6]).is_ok()
        && ring.read(&mut out[..4]).is_ok()
        && ring.write(&[7, 8, 9, 10, 11]).is_ok()
        && ring.get_read_size() == 7
        && ring.read(&mut out[..2]).is_ok()
        && out[..2] == [5, 6]
        && ring.read(&mut out).is_ok()
        && out == [7, 8, 9, 10, 11];
    ring.destroy();

    if !ok {
        crate::kerror!("(Ring) Dados corrompidos no wrap");
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Overflow não escreve nada
fn test_ring_overflow() -> TestResult {
    let ring = match RingBuffer::create(16, LockPolicy::Mutex) {
        Ok(r) => r,
        Err(_) => return TestResult::Fail,
    };

    let data = [0xAAu8; 16];
    let free = ring.get_write_size();
    let over = ring.write(&data[..free + 1]);
    let before = ring.get_read_size();
    let fits = ring.write(&data[..free]);
    ring.destroy();

    if over != Err(RingError::Overflow) || before != 0 || fits.is_err() {
        crate::kerror!("(Ring) Overflow alterou o buffer, free=", free);
        return TestResult::Fail;
    }
    crate::ktrace!("(Ring) Espaço livre=", free);
    TestResult::Pass
}

/// create2 → add → switch → write → destroy, primário continua aberto
fn test_mux_lifecycle() -> TestResult {
    let (primary, device) = match (loopback(), loopback()) {
        (Some(p), Some(d)) => (p, d),
        _ => return TestResult::Fail,
    };

    let mux = DeviceMultiplexer::create2(Direction::OUTPUT, primary.clone());
    let slot = match mux.add_device(SlotRequest::Auto, DeviceSource::Stream(device.clone())) {
        Ok((slot, _)) => slot,
        Err(_) => return TestResult::Fail,
    };
    if mux.switch_to(slot).is_err() {
        return TestResult::Fail;
    }

    let written = mux.stream().write(b"forge");
    let flushed = mux.stream().ioctl(ioctl::AUDIO_FLUSH, IoctlArg::None);
    if mux.destroy().is_err() {
        return TestResult::Fail;
    }

    if written != Ok(5) || flushed.is_err() || primary.is_closed() || device.is_closed() {
        crate::kerror!("(Mux) Forwarding falhou no slot=", slot);
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Slot ativo não pode ser removido
fn test_mux_busy_slot() -> TestResult {
    let primary = match loopback() {
        Some(p) => p,
        None => return TestResult::Fail,
    };
    let mux = DeviceMultiplexer::create2(Direction::BIDIRECTIONAL, primary);

    for _ in 0..2 {
        match loopback() {
            Some(d) => {
                if mux.add_device(SlotRequest::Auto, DeviceSource::Stream(d)).is_err() {
                    return TestResult::Fail;
                }
            }
            None => return TestResult::Fail,
        }
    }

    let busy = mux.switch_to(1).and_then(|_| mux.remove_device(1));
    let moved = mux.switch_to(0).and_then(|_| mux.remove_device(1));

    if busy != Err(MuxError::DeviceBusy) || moved.is_err() || mux.occupied_count() != 1 {
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Primário aberto por caminho é fechado no destroy
fn test_mux_owned_primary() -> TestResult {
    let primary = match loopback() {
        Some(p) => p,
        None => return TestResult::Fail,
    };
    let registry = Arc::new(DeviceRegistry::new());
    if registry.register("/dev/selftest", primary.clone()).is_err() {
        return TestResult::Fail;
    }

    let mux = match DeviceMultiplexer::create(Direction::OUTPUT, "/dev/selftest", registry) {
        Ok(m) => m,
        Err(_) => return TestResult::Fail,
    };
    if mux.destroy().is_err() || !primary.is_closed() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_test_suite_passes() {
        let report = run_driver_tests();
        assert!(report.all_passed());
        assert_eq!(report.passed, DRIVER_TESTS.len());
    }
}
