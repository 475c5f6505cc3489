//! Maps completion signals to a [`BlockStatus`].
//!
//! The protocol-mode checks run in a fixed order and the first match wins:
//! submission failure, timeout, ATA error bit (then its sub-bits), device
//! fault, sense key. Keep that order.

use crate::ata::{AtaReturn, SENSE_KEY_ABORTED_COMMAND};
use crate::block_status::BlockStatus;

/// Everything a passthrough completion tells us about a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionSignals {
    /// The submission call itself failed.
    pub submit_failed: bool,
    pub duration_ms: u32,
    pub timeout_ms: u32,
    pub ata: AtaReturn,
    pub sense_key: u8,
}

pub fn classify_passthrough(sig: &CompletionSignals) -> BlockStatus {
    if sig.submit_failed {
        return BlockStatus::Error;
    }
    if sig.duration_ms >= sig.timeout_ms {
        return BlockStatus::Timeout;
    }
    if sig.ata.status.err() {
        let e = sig.ata.error;
        return if e.uncorrectable() {
            BlockStatus::Uncorrectable
        } else if e.id_not_found() {
            BlockStatus::IdNotFound
        } else if e.aborted() {
            BlockStatus::Aborted
        } else {
            BlockStatus::Error
        };
    }
    if sig.ata.status.device_fault() {
        return BlockStatus::Error;
    }
    match sig.sense_key {
        0 => BlockStatus::Ok,
        SENSE_KEY_ABORTED_COMMAND => BlockStatus::Aborted,
        _ => BlockStatus::Error,
    }
}

/// Native reads are all-or-nothing: anything short of `requested` is an error.
pub fn classify_native(requested: usize, transferred: usize) -> BlockStatus {
    if transferred == requested {
        BlockStatus::Ok
    } else {
        BlockStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ata::{AtaError, AtaStatus};

    const TIMEOUT: u32 = 60_000;

    fn clean() -> CompletionSignals {
        CompletionSignals {
            timeout_ms: TIMEOUT,
            duration_ms: 12,
            ..Default::default()
        }
    }

    fn with_regs(status: u8, error: u8) -> CompletionSignals {
        CompletionSignals {
            ata: AtaReturn {
                status: AtaStatus(status),
                error: AtaError(error),
            },
            ..clean()
        }
    }

    #[test]
    fn all_clear_is_ok() {
        assert_eq!(classify_passthrough(&clean()), BlockStatus::Ok);
    }

    #[test]
    fn submit_failure() {
        let sig = CompletionSignals { submit_failed: true, ..clean() };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Error);
    }

    #[test]
    fn duration_reaching_timeout() {
        let sig = CompletionSignals { duration_ms: TIMEOUT, ..clean() };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Timeout);
        let sig = CompletionSignals { duration_ms: TIMEOUT - 1, ..clean() };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Ok);
    }

    #[test]
    fn error_bit_sub_bits() {
        let cases = [
            (AtaError::UNC, BlockStatus::Uncorrectable),
            (AtaError::IDNF, BlockStatus::IdNotFound),
            (AtaError::ABRT, BlockStatus::Aborted),
            (0, BlockStatus::Error),
            (AtaError::UNC | AtaError::IDNF | AtaError::ABRT, BlockStatus::Uncorrectable),
            (AtaError::IDNF | AtaError::ABRT, BlockStatus::IdNotFound),
        ];
        for (error, want) in cases {
            assert_eq!(classify_passthrough(&with_regs(AtaStatus::ERR, error)), want, "error reg {error:#04x}");
        }
    }

    #[test]
    fn error_sub_bits_ignored_without_err() {
        assert_eq!(classify_passthrough(&with_regs(0, AtaError::UNC)), BlockStatus::Ok);
    }

    #[test]
    fn device_fault() {
        assert_eq!(classify_passthrough(&with_regs(AtaStatus::DF, 0)), BlockStatus::Error);
    }

    #[test]
    fn sense_keys() {
        let sig = CompletionSignals { sense_key: 0x0b, ..clean() };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Aborted);
        for key in [0x01, 0x03, 0x04, 0x05, 0x06, 0x0e] {
            let sig = CompletionSignals { sense_key: key, ..clean() };
            assert_eq!(classify_passthrough(&sig), BlockStatus::Error, "sense key {key:#04x}");
        }
    }

    #[test]
    fn submit_failure_beats_everything() {
        let sig = CompletionSignals {
            submit_failed: true,
            duration_ms: TIMEOUT,
            sense_key: 0x0b,
            ..with_regs(AtaStatus::ERR | AtaStatus::DF, AtaError::UNC)
        };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Error);
    }

    #[test]
    fn timeout_beats_error_bits_and_sense() {
        let sig = CompletionSignals {
            duration_ms: TIMEOUT + 5,
            sense_key: 0x0b,
            ..with_regs(AtaStatus::ERR, AtaError::UNC)
        };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Timeout);
    }

    #[test]
    fn error_bit_beats_device_fault() {
        let sig = with_regs(AtaStatus::ERR | AtaStatus::DF, AtaError::ABRT);
        assert_eq!(classify_passthrough(&sig), BlockStatus::Aborted);
    }

    #[test]
    fn device_fault_beats_aborted_sense() {
        let sig = CompletionSignals { sense_key: 0x0b, ..with_regs(AtaStatus::DF, 0) };
        assert_eq!(classify_passthrough(&sig), BlockStatus::Error);
    }

    #[test]
    fn error_bit_beats_sense_key() {
        let sig = CompletionSignals { sense_key: 0x03, ..with_regs(AtaStatus::ERR, AtaError::IDNF) };
        assert_eq!(classify_passthrough(&sig), BlockStatus::IdNotFound);
    }

    #[test]
    fn native_length_check() {
        assert_eq!(classify_native(131072, 131072), BlockStatus::Ok);
        assert_eq!(classify_native(131072, 0), BlockStatus::Error);
        assert_eq!(classify_native(131072, 65536), BlockStatus::Error);
    }
}
