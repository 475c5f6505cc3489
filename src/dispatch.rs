//! Issues one chunk through the active mode and times the submission.

use std::io;
use std::time::Instant;

use crate::block_status::{BlockStatus, ChunkResult};
use crate::classifier::{classify_native, classify_passthrough};
use crate::device::BlockDevice;
use crate::logging::Logger;
use crate::mode::ModeResources;
use crate::progress::{ChunkRequest, BLOCK_SIZE};

/// Result of one dispatch. `submit_error` is set only when a passthrough
/// command could not be issued at all.
#[derive(Debug)]
pub struct Dispatched {
    pub result: ChunkResult,
    pub submit_error: Option<io::Error>,
}

pub fn dispatch<D: BlockDevice>(
    device: &mut D,
    resources: &mut ModeResources,
    req: &ChunkRequest,
    log: &Logger,
) -> Dispatched {
    match resources {
        ModeResources::Ata(cmd) => {
            // Chunks never exceed 256 sectors.
            cmd.prepare_verify(req.lba, req.sectors as u16);

            let pre = Instant::now();
            let ret = device.passthrough(cmd);
            let elapsed_us = pre.elapsed().as_micros() as u64;

            let status = classify_passthrough(&cmd.signals(ret.is_err()));
            Dispatched {
                result: ChunkResult {
                    elapsed_us,
                    status,
                    full_transfer: None,
                },
                submit_error: ret.err(),
            }
        }
        ModeResources::Posix(buf) => {
            let want = req.byte_len();

            let pre = Instant::now();
            let ret = device.read_direct(buf, want);
            let elapsed_us = pre.elapsed().as_micros() as u64;

            let got = match ret {
                Ok(n) => n,
                Err(e) => {
                    log.warn(format!("Read at lba {} failed: {e}", req.lba));
                    0
                }
            };
            let status = classify_native(want, got);
            if status != BlockStatus::Ok {
                // File position is undefined after a short read; the next
                // chunk starts where this one was supposed to end.
                let next_lba = req.lba + req.sectors;
                if let Err(e) = device.seek_to(next_lba * BLOCK_SIZE) {
                    log.warn(format!("Repositioning to lba {next_lba} failed: {e}"));
                }
            }
            Dispatched {
                result: ChunkResult {
                    elapsed_us,
                    status,
                    full_transfer: Some(status == BlockStatus::Ok),
                },
                submit_error: None,
            }
        }
    }
}
