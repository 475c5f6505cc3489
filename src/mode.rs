//! Execution modes and the resources each one holds for the scan.

use std::fmt;
use std::str::FromStr;

use crate::buffer::AlignedBuffer;
use crate::device::{Access, BlockDevice, PassthroughCommand};
use crate::error::{Result, ScanError};
use crate::logging::Logger;
use crate::progress::{BLOCK_SIZE, CHUNK_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// ATA READ VERIFY SECTORS EXT through SG_IO.
    Ata,
    /// Plain `read()` on an O_DIRECT descriptor.
    Posix,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ata => "ata",
            Mode::Posix => "posix",
        }
    }

    pub fn access(self) -> Access {
        match self {
            Mode::Ata => Access::ReadWrite,
            Mode::Posix => Access::DirectRead,
        }
    }
}

impl FromStr for Mode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ata" => Ok(Mode::Ata),
            "posix" => Ok(Mode::Posix),
            other => Err(ScanError::Config(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-mode scratch state reused for every chunk.
#[derive(Debug)]
pub enum ModeResources {
    Ata(PassthroughCommand),
    Posix(AlignedBuffer),
}

impl ModeResources {
    pub fn allocate(mode: Mode) -> Result<Self> {
        match mode {
            Mode::Ata => Ok(ModeResources::Ata(PassthroughCommand::default())),
            Mode::Posix => AlignedBuffer::page_aligned(CHUNK_BYTES)
                .map(ModeResources::Posix)
                .map_err(|e| ScanError::resource("allocating aligned transfer buffer", e)),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeResources::Ata(_) => Mode::Ata,
            ModeResources::Posix(_) => Mode::Posix,
        }
    }
}

/// Open device with read-ahead disabled. Dropping it puts the saved
/// read-ahead back and closes the descriptor.
pub struct DeviceSession<D: BlockDevice> {
    device: D,
    saved_readahead: Option<u64>,
    log: Logger,
}

impl<D: BlockDevice> DeviceSession<D> {
    /// Position at `start_lba`, flush the buffer cache and zero read-ahead.
    /// Failures are logged and skipped.
    pub fn prepare(mut device: D, start_lba: u64, log: Logger) -> Self {
        if let Err(e) = device.seek_to(start_lba * BLOCK_SIZE) {
            log.warn(format!("Seeking to lba {start_lba} failed: {e}"));
        }

        if let Err(e) = device.flush_buffers() {
            log.warn(format!("Flushing block device buffers failed: {e}"));
        }
        let saved_readahead = match device.readahead() {
            Ok(ra) => Some(ra),
            Err(e) => {
                log.warn(format!("Getting block device readahead setting failed: {e}"));
                None
            }
        };
        if let Err(e) = device.set_readahead(0) {
            log.warn(format!("Disabling block device readahead setting failed: {e}"));
        }

        DeviceSession {
            device,
            saved_readahead,
            log,
        }
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn saved_readahead(&self) -> Option<u64> {
        self.saved_readahead
    }
}

impl<D: BlockDevice> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Some(ra) = self.saved_readahead.take() {
            if let Err(e) = self.device.set_readahead(ra) {
                self.log.warn(format!("Restoring block device readahead setting failed: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modes() {
        assert_eq!("ata".parse::<Mode>().unwrap(), Mode::Ata);
        assert_eq!("posix".parse::<Mode>().unwrap(), Mode::Posix);
        match "auto".parse::<Mode>() {
            Err(ScanError::Config(s)) => assert_eq!(s, "auto"),
            other => panic!("expected config error, got {other:?}"),
        }
        assert!("ATA".parse::<Mode>().is_err());
    }

    #[test]
    fn access_per_mode() {
        assert_eq!(Mode::Ata.access(), Access::ReadWrite);
        assert_eq!(Mode::Posix.access(), Access::DirectRead);
    }

    #[test]
    fn posix_gets_chunk_sized_buffer() {
        match ModeResources::allocate(Mode::Posix).unwrap() {
            ModeResources::Posix(buf) => {
                assert_eq!(buf.len(), CHUNK_BYTES);
                assert_eq!(buf.as_slice().as_ptr() as usize % buf.alignment(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ModeResources::allocate(Mode::Ata).unwrap().mode(), Mode::Ata);
    }
}
