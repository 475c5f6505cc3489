//! The device primitives the read test consumes: open, seek, read,
//! passthrough submission, buffer-cache flush and read-ahead get/set.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::ata::{self, CDB_LEN, SENSE_LEN};
use crate::buffer::AlignedBuffer;
use crate::classifier::CompletionSignals;
use crate::progress::BLOCK_SIZE;

/// Passthrough timeout handed to the kernel.
pub const DEFAULT_TIMEOUT_MS: u32 = 60_000;

/// How a mode needs the device opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Passthrough commands need a writable descriptor even for VERIFY.
    ReadWrite,
    /// Read-only, uncached, large-file, no atime update.
    DirectRead,
}

/// One SCSI passthrough command plus the completion fields the kernel
/// fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughCommand {
    pub cdb: [u8; CDB_LEN],
    pub sense: [u8; SENSE_LEN],
    pub timeout_ms: u32,
    pub duration_ms: u32,
    pub status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    pub sense_len_written: u8,
}

impl Default for PassthroughCommand {
    fn default() -> Self {
        PassthroughCommand {
            cdb: [0; CDB_LEN],
            sense: [0; SENSE_LEN],
            timeout_ms: DEFAULT_TIMEOUT_MS,
            duration_ms: 0,
            status: 0,
            host_status: 0,
            driver_status: 0,
            sense_len_written: 0,
        }
    }
}

impl PassthroughCommand {
    /// Zero everything and load a READ VERIFY SECTORS EXT for the range.
    pub fn prepare_verify(&mut self, lba: u64, sectors: u16) {
        *self = PassthroughCommand {
            cdb: ata::verify_ext_cdb(lba, sectors),
            ..Default::default()
        };
    }

    pub fn signals(&self, submit_failed: bool) -> CompletionSignals {
        CompletionSignals {
            submit_failed,
            duration_ms: self.duration_ms,
            timeout_ms: self.timeout_ms,
            ata: ata::ata_return(&self.sense),
            sense_key: ata::sense_key(&self.sense),
        }
    }
}

/// Operations the read test issues against an open device.
pub trait BlockDevice {
    fn seek_to(&mut self, offset: u64) -> io::Result<u64>;
    /// One read call of up to `len` bytes into the aligned buffer.
    fn read_direct(&mut self, buf: &mut AlignedBuffer, len: usize) -> io::Result<usize>;
    fn passthrough(&mut self, cmd: &mut PassthroughCommand) -> io::Result<()>;
    fn flush_buffers(&mut self) -> io::Result<()>;
    /// Read-ahead in 512-byte sectors.
    fn readahead(&mut self) -> io::Result<u64>;
    fn set_readahead(&mut self, sectors: u64) -> io::Result<()>;
}

/// What the host knows about the target before the test starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub capacity_blocks: u64,
}

impl DeviceInfo {
    pub fn new<P: Into<PathBuf>>(path: P, capacity_blocks: u64) -> Self {
        DeviceInfo {
            path: path.into(),
            capacity_blocks,
        }
    }

    /// Size a block device or regular file in 512-byte blocks.
    pub fn query<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = capacity_bytes(path)?;
        Ok(DeviceInfo::new(path, bytes / BLOCK_SIZE))
    }
}

fn capacity_bytes(path: &Path) -> io::Result<u64> {
    let md = std::fs::metadata(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if md.file_type().is_block_device() {
            let f = File::open(path)?;
            return sys::block_size_bytes(&f);
        }
    }
    if md.is_file() {
        Ok(md.len())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is neither a block device nor a regular file", path.display()),
        ))
    }
}

/// A real device node (or image file).
#[derive(Debug)]
pub struct RawDevice {
    file: File,
    path: PathBuf,
}

impl RawDevice {
    pub fn open<P: AsRef<Path>>(path: P, access: Access) -> io::Result<Self> {
        let path = path.as_ref();
        let mut opts = OpenOptions::new();
        match access {
            Access::ReadWrite => {
                opts.read(true).write(true);
            }
            Access::DirectRead => {
                opts.read(true);
                sys::direct_read_flags(&mut opts);
            }
        }
        let file = opts.open(path)?;
        Ok(RawDevice {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for RawDevice {
    fn seek_to(&mut self, offset: u64) -> io::Result<u64> {
        self.file.seek(SeekFrom::Start(offset))
    }

    fn read_direct(&mut self, buf: &mut AlignedBuffer, len: usize) -> io::Result<usize> {
        let len = len.min(buf.len());
        self.file.read(&mut buf.as_mut_slice()[..len])
    }

    fn passthrough(&mut self, cmd: &mut PassthroughCommand) -> io::Result<()> {
        sys::sg_io(&self.file, cmd)
    }

    fn flush_buffers(&mut self) -> io::Result<()> {
        sys::flush_buffers(&self.file)
    }

    fn readahead(&mut self) -> io::Result<u64> {
        sys::readahead(&self.file)
    }

    fn set_readahead(&mut self, sectors: u64) -> io::Result<()> {
        sys::set_readahead(&self.file, sectors)
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod linux;
        use linux as sys;
    } else {
        mod sys {
            use std::fs::{File, OpenOptions};
            use std::io;

            use super::PassthroughCommand;

            fn unsupported(what: &str) -> io::Error {
                io::Error::new(io::ErrorKind::Unsupported, format!("{what} is only implemented on Linux"))
            }

            pub fn direct_read_flags(_opts: &mut OpenOptions) {}

            pub fn block_size_bytes(_f: &File) -> io::Result<u64> {
                Err(unsupported("block device sizing"))
            }

            pub fn sg_io(_f: &File, _cmd: &mut PassthroughCommand) -> io::Result<()> {
                Err(unsupported("SG_IO passthrough"))
            }

            pub fn flush_buffers(_f: &File) -> io::Result<()> {
                Err(unsupported("buffer flush"))
            }

            pub fn readahead(_f: &File) -> io::Result<u64> {
                Err(unsupported("read-ahead query"))
            }

            pub fn set_readahead(_f: &File, _sectors: u64) -> io::Result<()> {
                Err(unsupported("read-ahead update"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn regular_file_capacity_in_blocks() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vec![0u8; 512 * 10 + 100]).unwrap();
        tmp.flush().unwrap();
        let info = DeviceInfo::query(tmp.path()).unwrap();
        assert_eq!(info.capacity_blocks, 10);
        assert_eq!(info.path, tmp.path());
    }

    #[test]
    fn missing_path_capacity_fails() {
        assert!(DeviceInfo::query("/nonexistent/disk_verifier/dev").is_err());
    }

    #[test]
    fn prepare_verify_resets_completion_fields() {
        let mut cmd = PassthroughCommand::default();
        cmd.duration_ms = 70_000;
        cmd.sense[0] = 0x72;
        cmd.sense[1] = 0x0b;
        cmd.prepare_verify(2048, 256);
        assert_eq!(cmd.duration_ms, 0);
        assert_eq!(cmd.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cmd.sense, [0; SENSE_LEN]);
        assert_eq!(cmd.cdb[14], ata::ATA_READ_VERIFY_EXT);
        assert_eq!(cmd.signals(false), CompletionSignals { timeout_ms: DEFAULT_TIMEOUT_MS, ..Default::default() });
    }

    #[test]
    fn open_read_write_regular_file() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = RawDevice::open(tmp.path(), Access::ReadWrite).unwrap();
        assert_eq!(dev.seek_to(0).unwrap(), 0);
        assert_eq!(dev.path(), tmp.path());
    }
}
