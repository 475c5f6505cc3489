//! The read test as a three-phase procedure: open, perform one chunk at a
//! time, close.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::block_status::{ChunkReport, ChunkResult, ScanSummary};
use crate::device::{Access, BlockDevice, DeviceInfo, RawDevice};
use crate::dispatch::dispatch;
use crate::error::{Result, ScanError};
use crate::logging::Logger;
use crate::mode::{DeviceSession, Mode, ModeResources};
use crate::progress::{Progress, ScanCursor};

/// Options the host passes at setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// `"ata"` or `"posix"`.
    pub mode: String,
    pub start_lba: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            mode: Mode::Ata.as_str().to_string(),
            start_lba: 0,
        }
    }
}

/// Contract between a procedure and whatever drives it.
pub trait Procedure {
    const NAME: &'static str;
    const LONG_NAME: &'static str;

    /// Attempt one unit of work. `Ok(None)` means there is nothing left.
    fn perform(&mut self) -> Result<Option<ChunkResult>>;
    /// Report for the most recent `perform`.
    fn report(&self) -> Option<ChunkReport>;
    fn progress(&self) -> Progress;
    fn close(self);
}

/// Sequential scan of `[start_lba, capacity)` in 256-sector chunks.
pub struct ReadTest<D: BlockDevice = RawDevice> {
    resources: ModeResources,
    session: DeviceSession<D>,
    cursor: ScanCursor,
    report: Option<ChunkReport>,
    log: Logger,
}

impl ReadTest<RawDevice> {
    pub fn open(config: &ScanConfig, info: &DeviceInfo, log: Logger) -> Result<Self> {
        Self::open_with(config, info, log, |access| RawDevice::open(&info.path, access))
    }
}

impl<D: BlockDevice> ReadTest<D> {
    /// Setup with a caller-supplied way of opening the device.
    pub fn open_with<F>(config: &ScanConfig, info: &DeviceInfo, log: Logger, opener: F) -> Result<Self>
    where
        F: FnOnce(Access) -> std::io::Result<D>,
    {
        let mode: Mode = config.mode.parse()?;
        let cursor = ScanCursor::new(config.start_lba, info.capacity_blocks)?;
        let resources = ModeResources::allocate(mode)?;

        let device = opener(mode.access()).map_err(|e| {
            log.fatal(format!("open {} fail: {e}", info.path.display()));
            ScanError::resource(format!("opening {}", info.path.display()), e)
        })?;
        let session = DeviceSession::prepare(device, config.start_lba, log.clone());

        log.info(format!(
            "{}: api {}, lba {}..{}, {} chunks",
            Self::NAME,
            mode,
            config.start_lba,
            cursor.end_lba(),
            cursor.progress().total_chunks
        ));
        Ok(ReadTest {
            resources,
            session,
            cursor,
            report: None,
            log,
        })
    }

    /// Attempt the next chunk. Progress and the report slot advance even
    /// when this returns [`ScanError::Submission`].
    pub fn step(&mut self) -> Result<Option<ChunkResult>> {
        let Some(req) = self.cursor.next_chunk() else {
            return Ok(None);
        };
        let out = dispatch(self.session.device_mut(), &mut self.resources, &req, &self.log);

        self.report = Some(ChunkReport {
            lba: req.lba,
            status: out.result.status,
            elapsed_us: out.result.elapsed_us,
        });
        self.cursor.advance(&req);

        match out.submit_error {
            Some(source) => Err(ScanError::Submission { lba: req.lba, source }),
            None => Ok(Some(out.result)),
        }
    }

    pub fn mode(&self) -> Mode {
        self.resources.mode()
    }

    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    pub fn saved_readahead(&self) -> Option<u64> {
        self.session.saved_readahead()
    }

    /// Restore read-ahead, free the buffer, close the device.
    pub fn teardown(self) {
        self.log.info(format!(
            "{}: closing after {}/{} chunks",
            Self::NAME,
            self.cursor.progress().completed_chunks,
            self.cursor.progress().total_chunks
        ));
        drop(self);
    }
}

impl<D: BlockDevice> Procedure for ReadTest<D> {
    const NAME: &'static str = "read_test";
    const LONG_NAME: &'static str = "Test device with reading";

    fn perform(&mut self) -> Result<Option<ChunkResult>> {
        self.step()
    }

    fn report(&self) -> Option<ChunkReport> {
        self.report
    }

    fn progress(&self) -> Progress {
        self.cursor.progress()
    }

    fn close(self) {
        self.teardown();
    }
}

/// Drive `proc` to the end of its range or until `stop` is raised, then
/// close it. Submission failures are logged and the scan moves on.
pub fn run_procedure<P, F>(mut proc: P, stop: &AtomicBool, log: &Logger, mut on_step: F) -> ScanSummary
where
    P: Procedure,
    F: FnMut(&ChunkReport, Progress),
{
    let mut summary = ScanSummary::default();
    loop {
        if stop.load(Ordering::SeqCst) {
            log.info(format!("{} interrupted by user.", P::NAME));
            summary.interrupted = true;
            break;
        }
        match proc.perform() {
            Ok(None) => break,
            Ok(Some(_)) => {}
            Err(e) => {
                summary.submission_errors += 1;
                log.warn(e.to_string());
            }
        }
        if let Some(r) = proc.report() {
            summary.record(&r);
            on_step(&r, proc.progress());
        }
    }
    proc.close();
    summary
}
