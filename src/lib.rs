//! Block-range read verification for storage devices.
//!
//! [`ReadTest`] walks a device from a start LBA to its end in 256-sector
//! chunks. Each chunk is either read with `O_DIRECT` (`posix` api) or checked
//! with an ATA READ VERIFY SECTORS EXT passed through SG_IO (`ata` api), timed,
//! and given a [`BlockStatus`].

pub mod ata;
pub mod block_status;
pub mod buffer;
pub mod classifier;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod mode;
pub mod procedure;
pub mod progress;


pub use block_status::{BlockStatus, ChunkReport, ChunkResult, ScanSummary};
pub use device::{Access, BlockDevice, DeviceInfo, RawDevice};
pub use error::{Result, ScanError};
pub use logging::Logger;
pub use mode::Mode;
pub use procedure::{run_procedure, Procedure, ReadTest, ScanConfig};
pub use progress::{Progress, BLOCK_SIZE, CHUNK_SECTORS};
