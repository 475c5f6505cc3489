use std::io;

/// Fatal failures of the read test.
///
/// Per-chunk health verdicts are not errors; they travel in
/// [`BlockStatus`](crate::BlockStatus).
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("unknown api \"{0}\": expected \"ata\" or \"posix\"")]
    Config(String),
    #[error("nothing to scan: start lba {start_lba} is not below end lba {end_lba}")]
    Range { start_lba: u64, end_lba: u64 },
    #[error("{what}: {source}")]
    Resource {
        what: String,
        #[source]
        source: io::Error,
    },
    #[error("passthrough submission failed at lba {lba}: {source}")]
    Submission {
        lba: u64,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub(crate) fn resource<S: Into<String>>(what: S, source: io::Error) -> Self {
        ScanError::Resource {
            what: what.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
