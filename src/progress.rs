use crate::error::{Result, ScanError};

/// Bytes per LBA.
pub const BLOCK_SIZE: u64 = 512;
/// LBAs per chunk.
pub const CHUNK_SECTORS: u64 = 256;
pub const CHUNK_BYTES: usize = (CHUNK_SECTORS * BLOCK_SIZE) as usize;

/// One slice of the scan range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub lba: u64,
    pub sectors: u64,
}

impl ChunkRequest {
    pub fn byte_offset(&self) -> u64 {
        self.lba * BLOCK_SIZE
    }

    pub fn byte_len(&self) -> usize {
        (self.sectors * BLOCK_SIZE) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed_chunks: u64,
    pub total_chunks: u64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total_chunks == 0 {
            return 1.0;
        }
        self.completed_chunks as f64 / self.total_chunks as f64
    }

    pub fn is_complete(&self) -> bool {
        self.completed_chunks >= self.total_chunks
    }
}

pub fn chunk_count(lba_to_process: u64) -> u64 {
    lba_to_process.div_ceil(CHUNK_SECTORS)
}

/// LBA cursor over `[start, end)`. `cursor + remaining == end_lba` always.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    cursor: u64,
    remaining: u64,
    end_lba: u64,
    progress: Progress,
}

impl ScanCursor {
    pub fn new(start_lba: u64, end_lba: u64) -> Result<Self> {
        if start_lba >= end_lba {
            return Err(ScanError::Range { start_lba, end_lba });
        }
        let remaining = end_lba - start_lba;
        Ok(ScanCursor {
            cursor: start_lba,
            remaining,
            end_lba,
            progress: Progress {
                completed_chunks: 0,
                total_chunks: chunk_count(remaining),
            },
        })
    }

    /// The chunk the next step should cover, `None` once the range is done.
    pub fn next_chunk(&self) -> Option<ChunkRequest> {
        if self.remaining == 0 {
            return None;
        }
        Some(ChunkRequest {
            lba: self.cursor,
            sectors: self.remaining.min(CHUNK_SECTORS),
        })
    }

    /// Consume `req` whatever its verdict was.
    pub fn advance(&mut self, req: &ChunkRequest) {
        debug_assert_eq!(req.lba, self.cursor);
        self.progress.completed_chunks += 1;
        self.remaining -= req.sectors;
        self.cursor += req.sectors;
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn end_lba(&self) -> u64 {
        self.end_lba
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn million_blocks() {
        let c = ScanCursor::new(0, 1_000_000).unwrap();
        assert_eq!(c.remaining(), 1_000_000);
        assert_eq!(c.progress().total_chunks, 3907);
    }

    #[test]
    fn empty_or_inverted_range() {
        assert!(matches!(ScanCursor::new(10, 10), Err(ScanError::Range { start_lba: 10, end_lba: 10 })));
        assert!(matches!(ScanCursor::new(11, 10), Err(ScanError::Range { .. })));
    }

    #[test]
    fn walks_exactly_total_chunks() {
        let mut c = ScanCursor::new(100, 100 + 3 * 256 + 17).unwrap();
        let total = c.progress().total_chunks;
        assert_eq!(total, 4);
        let mut steps = 0;
        while let Some(req) = c.next_chunk() {
            assert_eq!(c.cursor() + c.remaining(), c.end_lba());
            assert_eq!(req.sectors, c.remaining().min(CHUNK_SECTORS));
            let before = c.cursor();
            c.advance(&req);
            assert_eq!(c.cursor() - before, req.sectors);
            assert_eq!(c.cursor() + c.remaining(), c.end_lba());
            steps += 1;
        }
        assert_eq!(steps, total);
        assert_eq!(c.remaining(), 0);
        assert!(c.progress().is_complete());
        assert_eq!(c.progress().fraction(), 1.0);
    }

    #[test]
    fn last_chunk_is_short() {
        let mut c = ScanCursor::new(0, 300).unwrap();
        let first = c.next_chunk().unwrap();
        c.advance(&first);
        let last = c.next_chunk().unwrap();
        assert_eq!(last, ChunkRequest { lba: 256, sectors: 44 });
        assert_eq!(last.byte_offset(), 256 * 512);
        assert_eq!(last.byte_len(), 44 * 512);
    }
}
