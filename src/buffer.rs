use std::alloc::Layout;
use std::io;

use aligned_vec::{AVec, RuntimeAlign};

/// Fallback when the OS won't tell us its page size.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if sz > 0 {
            return sz as usize;
        }
    }
    DEFAULT_PAGE_SIZE
}

/// Zero-filled transfer buffer whose start address is a multiple of
/// `alignment()`. Direct I/O reads only accept this type.
pub struct AlignedBuffer {
    buf: AVec<u8, RuntimeAlign>,
    alignment: usize,
}

impl AlignedBuffer {
    /// Zero-filled buffer of `len` bytes. Invalid sizes are an error; running
    /// out of memory aborts like any other heap allocation.
    pub fn new(len: usize, alignment: usize) -> io::Result<Self> {
        if len == 0 || Layout::from_size_align(len, alignment).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot allocate {len} bytes aligned to {alignment}"),
            ));
        }
        let mut buf = AVec::with_capacity(alignment, len);
        for _ in 0..len {
            buf.push(0);
        }
        Ok(AlignedBuffer { buf, alignment })
    }

    pub fn page_aligned(len: usize) -> io::Result<Self> {
        Self::new(len, page_size())
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_mut_slice()
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len())
            .field("alignment", &self.alignment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_aligned_start() {
        let b = AlignedBuffer::page_aligned(256 * 512).unwrap();
        assert_eq!(b.len(), 131072);
        assert_eq!(b.as_slice().as_ptr() as usize % b.alignment(), 0);
        assert!(b.alignment() >= 512);
        assert!(b.as_slice().iter().all(|&x| x == 0));
    }

    #[test]
    fn rejects_bad_alignment() {
        assert!(AlignedBuffer::new(4096, 3000).is_err());
        assert!(AlignedBuffer::new(0, 4096).is_err());
    }

    #[test]
    fn oversized_request_is_an_error() {
        let err = AlignedBuffer::new(usize::MAX - 100, 4096).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
