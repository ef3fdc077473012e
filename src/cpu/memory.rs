//! Memory segments.
//!
//! The machine has two independent flat byte segments of 64 KiB each: one
//! holding code (and inline immediates), one holding data (and the stack).
//! Multi-byte values are stored big-endian: high byte at the lower address.

use log::trace;
use thiserror::Error;

/// The size of each segment in bytes.
pub const SEGMENT_SIZE: usize = 64 * 1024;

/// A 64 KiB byte-addressable segment.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Create a new zero-filled segment.
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; SEGMENT_SIZE].into_boxed_slice(),
        }
    }

    /// Create a segment holding `image` at address 0, zero-padded to the full size.
    pub fn from_image(image: &[u8]) -> Result<Self, MemoryError> {
        if image.len() > SEGMENT_SIZE {
            return Err(MemoryError::ImageTooLarge {
                size: image.len(),
                available: SEGMENT_SIZE,
            });
        }

        let mut mem = Self::new();
        mem.bytes[..image.len()].copy_from_slice(image);
        Ok(mem)
    }

    /// Read a byte. Every 16-bit address is in range.
    #[inline]
    pub fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    /// Write a byte.
    #[inline]
    pub fn write_byte(&mut self, addr: u16, val: u8) {
        trace!("Mem: writing {val:#04x} to {addr:#06x} (byte)");
        self.bytes[addr as usize] = val;
    }

    /// Read a big-endian word at `addr` and `addr + 1`.
    pub fn read_word(&self, addr: u16) -> Result<u16, MemoryError> {
        let hi = addr as usize;
        let lo = hi + 1;
        if lo >= SEGMENT_SIZE {
            return Err(MemoryError::OutOfBounds(addr));
        }
        Ok(u16::from_be_bytes([self.bytes[hi], self.bytes[lo]]))
    }

    /// Write a big-endian word at `addr` and `addr + 1`.
    pub fn write_word(&mut self, addr: u16, val: u16) -> Result<(), MemoryError> {
        let hi = addr as usize;
        if hi + 1 >= SEGMENT_SIZE {
            return Err(MemoryError::OutOfBounds(addr));
        }
        trace!("Mem: writing {val:#06x} to {addr:#06x} (word)");
        self.bytes[hi..hi + 2].copy_from_slice(&val.to_be_bytes());
        Ok(())
    }

    /// The NUL-terminated byte string starting at `addr`, without the terminator.
    pub fn read_cstr(&self, addr: u16) -> Result<&[u8], MemoryError> {
        let tail = &self.bytes[addr as usize..];
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(MemoryError::OutOfBounds(addr))?;
        Ok(&tail[..len])
    }

    /// Zero the whole segment.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// The raw segment contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero bytes
        let non_zero = self.bytes.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &SEGMENT_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// A multi-byte access ran past the end of the segment.
    #[error("access at {0:#06x} runs past the end of the segment")]
    OutOfBounds(u16),

    /// An image does not fit in a segment.
    #[error("image size {size} exceeds segment size {available}")]
    ImageTooLarge { size: usize, available: usize },
}
