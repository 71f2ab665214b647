//! Device storage with optional host mirror.

use std::ops::Range;
use wgpu::{Buffer, CommandEncoder};

/// One device buffer, plus a host-visible mirror in managed mode.
///
/// In shared mode the device buffer itself is host-mappable and `mirror` is
/// `None`. The size is always a multiple of 4 bytes.
pub(crate) struct Storage {
    buffer: Buffer,
    mirror: Option<Buffer>,
    size: u64,
}

impl Storage {
    pub(crate) fn new(buffer: Buffer, mirror: Option<Buffer>, size: u64) -> Self {
        Self {
            buffer,
            mirror,
            size,
        }
    }

    /// Buffer bound to kernels.
    #[inline]
    pub(crate) fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Buffer the host maps for reads.
    #[inline]
    pub(crate) fn host(&self) -> &Buffer {
        self.mirror.as_ref().unwrap_or(&self.buffer)
    }

    #[inline]
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Encode the synchronize copy of `range` from device to mirror.
    ///
    /// No-op without a mirror.
    pub(crate) fn encode_sync(&self, encoder: &mut CommandEncoder, range: Range<u64>) {
        if let Some(mirror) = &self.mirror {
            encoder.copy_buffer_to_buffer(
                &self.buffer,
                range.start,
                mirror,
                range.start,
                range.end - range.start,
            );
        }
    }

    /// Encode the synchronize copy of the whole buffer.
    pub(crate) fn encode_sync_all(&self, encoder: &mut CommandEncoder) {
        self.encode_sync(encoder, 0..self.size);
    }
}
