use std::collections::HashMap;

use crate::frame::buffer::FrameDesc;

/// Limits for recycled frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BufferPoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per (width, height, format) bucket.
    pub max_buffers_per_bucket: usize,
}

impl Default for BufferPoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_buffers_per_bucket: 8,
        }
    }
}

/// Allocation counters for a [`BufferPool`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Buffers currently held for reuse.
    pub retained_buffers: usize,
    /// Bytes currently held for reuse.
    pub retained_bytes: usize,
    /// Buffers freshly allocated.
    pub alloc_buffers: u64,
    /// Bytes freshly allocated.
    pub alloc_bytes: u64,
    /// Borrows served from a retained buffer.
    pub reused_buffers: u64,
    /// Releases that were dropped because a cap was hit.
    pub dropped_on_release: u64,
}

struct Bucket {
    surfaces: Vec<Vec<u8>>,
}

/// Bounded pool of zeroed pixel buffers keyed by [`FrameDesc`].
///
/// Borrow/release happen at frame granularity, never per pixel.
pub(crate) struct BufferPool {
    opts: BufferPoolOpts,
    stats: BufferPoolStats,

    bucket_idx_by_key: HashMap<FrameDesc, usize>,
    buckets: Vec<Bucket>,
}

impl BufferPool {
    pub(crate) fn new(opts: BufferPoolOpts) -> Self {
        Self {
            opts,
            stats: BufferPoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    pub(crate) fn stats(&self) -> BufferPoolStats {
        self.stats
    }

    pub(crate) fn borrow(&mut self, desc: FrameDesc) -> Vec<u8> {
        let len = desc.byte_len();
        if let Some(&bi) = self.bucket_idx_by_key.get(&desc)
            && let Some(mut buf) = self.buckets[bi].surfaces.pop()
        {
            self.stats.retained_buffers = self.stats.retained_buffers.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(len);
            self.stats.reused_buffers = self.stats.reused_buffers.saturating_add(1);
            buf.fill(0);
            return buf;
        }

        self.stats.alloc_buffers = self.stats.alloc_buffers.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(len as u64);
        vec![0; len]
    }

    pub(crate) fn release(&mut self, desc: FrameDesc, buf: Vec<u8>) {
        let bytes = desc.byte_len();
        if self.opts.max_pool_bytes == 0
            || self.opts.max_buffers_per_bucket == 0
            || buf.len() != bytes
            || self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match self.bucket_idx_by_key.get(&desc).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_key.insert(desc, i);
                i
            }
        };

        let bucket = &mut self.buckets[bi];
        if bucket.surfaces.len() >= self.opts.max_buffers_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.surfaces.push(buf);
        self.stats.retained_buffers = self.stats.retained_buffers.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/processor/buffer_pool.rs"]
mod tests;
