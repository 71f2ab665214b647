//! Device context.
//!
//! `Context` owns the compute device, its single queue, the pipeline cache
//! and the memory-coherency strategy. Matrices and batches are created
//! through it and every operation is dispatched on its queue.
//!
//! # Thread Safety
//!
//! `Context` is a cheap `Clone` handle (`Arc` inside) and `Send + Sync`. The
//! pipeline cache is mutex guarded. Buffer contents are treated as
//! single-writer: every operation waits for its own submission before
//! returning.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use wgpu::{Buffer, BufferDescriptor, BufferUsages, CommandEncoder, Device, Queue};

use crate::device::{AdapterDescription, CoherencyMode, resolve_coherency, select_adapter};
use crate::error::{Error, Result};
use crate::options::ContextOptions;
use crate::shaders::{PipelineCache, ThreadLimits};
use crate::storage::Storage;

/// Counter for process-unique context ids.
static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Context
// ============================================================================

/// Handle to one compute device and its queue.
///
/// # Example
///
/// ```ignore
/// use bronze::prelude::*;
///
/// let ctx = Context::new()?;
/// let a = ctx.random_matrix(4, 4)?;
/// let b = ctx.scalar_multiply(&a, 2.0)?;
/// println!("{}", ctx.to_text(&b)?);
/// ```
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    pub(crate) id: u64,
    pub(crate) adapter: AdapterDescription,
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Queue,
    pub(crate) pipelines: PipelineCache,
    pub(crate) limits: ThreadLimits,
    pub(crate) coherency: CoherencyMode,
    pub(crate) max_buffer_size: u64,
    pub(crate) max_binding_size: u64,
    pub(crate) poll_timeout: Option<Duration>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("adapter", &self.inner.adapter)
            .field("coherency", &self.inner.coherency)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Initialize a context with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No suitable compute adapter is found
    /// - Device creation fails
    pub fn new() -> Result<Self> {
        Self::with_options(ContextOptions::default())
    }

    /// Initialize a context with explicit options.
    pub fn with_options(options: ContextOptions) -> Result<Self> {
        let adapter = pollster::block_on(select_adapter(&options))?;
        let adapter_desc = AdapterDescription::of(&adapter);
        let coherency = resolve_coherency(&adapter, options.coherency)?;

        let required_features = match coherency {
            CoherencyMode::Shared => wgpu::Features::MAPPABLE_PRIMARY_BUFFERS,
            CoherencyMode::Managed => wgpu::Features::empty(),
        };
        // Hardware maxima rather than the portable defaults
        let required_limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(options.label.as_str()),
            required_features,
            required_limits: required_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
            experimental_features: wgpu::ExperimentalFeatures::default(),
        }))
        .map_err(|e| Error::DeviceInit(format!("{:?}", e)))?;

        let device = Arc::new(device);
        let limits = ThreadLimits::from_limits(&required_limits);
        let id = CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            id,
            adapter = %adapter_desc.name,
            backend = ?adapter_desc.backend,
            device_type = ?adapter_desc.device_type,
            ?coherency,
            max_threads = ?[limits.width, limits.height, limits.depth],
            "bronze context initialized"
        );

        Ok(Self {
            inner: Arc::new(ContextInner {
                id,
                adapter: adapter_desc,
                pipelines: PipelineCache::new(device.clone()),
                device,
                queue,
                limits,
                coherency,
                max_buffer_size: required_limits.max_buffer_size,
                max_binding_size: required_limits.max_storage_buffer_binding_size as u64,
                poll_timeout: options.poll_timeout,
            }),
        })
    }

    /// Process-unique identifier of this context.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Coherency mode chosen for the device.
    #[inline]
    pub fn coherency(&self) -> CoherencyMode {
        self.inner.coherency
    }

    /// Description of the selected adapter.
    #[inline]
    pub fn adapter(&self) -> &AdapterDescription {
        &self.inner.adapter
    }

    /// Maximum threads per workgroup, per dimension.
    #[inline]
    pub fn max_threads(&self) -> ThreadLimits {
        self.inner.limits
    }

    /// Number of compiled pipelines held by the cache.
    pub fn cached_pipelines(&self) -> usize {
        self.inner.pipelines.cached_pipelines()
    }

    pub(crate) fn downgrade(&self) -> ContextRef {
        ContextRef {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Fail unless `owner` refers to this context.
    pub(crate) fn check_owner(&self, owner: &ContextRef) -> Result<()> {
        if owner.id != self.inner.id {
            return Err(Error::CrossContextOperand);
        }
        Ok(())
    }
}

// ============================================================================
// Weak owner reference
// ============================================================================

/// Non-owning reference from a matrix back to its context.
#[derive(Clone)]
pub(crate) struct ContextRef {
    id: u64,
    inner: Weak<ContextInner>,
}

impl ContextRef {
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Recover the context, if it is still alive.
    pub(crate) fn upgrade(&self) -> Result<Context> {
        self.inner
            .upgrade()
            .map(|inner| Context { inner })
            .ok_or(Error::ContextReleased)
    }
}

// ============================================================================
// Buffers and submission
// ============================================================================

impl ContextInner {
    /// Allocate storage of `size` bytes (rounded up to 4), zero-initialized.
    pub(crate) fn allocate(&self, label: &str, size: u64) -> Result<Storage> {
        let size = size.div_ceil(4) * 4;
        if size == 0 {
            return Err(Error::invalid_argument("size", "buffers cannot be empty"));
        }
        if size > self.max_buffer_size {
            return Err(Error::OutOfMemory { size });
        }
        if size > self.max_binding_size {
            return Err(Error::backend_limitation(
                "allocate",
                format!(
                    "{size} bytes exceeds the storage binding limit of {}",
                    self.max_binding_size
                ),
            ));
        }

        let storage = match self.coherency {
            CoherencyMode::Managed => {
                let buffer = self.device.create_buffer(&BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });
                let mirror = self.device.create_buffer(&BufferDescriptor {
                    label: Some(&format!("{label}_mirror")),
                    size,
                    usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                Storage::new(buffer, Some(mirror), size)
            }
            CoherencyMode::Shared => {
                let buffer = self.device.create_buffer(&BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: BufferUsages::STORAGE
                        | BufferUsages::MAP_READ
                        | BufferUsages::COPY_DST
                        | BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });
                Storage::new(buffer, None, size)
            }
        };
        Ok(storage)
    }

    /// Create a uniform buffer with the given data.
    pub(crate) fn create_params_buffer<T: bytemuck::Pod>(&self, data: &T) -> Buffer {
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("params"),
            size: std::mem::size_of::<T>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, bytemuck::bytes_of(data));
        buffer
    }

    pub(crate) fn create_encoder(&self, label: &str) -> CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submit commands and wait for completion.
    pub(crate) fn submit_and_wait(&self, encoder: CommandEncoder) -> Result<()> {
        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: self.poll_timeout,
            })
            .map_err(|e| Error::Backend(format!("GPU poll failed: {e}")))?;
        Ok(())
    }

    /// Write host data at `offset` and make it host-visible again.
    ///
    /// In managed mode exactly the written range is re-synchronized into
    /// the mirror.
    pub(crate) fn write_bytes(&self, storage: &Storage, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > storage.size() {
            return Err(Error::Internal(format!(
                "write of {}..{} past buffer of {} bytes",
                offset,
                end,
                storage.size()
            )));
        }

        self.queue.write_buffer(storage.buffer(), offset, data);

        let mut encoder = self.create_encoder("host_write");
        if self.coherency.needs_sync() {
            storage.encode_sync(&mut encoder, offset..end);
        }
        self.submit_and_wait(encoder)
    }

    /// Read `range` bytes back to the host (blocking).
    pub(crate) fn read_bytes(&self, storage: &Storage, range: Range<u64>) -> Result<Vec<u8>> {
        if range.end > storage.size() || range.start > range.end {
            return Err(Error::Internal(format!(
                "read of {:?} past buffer of {} bytes",
                range,
                storage.size()
            )));
        }
        if range.is_empty() {
            return Ok(Vec::new());
        }

        // Mapped ranges start on MAP_ALIGNMENT and span whole words
        let start = range.start - range.start % wgpu::MAP_ALIGNMENT;
        let end = range
            .end
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
            .min(storage.size());

        let host = storage.host();
        let slice = host.slice(start..end);

        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: self.poll_timeout,
            })
            .map_err(|e| Error::Backend(format!("GPU poll failed during buffer read: {e}")))?;

        let map_result = receiver.recv().map_err(|_| {
            Error::Backend("map_async callback was not invoked during buffer read".into())
        })?;
        map_result
            .map_err(|e| Error::Backend(format!("map_async failed during buffer read: {e}")))?;

        let bytes = {
            let data = slice.get_mapped_range();
            let skip = (range.start - start) as usize;
            data[skip..skip + (range.end - range.start) as usize].to_vec()
        };

        host.unmap();
        Ok(bytes)
    }

    /// Read `count` floats starting at float index `first`.
    pub(crate) fn read_f32(&self, storage: &Storage, first: usize, count: usize) -> Result<Vec<f32>> {
        let start = (first * 4) as u64;
        let bytes = self.read_bytes(storage, start..start + (count * 4) as u64)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Upload floats at float index `first`.
    pub(crate) fn write_f32(&self, storage: &Storage, first: usize, data: &[f32]) -> Result<()> {
        self.write_bytes(storage, (first * 4) as u64, bytemuck::cast_slice(data))
    }
}
