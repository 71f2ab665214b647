//! Kernel launch protocol and parameter blocks.

use std::sync::Arc;
use wgpu::Buffer;

use crate::context::ContextInner;
use crate::error::Result;
use crate::shaders::{Grid, Kernel};
use crate::storage::Storage;

// ============================================================================
// Params Structs (must match WGSL shader structs)
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct ElementwiseParams {
    pub(super) numel: u32,
    pub(super) _pad: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct ScalarParams {
    pub(super) numel: u32,
    pub(super) scalar: f32,
    pub(super) _pad: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct MatmulParams {
    pub(super) a_width: u32,
    pub(super) b_width: u32,
    pub(super) out_height: u32,
    pub(super) _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct BatchParams {
    pub(super) a_width: u32,
    pub(super) a_height: u32,
    pub(super) b_width: u32,
    pub(super) b_height: u32,
    pub(super) out_width: u32,
    pub(super) out_height: u32,
    pub(super) count: u32,
    pub(super) _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct TextParams {
    pub(super) width: u32,
    pub(super) numel: u32,
    pub(super) _pad: [u32; 2],
}

// ============================================================================
// Launch
// ============================================================================

/// One kernel dispatch.
pub(super) struct Launch<'a> {
    pub(super) kernel: Kernel,
    pub(super) grid: Grid,
    /// Read-only inputs, in binding order
    pub(super) inputs: Vec<&'a Buffer>,
    /// Storage bound as the kernel's output
    pub(super) output: &'a Storage,
    /// Uniform parameter block
    pub(super) params: Buffer,
    /// Seed baked into seeded kernels
    pub(super) seed: Option<i32>,
    /// Copy the output here before synchronizing
    pub(super) write_back: Option<&'a Storage>,
}

impl ContextInner {
    /// Record, submit and wait for one dispatch.
    ///
    /// The storage that ends up holding the result (`write_back` if given,
    /// otherwise `output`) is synchronized when the context runs managed.
    pub(super) fn launch(&self, launch: Launch<'_>) -> Result<()> {
        let Launch {
            kernel,
            grid,
            inputs,
            output,
            params,
            seed,
            write_back,
        } = launch;

        let pipeline = match seed {
            Some(seed) => Arc::new(
                self.pipelines
                    .create_seeded_pipeline(kernel, grid.workgroup, seed),
            ),
            None => self.pipelines.get_or_create_pipeline(kernel, grid.workgroup),
        };
        let layout = self.pipelines.get_or_create_layout(kernel.layout());

        let mut buffers = inputs;
        buffers.push(output.buffer());
        buffers.push(&params);
        let bind_group = self.pipelines.create_bind_group(&layout, &buffers);

        tracing::trace!(
            kernel = kernel.entry_point(),
            threads = ?grid.threads,
            workgroup = ?grid.workgroup,
            groups = ?grid.groups,
            "dispatch"
        );

        let mut encoder = self.create_encoder(kernel.entry_point());
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, Some(&bind_group), &[]);
            pass.dispatch_workgroups(grid.groups[0], grid.groups[1], 1);
        }

        let result = match write_back {
            Some(target) => {
                encoder.copy_buffer_to_buffer(
                    output.buffer(),
                    0,
                    target.buffer(),
                    0,
                    output.size().min(target.size()),
                );
                target
            }
            None => output,
        };
        if self.coherency.needs_sync() {
            result.encode_sync_all(&mut encoder);
        }

        self.submit_and_wait(encoder)
    }
}

/// Convert a validated dimension to its shader representation.
///
/// Dimensions are bounded by `checked_len` at construction, so they fit.
#[inline]
pub(super) fn dim(n: usize) -> u32 {
    n as u32
}
