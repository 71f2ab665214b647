//! WGSL compute pipeline infrastructure
//!
//! Provides the kernel table, bind group layouts and the pipeline cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, ComputePipeline,
    ComputePipelineDescriptor, Device, PipelineCompilationOptions, PipelineLayoutDescriptor,
    ShaderModule, ShaderModuleDescriptor, ShaderSource, ShaderStages,
};

use super::kernels_wgsl::{
    FILL_RANDOM_SHADER, GENERATE_STRING_SHADER, MAT_ADD_SHADER, MAT_MULT_BATCH_SHADER,
    MAT_MULT_SHADER, MAT_SCALAR_SHADER,
};

// ============================================================================
// Kernel Table
// ============================================================================

/// Named kernel entry points of the library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// `out = a + b`
    MatAddSimple,
    /// `out = a * s`
    MatMultScalar,
    /// `out = a * b`, 2-D grid
    MatMultSimple,
    /// `out[i] = a[i] * b`
    MatMultMultiRight,
    /// `out[i] = b * a[i]`
    MatMultMultiLeft,
    /// Seeded uniform fill
    FillRandom,
    /// Text rendering
    GenerateString,
}

impl Kernel {
    /// All kernels in the library
    pub const ALL: [Kernel; 7] = [
        Kernel::MatAddSimple,
        Kernel::MatMultScalar,
        Kernel::MatMultSimple,
        Kernel::MatMultMultiRight,
        Kernel::MatMultMultiLeft,
        Kernel::FillRandom,
        Kernel::GenerateString,
    ];

    /// WGSL entry point name
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::MatAddSimple => "matAddSimple",
            Kernel::MatMultScalar => "matMultScalar",
            Kernel::MatMultSimple => "matMultSimple",
            Kernel::MatMultMultiRight => "matMultMultiRight",
            Kernel::MatMultMultiLeft => "matMultMultiLeft",
            Kernel::FillRandom => "fillRandom",
            Kernel::GenerateString => "generateString",
        }
    }

    /// Name of the shader module containing the entry point
    pub fn module_name(self) -> &'static str {
        match self {
            Kernel::MatAddSimple => "mat_add",
            Kernel::MatMultScalar => "mat_scalar",
            Kernel::MatMultSimple => "mat_mult",
            Kernel::MatMultMultiRight | Kernel::MatMultMultiLeft => "mat_mult_batch",
            Kernel::FillRandom => "fill_random",
            Kernel::GenerateString => "generate_string",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Kernel::MatAddSimple => MAT_ADD_SHADER,
            Kernel::MatMultScalar => MAT_SCALAR_SHADER,
            Kernel::MatMultSimple => MAT_MULT_SHADER,
            Kernel::MatMultMultiRight | Kernel::MatMultMultiLeft => MAT_MULT_BATCH_SHADER,
            Kernel::FillRandom => FILL_RANDOM_SHADER,
            Kernel::GenerateString => GENERATE_STRING_SHADER,
        }
    }

    /// Binding layout the entry point expects
    pub fn layout(self) -> LayoutKey {
        let num_readonly_storage = match self {
            Kernel::FillRandom => 0,
            Kernel::MatMultScalar | Kernel::GenerateString => 1,
            Kernel::MatAddSimple
            | Kernel::MatMultSimple
            | Kernel::MatMultMultiRight
            | Kernel::MatMultMultiLeft => 2,
        };
        LayoutKey {
            num_readonly_storage,
            num_storage_buffers: 1,
            num_uniform_buffers: 1,
        }
    }

    /// Whether the kernel takes its seed as a pipeline constant
    pub fn is_seeded(self) -> bool {
        matches!(self, Kernel::FillRandom)
    }
}

/// Key for bind group layout cache
///
/// Bindings are numbered read-only storage first, then read-write storage,
/// then uniforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Number of read-only storage buffers
    pub num_readonly_storage: u32,
    /// Number of read-write storage buffers
    pub num_storage_buffers: u32,
    /// Number of uniform buffers
    pub num_uniform_buffers: u32,
}

impl LayoutKey {
    /// Total number of bindings
    pub fn len(&self) -> usize {
        (self.num_readonly_storage + self.num_storage_buffers + self.num_uniform_buffers) as usize
    }
}

// ============================================================================
// Pipeline Cache
// ============================================================================

/// Cache for compute pipelines keyed by (kernel, workgroup shape)
///
/// Shader modules are cached per workgroup shape as well. Some backends
/// specialize override constants into the module when the first pipeline
/// is built from it, so one module never serves two shapes.
pub struct PipelineCache {
    device: Arc<Device>,
    /// Cached shader modules by (name, workgroup shape)
    modules: Mutex<HashMap<(&'static str, [u32; 2]), Arc<ShaderModule>>>,
    /// Cached pipelines by (kernel, workgroup shape)
    pipelines: Mutex<HashMap<(Kernel, [u32; 2]), Arc<ComputePipeline>>>,
    /// Cached bind group layouts by layout key
    layouts: Mutex<HashMap<LayoutKey, Arc<BindGroupLayout>>>,
}

impl PipelineCache {
    /// Create a new pipeline cache
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            modules: Mutex::new(HashMap::new()),
            pipelines: Mutex::new(HashMap::new()),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the shader module holding a kernel, for one workgroup shape
    pub fn get_or_create_module(&self, kernel: Kernel, workgroup: [u32; 2]) -> Arc<ShaderModule> {
        let key = (kernel.module_name(), workgroup);
        let mut modules = self.modules.lock();
        if let Some(module) = modules.get(&key) {
            return module.clone();
        }

        let module = Arc::new(self.create_module(kernel));
        modules.insert(key, module.clone());
        module
    }

    fn create_module(&self, kernel: Kernel) -> ShaderModule {
        self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(kernel.module_name()),
            source: ShaderSource::Wgsl(kernel.source().into()),
        })
    }

    /// Get or create the pipeline for a kernel and workgroup shape.
    ///
    /// Seeded kernels are compiled with seed 0 here; use
    /// [`PipelineCache::create_seeded_pipeline`] to bake in a real seed.
    pub fn get_or_create_pipeline(&self, kernel: Kernel, workgroup: [u32; 2]) -> Arc<ComputePipeline> {
        let key = (kernel, workgroup);
        if let Some(pipeline) = self.pipelines.lock().get(&key) {
            return pipeline.clone();
        }

        let module = self.get_or_create_module(kernel, workgroup);
        let constants = workgroup_constants(workgroup);
        let pipeline = Arc::new(self.compile(kernel, &module, &constants));
        self.pipelines.lock().insert(key, pipeline.clone());
        pipeline
    }

    /// Compile a fresh pipeline with `seed` baked in as an override constant.
    ///
    /// The seed cannot be supplied at dispatch time, so these pipelines are
    /// never cached, and each gets its own module.
    pub fn create_seeded_pipeline(
        &self,
        kernel: Kernel,
        workgroup: [u32; 2],
        seed: i32,
    ) -> ComputePipeline {
        let module = self.create_module(kernel);
        let [x, y] = workgroup_constants(workgroup);
        self.compile(kernel, &module, &[x, y, ("seed", f64::from(seed))])
    }

    fn compile(
        &self,
        kernel: Kernel,
        module: &ShaderModule,
        constants: &[(&str, f64)],
    ) -> ComputePipeline {
        tracing::debug!(
            kernel = kernel.entry_point(),
            ?constants,
            "compiling compute pipeline"
        );

        let layout = self.get_or_create_layout(kernel.layout());
        let label = format!("{}_{}", kernel.module_name(), kernel.entry_point());

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{}_layout", label)),
                bind_group_layouts: &[&layout],
                immediate_size: 0, // Not using push constants
            });

        self.device
            .create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(&label),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(kernel.entry_point()),
                compilation_options: PipelineCompilationOptions {
                    constants,
                    ..Default::default()
                },
                cache: None,
            })
    }

    /// Get or create a bind group layout
    pub fn get_or_create_layout(&self, key: LayoutKey) -> Arc<BindGroupLayout> {
        let mut layouts = self.layouts.lock();

        if let Some(layout) = layouts.get(&key) {
            return layout.clone();
        }

        let storage = |binding: u32, read_only: bool| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let mut entries = Vec::with_capacity(key.len());
        let mut binding = 0;

        for _ in 0..key.num_readonly_storage {
            entries.push(storage(binding, true));
            binding += 1;
        }
        for _ in 0..key.num_storage_buffers {
            entries.push(storage(binding, false));
            binding += 1;
        }
        for _ in 0..key.num_uniform_buffers {
            entries.push(BindGroupLayoutEntry {
                binding,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
            binding += 1;
        }

        let layout = self
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("bronze_layout"),
                entries: &entries,
            });

        let layout = Arc::new(layout);
        layouts.insert(key, layout.clone());
        layout
    }

    /// Create a bind group from buffers, in binding order
    pub fn create_bind_group(&self, layout: &BindGroupLayout, buffers: &[&Buffer]) -> BindGroup {
        let entries: Vec<BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("compute_bind_group"),
            layout,
            entries: &entries,
        })
    }

    /// Number of pipelines currently cached
    pub fn cached_pipelines(&self) -> usize {
        self.pipelines.lock().len()
    }
}

fn workgroup_constants(workgroup: [u32; 2]) -> [(&'static str, f64); 2] {
    [
        ("WG_X", f64::from(workgroup[0])),
        ("WG_Y", f64::from(workgroup[1])),
    ]
}
