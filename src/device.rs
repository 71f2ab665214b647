//! Adapter discovery and device properties.
//!
//! Picks the compute adapter a [`Context`](crate::Context) runs on and
//! decides how host and device memory are kept coherent on it.

use std::fmt;
use wgpu::{Adapter, Backend, DeviceType, Features};

use crate::error::{Error, Result};
use crate::options::ContextOptions;

/// How device writes become visible to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoherencyMode {
    /// Separate memory domains. Every storage buffer has a host-visible
    /// mirror that must be synchronized after the GPU writes to it.
    Managed,
    /// Unified memory. Storage buffers are mapped by the host directly and
    /// no synchronize step is needed.
    Shared,
}

impl CoherencyMode {
    /// Whether device writes need an explicit synchronize pass.
    #[inline]
    pub fn needs_sync(self) -> bool {
        matches!(self, CoherencyMode::Managed)
    }

    /// Pick the mode appropriate for an adapter.
    ///
    /// Unified-memory adapters that can map storage buffers run shared;
    /// everything else runs managed.
    pub fn detect(device_type: DeviceType, features: Features) -> Self {
        let unified = matches!(device_type, DeviceType::IntegratedGpu | DeviceType::Cpu);
        if unified && features.contains(Features::MAPPABLE_PRIMARY_BUFFERS) {
            CoherencyMode::Shared
        } else {
            CoherencyMode::Managed
        }
    }
}

/// Description of the adapter a context was built on.
#[derive(Clone)]
pub struct AdapterDescription {
    /// Adapter name (e.g., "Apple M2")
    pub name: String,
    /// Backend type (Metal, Vulkan, DX12, etc.)
    pub backend: Backend,
    /// Discrete, integrated, CPU...
    pub device_type: DeviceType,
}

impl fmt::Debug for AdapterDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterDescription")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("device_type", &self.device_type)
            .finish()
    }
}

impl AdapterDescription {
    pub(crate) fn of(adapter: &Adapter) -> Self {
        let info = adapter.get_info();
        Self {
            name: info.name,
            backend: info.backend,
            device_type: info.device_type,
        }
    }
}

// ============================================================================
// Adapter Discovery
// ============================================================================

/// Select an adapter according to the options.
///
/// An explicit index wins. Otherwise the first discrete GPU is preferred,
/// falling back to the system default for the configured power preference.
pub(crate) async fn select_adapter(options: &ContextOptions) -> Result<Adapter> {
    let instance = wgpu::Instance::default();
    let mut adapters: Vec<_> = instance.enumerate_adapters(wgpu::Backends::all()).await;

    if let Some(index) = options.adapter_index {
        if index >= adapters.len() {
            return Err(Error::invalid_argument(
                "adapter_index",
                format!("{} adapters available, requested {}", adapters.len(), index),
            ));
        }
        return Ok(adapters.swap_remove(index));
    }

    if options.prefer_discrete {
        if let Some(position) = adapters
            .iter()
            .position(|a| a.get_info().device_type == DeviceType::DiscreteGpu)
        {
            return Ok(adapters.swap_remove(position));
        }
    }

    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| Error::NoAdapter)
}

/// Resolve the coherency mode for an adapter, honoring a forced choice.
pub(crate) fn resolve_coherency(
    adapter: &Adapter,
    forced: Option<CoherencyMode>,
) -> Result<CoherencyMode> {
    let features = adapter.features();
    match forced {
        Some(CoherencyMode::Shared) if !features.contains(Features::MAPPABLE_PRIMARY_BUFFERS) => {
            Err(Error::DeviceInit(
                "shared coherency requires mappable storage buffers".to_string(),
            ))
        }
        Some(mode) => Ok(mode),
        None => Ok(CoherencyMode::detect(
            adapter.get_info().device_type,
            features,
        )),
    }
}

/// Check if a compute adapter is available on this system
pub fn is_available() -> bool {
    pollster::block_on(select_adapter(&ContextOptions::default())).is_ok()
}
