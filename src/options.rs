//! Context configuration.

use std::time::Duration;

use crate::device::CoherencyMode;

/// Options controlling how a [`Context`](crate::Context) picks and drives its device.
///
/// # Example
///
/// ```ignore
/// let options = ContextOptions::default()
///     .with_coherency(CoherencyMode::Managed)
///     .with_poll_timeout(Duration::from_secs(30));
/// let ctx = Context::with_options(options)?;
/// ```
#[derive(Clone, Debug)]
pub struct ContextOptions {
    /// Use the adapter at this enumeration index instead of auto-selection
    pub adapter_index: Option<usize>,
    /// Prefer the first discrete GPU when several adapters exist
    pub prefer_discrete: bool,
    /// Power preference used when falling back to the system default adapter
    pub power_preference: wgpu::PowerPreference,
    /// Force a coherency mode; `None` detects it from the adapter
    pub coherency: Option<CoherencyMode>,
    /// Upper bound on every blocking wait; `None` waits indefinitely
    pub poll_timeout: Option<Duration>,
    /// Label attached to the device and its resources
    pub label: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            adapter_index: None,
            prefer_discrete: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            coherency: None,
            poll_timeout: None,
            label: "bronze".to_string(),
        }
    }
}

impl ContextOptions {
    /// Select a specific adapter by enumeration index.
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = Some(index);
        self
    }

    /// Toggle the discrete-GPU preference.
    pub fn with_prefer_discrete(mut self, prefer: bool) -> Self {
        self.prefer_discrete = prefer;
        self
    }

    /// Set the fallback power preference.
    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Force a coherency mode instead of detecting one.
    pub fn with_coherency(mut self, mode: CoherencyMode) -> Self {
        self.coherency = Some(mode);
        self
    }

    /// Bound every blocking wait.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Set the device label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ContextOptions::default();
        assert!(options.adapter_index.is_none());
        assert!(options.prefer_discrete);
        assert_eq!(
            options.power_preference,
            wgpu::PowerPreference::HighPerformance
        );
        assert!(options.coherency.is_none());
        assert!(options.poll_timeout.is_none());
        assert_eq!(options.label, "bronze");
    }

    #[test]
    fn test_builders() {
        let options = ContextOptions::default()
            .with_adapter_index(1)
            .with_prefer_discrete(false)
            .with_coherency(CoherencyMode::Managed)
            .with_poll_timeout(Duration::from_secs(5))
            .with_label("bench");
        assert_eq!(options.adapter_index, Some(1));
        assert!(!options.prefer_discrete);
        assert_eq!(options.coherency, Some(CoherencyMode::Managed));
        assert_eq!(options.poll_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.label, "bench");
    }
}
