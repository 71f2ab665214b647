//! Dispatch geometry.
//!
//! Converts a logical thread grid into a workgroup shape and a workgroup
//! count that respect the device limits. Every kernel's workgroup shape is
//! supplied through its `WG_X` / `WG_Y` override constants.

use crate::error::{Error, Result};

/// Hardware limits relevant to dispatch sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadLimits {
    /// Maximum threads per workgroup along x
    pub width: u32,
    /// Maximum threads per workgroup along y
    pub height: u32,
    /// Maximum threads per workgroup along z
    pub depth: u32,
    /// Maximum workgroups per dispatch dimension
    pub max_groups: u32,
}

impl ThreadLimits {
    /// Derive the limits from device limits.
    ///
    /// Each per-dimension maximum is clamped to the total invocation limit so
    /// that a workgroup using one dimension fully is always valid.
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        let invocations = limits.max_compute_invocations_per_workgroup;
        Self {
            width: limits.max_compute_workgroup_size_x.min(invocations),
            height: limits.max_compute_workgroup_size_y.min(invocations),
            depth: limits.max_compute_workgroup_size_z.min(invocations),
            max_groups: limits.max_compute_workgroups_per_dimension,
        }
    }
}

/// A sized dispatch: logical grid, workgroup shape and workgroup counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    /// Logical threads along x and y
    pub threads: [u32; 2],
    /// Threads per workgroup along x and y
    pub workgroup: [u32; 2],
    /// Workgroups dispatched along x and y
    pub groups: [u32; 2],
}

impl Grid {
    /// One thread per element of a flat output.
    ///
    /// Workgroup width is `min(total, limits.width)`. When the workgroup
    /// count exceeds the per-dimension limit it is folded into a second
    /// dimension; kernels recover `idx = gid.y * groups.x * WG_X + gid.x`.
    pub fn linear(total: usize, limits: &ThreadLimits) -> Result<Self> {
        let total = u32::try_from(total)
            .ok()
            .filter(|&t| t > 0)
            .ok_or_else(|| {
                Error::backend_limitation("dispatch", format!("{total} threads in a 1-D grid"))
            })?;

        let width = total.min(limits.width);
        let needed = total.div_ceil(width);
        let groups = if needed <= limits.max_groups {
            [needed, 1]
        } else {
            let rows = needed.div_ceil(limits.max_groups);
            if rows > limits.max_groups {
                return Err(Error::backend_limitation(
                    "dispatch",
                    format!("{needed} workgroups exceed {}^2", limits.max_groups),
                ));
            }
            [limits.max_groups, rows]
        };

        Ok(Self {
            threads: [total, 1],
            workgroup: [width, 1],
            groups,
        })
    }

    /// One thread per element of a `width x height` output.
    ///
    /// Workgroup width is `min(width, limits.width)` and workgroup height is
    /// `max(limits.height / workgroup width, 1)`.
    pub fn planar(width: usize, height: usize, limits: &ThreadLimits) -> Result<Self> {
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(Error::backend_limitation(
                "dispatch",
                format!("{width}x{height} threads in a 2-D grid"),
            ));
        };
        if width == 0 || height == 0 {
            return Err(Error::backend_limitation(
                "dispatch",
                "empty 2-D grid".to_string(),
            ));
        }

        let group_width = width.min(limits.width);
        let group_height = (limits.height / group_width).max(1);
        let groups = [width.div_ceil(group_width), height.div_ceil(group_height)];
        if groups[0] > limits.max_groups || groups[1] > limits.max_groups {
            return Err(Error::backend_limitation(
                "dispatch",
                format!("{groups:?} workgroups exceed {}", limits.max_groups),
            ));
        }

        Ok(Self {
            threads: [width, height],
            workgroup: [group_width, group_height],
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ThreadLimits {
        ThreadLimits {
            width: 256,
            height: 256,
            depth: 64,
            max_groups: 65535,
        }
    }

    #[test]
    fn test_from_limits_clamps_to_invocations() {
        let device_limits = wgpu::Limits {
            max_compute_workgroup_size_x: 1024,
            max_compute_workgroup_size_y: 1024,
            max_compute_workgroup_size_z: 64,
            max_compute_invocations_per_workgroup: 512,
            ..wgpu::Limits::default()
        };
        let limits = ThreadLimits::from_limits(&device_limits);
        assert_eq!(limits.width, 512);
        assert_eq!(limits.height, 512);
        assert_eq!(limits.depth, 64);
    }

    #[test]
    fn test_linear_small_grid_uses_exact_width() {
        let grid = Grid::linear(16, &limits()).unwrap();
        assert_eq!(grid.workgroup, [16, 1]);
        assert_eq!(grid.groups, [1, 1]);
        assert_eq!(grid.threads, [16, 1]);
    }

    #[test]
    fn test_linear_large_grid_rounds_up() {
        let grid = Grid::linear(1000, &limits()).unwrap();
        assert_eq!(grid.workgroup, [256, 1]);
        assert_eq!(grid.groups, [4, 1]);
    }

    #[test]
    fn test_linear_folds_into_second_dimension() {
        // 10M 4x4 matrices
        let grid = Grid::linear(160_000_000, &limits()).unwrap();
        let [x, y] = grid.groups;
        assert_eq!(x, 65535);
        assert!(u64::from(x) * u64::from(y) * 256 >= 160_000_000);
        assert!(u64::from(x) * u64::from(y - 1) * 256 < 160_000_000);
    }

    #[test]
    fn test_linear_rejects_empty() {
        assert!(Grid::linear(0, &limits()).is_err());
    }

    #[test]
    fn test_planar_threadgroup_shape() {
        let grid = Grid::planar(4, 4, &limits()).unwrap();
        assert_eq!(grid.workgroup, [4, 64]);
        assert_eq!(grid.groups, [1, 1]);

        let grid = Grid::planar(300, 10, &limits()).unwrap();
        assert_eq!(grid.workgroup, [256, 1]);
        assert_eq!(grid.groups, [2, 10]);
        assert_eq!(grid.threads, [300, 10]);
    }

    #[test]
    fn test_planar_workgroup_within_invocations() {
        for width in [1usize, 3, 7, 16, 100, 255, 256, 1000] {
            let grid = Grid::planar(width, 5, &limits()).unwrap();
            assert!(grid.workgroup[0] * grid.workgroup[1] <= 256, "width {width}");
        }
    }
}
