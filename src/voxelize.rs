//! Projecting surface meshes into the voxel grid of a reference volume.
//!
//! Each vertex is mapped through the inverse of the reference affine and
//! floored to its containing voxel. There is no interpolation and no
//! partial-volume weighting; a voxel is either touched by a vertex or it
//! is not.

use crate::error::{Result, RibbonQcError};
use crate::surface::SurfaceMesh;
use crate::volume::Volume;

/// What to do with a vertex whose voxel index falls outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Drop the vertex. The mask stays untouched for it.
    Skip,
    /// Move each offending axis to the nearest valid boundary index.
    Clamp,
}

/// Parameters controlling surface voxelization.
#[derive(Debug, Clone)]
pub struct VoxelizeOptions {
    /// Value written into the mask for occupied voxels.
    pub scale: f32,
    /// Out-of-bounds vertex handling.
    pub bounds: BoundsPolicy,
}

impl Default for VoxelizeOptions {
    fn default() -> Self {
        VoxelizeOptions {
            scale: 1.0,
            bounds: BoundsPolicy::Skip,
        }
    }
}

/// A surface occupancy mask on the grid of its reference volume.
#[derive(Debug, Clone)]
pub struct OccupancyMask {
    /// The mask grid, sharing the reference volume's affine and spacing.
    pub volume: Volume,
    /// Number of vertices that fell outside the grid (dropped or clamped,
    /// depending on the bounds policy).
    pub out_of_bounds: usize,
}

/// Project the vertices of `meshes` into the voxel grid of `reference`.
///
/// Vertices from all meshes are treated as one set; order is irrelevant and
/// several vertices landing in the same voxel write the same value. Fails
/// with [`RibbonQcError::SingularAffine`] if the reference affine cannot be
/// inverted and with [`RibbonQcError::NonFiniteVertex`] on NaN or infinite
/// coordinates.
pub fn voxelize(
    reference: &Volume,
    meshes: &[SurfaceMesh],
    options: &VoxelizeOptions,
) -> Result<OccupancyMask> {
    let world_to_grid = reference.affine.inverse()?;
    let shape = reference.shape();
    let lens = [shape.0 as i64, shape.1 as i64, shape.2 as i64];

    let mut mask = reference.zeros_like();
    let mut out_of_bounds = 0usize;
    let mut num_vertices = 0usize;

    for mesh in meshes {
        if !mesh.is_finite() {
            return Err(RibbonQcError::NonFiniteVertex);
        }
        num_vertices += mesh.num_vertices();

        for v in mesh.vertex_iter() {
            let grid = world_to_grid.apply([v[0] as f64, v[1] as f64, v[2] as f64]);
            let mut idx = [
                grid[0].floor() as i64,
                grid[1].floor() as i64,
                grid[2].floor() as i64,
            ];

            let inside = (0..3).all(|a| idx[a] >= 0 && idx[a] < lens[a]);
            if !inside {
                out_of_bounds += 1;
                match options.bounds {
                    BoundsPolicy::Skip => continue,
                    BoundsPolicy::Clamp => {
                        for a in 0..3 {
                            idx[a] = idx[a].max(0).min(lens[a] - 1);
                        }
                    }
                }
            }

            mask.data[[idx[0] as usize, idx[1] as usize, idx[2] as usize]] = options.scale;
        }
    }

    if num_vertices == 0 {
        log::warn!("voxelize called with no vertices; occupancy mask is empty");
    } else if out_of_bounds > 0 {
        log::warn!(
            "{} of {} surface vertices fell outside the reference grid",
            out_of_bounds,
            num_vertices
        );
    }

    Ok(OccupancyMask {
        volume: mask,
        out_of_bounds,
    })
}
