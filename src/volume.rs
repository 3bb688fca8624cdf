//! The in-memory brain volume type consumed and produced by all processing
//! functions in this crate.

use ndarray::Array3;

use crate::affine::Affine4;

/// A 3D scalar grid in a physical coordinate frame.
///
/// The affine maps grid indices to world (RAS) coordinates; spacing is the
/// voxel edge length in mm, carried along from the source file header. The
/// grid shape is fixed for the lifetime of the object, and derived volumes
/// (masks, label maps) share the affine and spacing of the volume they were
/// computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
    pub affine: Affine4,
    pub spacing: [f32; 3],
}

impl Volume {
    pub fn new(data: Array3<f32>, affine: Affine4, spacing: [f32; 3]) -> Volume {
        Volume {
            data,
            affine,
            spacing,
        }
    }

    /// Grid shape as (i, j, k) lengths.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Wrap a freshly computed grid in this volume's physical space.
    ///
    /// The grid must have this volume's shape; this is how every derived map
    /// inherits the affine and spacing of its source.
    pub fn same_space(&self, data: Array3<f32>) -> Volume {
        assert_eq!(
            data.dim(),
            self.data.dim(),
            "derived grid must match the source volume shape"
        );
        Volume {
            data,
            affine: self.affine.clone(),
            spacing: self.spacing,
        }
    }

    /// An all-zero volume on the same grid and in the same space as `self`.
    pub fn zeros_like(&self) -> Volume {
        self.same_space(Array3::zeros(self.data.dim()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_volumes_share_space() {
        let vol = Volume::new(
            Array3::from_elem((3, 4, 5), 2.0),
            Affine4::scaling(1.0, 2.0, 3.0),
            [1.0, 2.0, 3.0],
        );
        let derived = vol.zeros_like();

        assert_eq!(derived.shape(), vol.shape());
        assert_eq!(derived.affine, vol.affine);
        assert_eq!(derived.spacing, vol.spacing);
        assert!(derived.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic]
    fn shape_changes_are_rejected() {
        let vol = Volume::new(
            Array3::zeros((2, 2, 2)),
            Affine4::identity(),
            [1.0, 1.0, 1.0],
        );
        vol.same_space(Array3::zeros((3, 3, 3)));
    }
}
