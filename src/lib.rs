//! Visual quality-control diagnostics for structural neuroimaging pipelines.
//!
//! The focus of this crate is on the geometric and volumetric processing
//! behind registration and segmentation QC overlays: projecting
//! reconstructed cortical surfaces into the voxel grid of a reference
//! volume, and classifying cortical ribbon boundaries from a segmentation
//! volume. Rendering backends and report aggregation stay external; they
//! plug in through the traits in [`render`] and the manifest in
//! [`manifest`].

pub mod affine;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod mgh;
pub mod render;
pub mod ribbon;
pub mod surface;
pub mod util;
pub mod volume;
pub mod voxelize;

pub use affine::Affine4;
pub use error::{Result, RibbonQcError};
pub use manifest::{artifact_filename, ArtifactEntry, ArtifactKind, ArtifactManifest};
pub use mgh::{read_mgh, write_mgh};
pub use render::{
    cuts_from_bbox, AxisCuts, IdGenerator, PanelArtifact, RegistrationPanelRenderer,
    SequentialIds, SliceAxis, SlicePlotter, DEFAULT_AXIS_ORDER,
};
pub use ribbon::{
    classify_ribbon, RibbonOptions, TissueCodeTable, PIAL_EDGE_LABEL, WHITE_EDGE_LABEL,
};
pub use surface::{read_surface, SurfaceMesh};
pub use volume::Volume;
pub use voxelize::{voxelize, BoundsPolicy, OccupancyMask, VoxelizeOptions};
