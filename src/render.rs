//! Registration QC panels: anatomical slices with contour edge overlays.
//!
//! The actual slice plotting and panel composition are external services
//! behind the [`SlicePlotter`] trait; this module owns the policy around
//! them: contour binarization, per-axis iteration, title placement, cut
//! planning, and deterministic element-id rewriting.

use std::path::Path;

use crate::error::{Result, RibbonQcError};
use crate::volume::Volume;

/// A slicing direction through the volume grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAxis {
    X,
    Y,
    Z,
}

impl SliceAxis {
    /// Grid axis index.
    pub fn index(self) -> usize {
        match self {
            SliceAxis::X => 0,
            SliceAxis::Y => 1,
            SliceAxis::Z => 2,
        }
    }

    /// Lowercase letter used in element ids and display modes.
    pub fn letter(self) -> &'static str {
        match self {
            SliceAxis::X => "x",
            SliceAxis::Y => "y",
            SliceAxis::Z => "z",
        }
    }
}

/// The default panel order: sagittal, coronal, axial.
pub const DEFAULT_AXIS_ORDER: [SliceAxis; 3] = [SliceAxis::X, SliceAxis::Y, SliceAxis::Z];

/// Cut coordinates per axis, in world space (mm).
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCuts {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl AxisCuts {
    pub fn for_axis(&self, axis: SliceAxis) -> &[f64] {
        match axis {
            SliceAxis::X => &self.x,
            SliceAxis::Y => &self.y,
            SliceAxis::Z => &self.z,
        }
    }
}

/// Plan `cuts` world-space cut coordinates per axis, evenly spaced strictly
/// inside the bounding box of the contour's nonzero voxels.
///
/// An empty contour falls back to a single cut through the grid center.
pub fn cuts_from_bbox(contour: &Volume, cuts: usize) -> AxisCuts {
    let mut lo = [usize::max_value(); 3];
    let mut hi = [0usize; 3];
    let mut any = false;
    for ((i, j, k), &v) in contour.data.indexed_iter() {
        if v > 0.0 {
            let idx = [i, j, k];
            for a in 0..3 {
                lo[a] = lo[a].min(idx[a]);
                hi[a] = hi[a].max(idx[a]);
            }
            any = true;
        }
    }

    if !any {
        log::warn!("contour volume is empty, cutting through the grid center");
        let shape = contour.shape();
        let center = contour.affine.apply([
            shape.0 as f64 / 2.0,
            shape.1 as f64 / 2.0,
            shape.2 as f64 / 2.0,
        ]);
        return AxisCuts {
            x: vec![center[0]],
            y: vec![center[1]],
            z: vec![center[2]],
        };
    }

    let mid = [
        (lo[0] + hi[0]) as f64 / 2.0,
        (lo[1] + hi[1]) as f64 / 2.0,
        (lo[2] + hi[2]) as f64 / 2.0,
    ];

    let mut out = AxisCuts {
        x: Vec::with_capacity(cuts),
        y: Vec::with_capacity(cuts),
        z: Vec::with_capacity(cuts),
    };
    for a in 0..3 {
        let coords = match a {
            0 => &mut out.x,
            1 => &mut out.y,
            _ => &mut out.z,
        };
        for c in 1..=cuts {
            let frac = c as f64 / (cuts + 1) as f64;
            let mut p = mid;
            p[a] = lo[a] as f64 + frac * (hi[a] as f64 - lo[a] as f64);
            coords.push(contour.affine.apply(p)[a]);
        }
    }
    out
}

/// An external slice-plotting service.
///
/// `plot_slice` renders one anatomical panel with the contour overlaid as an
/// edge outline and returns it as SVG text; `compose` stitches finished
/// panels into a single artifact on disk.
pub trait SlicePlotter {
    fn plot_slice(
        &self,
        anatomical: &Volume,
        contour: &Volume,
        axis: SliceAxis,
        cut_coords: &[f64],
        title: Option<&str>,
    ) -> Result<String>;

    fn compose(&self, panels: &[PanelArtifact], out_file: &Path) -> Result<()>;
}

/// Supplies unique element ids for merged vector graphics.
///
/// Injected rather than drawn from ambient randomness, so renders are
/// reproducible and testable.
pub trait IdGenerator {
    fn next_id(&mut self, hint: &str) -> String;
}

/// Counter-based [`IdGenerator`]; ids are stable across runs.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, hint: &str) -> String {
        let id = format!("{}-{}", hint, self.counter);
        self.counter += 1;
        id
    }
}

/// One rendered registration panel.
#[derive(Debug, Clone)]
pub struct PanelArtifact {
    pub axis: SliceAxis,
    pub element_id: String,
    pub svg: String,
}

/// Renders per-axis registration panels through an injected backend.
pub struct RegistrationPanelRenderer<B, G> {
    backend: B,
    ids: G,
}

impl<B, G> RegistrationPanelRenderer<B, G>
where
    B: SlicePlotter,
    G: IdGenerator,
{
    pub fn new(backend: B, ids: G) -> Self {
        RegistrationPanelRenderer { backend, ids }
    }

    /// Render one panel per axis in `axis_order`.
    ///
    /// The contour is binarized (any value > 0 counts as outline) before it
    /// reaches the backend, the title is attached to the first panel only,
    /// and each panel's generic `figure_1` element id is rewritten with a
    /// generated one so composed documents do not collide.
    pub fn render(
        &mut self,
        anatomical: &Volume,
        contour: &Volume,
        axis_order: &[SliceAxis],
        cuts: &AxisCuts,
        title: Option<&str>,
    ) -> Result<Vec<PanelArtifact>> {
        if anatomical.shape() != contour.shape() {
            return Err(RibbonQcError::VolumeShapeMismatch);
        }

        let outline =
            contour.same_space(contour.data.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }));

        let mut panels = Vec::with_capacity(axis_order.len());
        for (i, &axis) in axis_order.iter().enumerate() {
            let panel_title = if i == 0 { title } else { None };
            let svg = self.backend.plot_slice(
                anatomical,
                &outline,
                axis,
                cuts.for_axis(axis),
                panel_title,
            )?;

            let element_id = self.ids.next_id(axis.letter());
            let svg = svg.replacen("figure_1", &element_id, 1);
            panels.push(PanelArtifact {
                axis,
                element_id,
                svg,
            });
        }
        Ok(panels)
    }

    /// Render all panels and compose them into one artifact at `out_file`.
    pub fn render_to_file(
        &mut self,
        anatomical: &Volume,
        contour: &Volume,
        axis_order: &[SliceAxis],
        cuts: &AxisCuts,
        title: Option<&str>,
        out_file: &Path,
    ) -> Result<Vec<PanelArtifact>> {
        let panels = self.render(anatomical, contour, axis_order, cuts, title)?;
        self.backend.compose(&panels, out_file)?;
        Ok(panels)
    }
}
