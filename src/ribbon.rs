//! Deriving a cortical ribbon boundary map from a segmentation volume.
//!
//! The segmentation codes are folded through a tissue-code table into a
//! white-matter region and a pial (white plus gray) region. Each region's
//! boundary is detected with a Sobel gradient-magnitude filter and kept only
//! where the response reaches that map's own percentile threshold; the two
//! edge channels are then merged into one label volume.

use ndarray::{Array1, Array3, Zip};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::{n64, N64};

use crate::filter::gradient_magnitude;
use crate::volume::Volume;

/// Label written for surviving white-matter edge voxels.
pub const WHITE_EDGE_LABEL: f32 = 1.0;
/// Label written for surviving pial edge voxels.
pub const PIAL_EDGE_LABEL: f32 = 3.0;

/// Out-of-range fill used when filtering the binary region masks. Being
/// negative, the volume faces register as genuine discontinuities instead of
/// fading out.
const EDGE_FILL: f32 = -1.0;

/// Maps raw segmentation codes to the two logical tissue classes.
///
/// Atlas labelings encode many regions; folding each code through
/// `fold_modulus` collapses them so that `white_code` denotes white matter
/// and everything at or above `pial_floor` is inside the pial surface
/// (pial is a superset of white). Alternate atlases substitute their own
/// table instead of relying on the folding arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TissueCodeTable {
    pub fold_modulus: i64,
    pub white_code: i64,
    pub pial_floor: i64,
}

/// The table for the FreeSurfer aseg-style labeling this pipeline consumes.
pub const ASEG_TISSUE_CODES: TissueCodeTable = TissueCodeTable {
    fold_modulus: 39,
    white_code: 2,
    pial_floor: 2,
};

impl Default for TissueCodeTable {
    fn default() -> Self {
        ASEG_TISSUE_CODES
    }
}

/// Parameters controlling ribbon classification.
#[derive(Debug, Clone)]
pub struct RibbonOptions {
    pub tissue_codes: TissueCodeTable,
    /// Percentile (0-100) of the strictly positive gradient responses below
    /// which edges are discarded, computed per channel.
    pub edge_percentile: f64,
}

impl Default for RibbonOptions {
    fn default() -> Self {
        RibbonOptions {
            tissue_codes: TissueCodeTable::default(),
            edge_percentile: 30.0,
        }
    }
}

/// Classify the ribbon boundaries of a segmentation volume.
///
/// The output volume shares the segmentation's grid and physical space and
/// holds only the labels 0 (background), [`WHITE_EDGE_LABEL`] and
/// [`PIAL_EDGE_LABEL`]. Where both channels fire, the pial label wins. The
/// computation is deterministic: identical inputs produce bit-identical
/// outputs.
pub fn classify_ribbon(segmentation: &Volume, options: &RibbonOptions) -> Volume {
    let table = &options.tissue_codes;

    let white = region_mask(&segmentation.data, |code| code == table.white_code, table);
    let pial = region_mask(&segmentation.data, |code| code >= table.pial_floor, table);

    let white_edges = edge_channel(&white, options.edge_percentile, "white");
    let pial_edges = edge_channel(&pial, options.edge_percentile, "pial");

    // Saturating union of the two channels: overlap collapses to pial.
    let mut labels = Array3::zeros(segmentation.data.dim());
    Zip::from(&mut labels)
        .and(&white_edges)
        .and(&pial_edges)
        .apply(|l, &w, &p| {
            *l = if p {
                PIAL_EDGE_LABEL
            } else if w {
                WHITE_EDGE_LABEL
            } else {
                0.0
            };
        });

    segmentation.same_space(labels)
}

/// Binary mask of voxels whose folded code satisfies the class predicate.
fn region_mask<F>(data: &Array3<f32>, class: F, table: &TissueCodeTable) -> Array3<f32>
where
    F: Fn(i64) -> bool,
{
    data.mapv(|v| {
        let code = (v.round() as i64).rem_euclid(table.fold_modulus);
        if class(code) {
            1.0
        } else {
            0.0
        }
    })
}

/// Edge voxels of one binary region: gradient responses at or above the
/// channel's own percentile threshold.
fn edge_channel(mask: &Array3<f32>, percentile: f64, channel: &str) -> Array3<bool> {
    let grad = gradient_magnitude(mask, EDGE_FILL);

    match positive_percentile(&grad, percentile) {
        Some(threshold) => grad.mapv(|v| v >= threshold),
        None => {
            log::warn!("no positive edge responses in the {} channel", channel);
            Array3::from_elem(grad.dim(), false)
        }
    }
}

/// Percentile of the strictly positive values of a gradient map, with
/// linear interpolation between order statistics. `None` if the map has no
/// positive values.
fn positive_percentile(map: &Array3<f32>, percentile: f64) -> Option<f32> {
    let positives: Vec<N64> = map
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| n64(v as f64))
        .collect();
    if positives.is_empty() {
        return None;
    }

    let mut positives = Array1::from(positives);
    positives
        .quantile_mut(n64(percentile / 100.0), &Linear)
        .ok()
        .map(|q| q.raw() as f32)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::affine::Affine4;
    use ndarray::Array3;

    fn segmentation(data: Array3<f32>) -> Volume {
        Volume::new(data, Affine4::identity(), [1.0, 1.0, 1.0])
    }

    fn label_alphabet(vol: &Volume) -> Vec<f32> {
        let mut seen: Vec<f32> = Vec::new();
        for &v in vol.data.iter() {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        seen
    }

    /// A segmentation with mixed codes to exercise both channels.
    fn mixed_segmentation() -> Volume {
        let mut data = Array3::zeros((6, 6, 6));
        for ((i, j, k), v) in data.indexed_iter_mut() {
            *v = if i < 2 {
                0.0 // background
            } else if i < 4 {
                2.0 // white matter
            } else {
                (3 + (j + k) % 4) as f32 // assorted gray codes
            };
        }
        segmentation(data)
    }

    #[test]
    fn labels_stay_in_the_output_alphabet() {
        let seg = mixed_segmentation();
        let out = classify_ribbon(&seg, &RibbonOptions::default());

        for &v in out.data.iter() {
            assert!(
                v == 0.0 || v == WHITE_EDGE_LABEL || v == PIAL_EDGE_LABEL,
                "unexpected label {}",
                v
            );
        }
        assert!(label_alphabet(&out).len() > 1, "expected some edges");
    }

    #[test]
    fn rerunning_is_bit_identical() {
        let seg = mixed_segmentation();
        let a = classify_ribbon(&seg, &RibbonOptions::default());
        let b = classify_ribbon(&seg, &RibbonOptions::default());
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn raising_the_percentile_never_adds_labels() {
        let seg = mixed_segmentation();

        let low = classify_ribbon(
            &seg,
            &RibbonOptions {
                edge_percentile: 30.0,
                ..Default::default()
            },
        );
        let high = classify_ribbon(
            &seg,
            &RibbonOptions {
                edge_percentile: 60.0,
                ..Default::default()
            },
        );

        let count = |vol: &Volume, label: f32| vol.data.iter().filter(|&&v| v == label).count();
        assert!(count(&high, WHITE_EDGE_LABEL) <= count(&low, WHITE_EDGE_LABEL));
        assert!(count(&high, PIAL_EDGE_LABEL) <= count(&low, PIAL_EDGE_LABEL));
    }

    #[test]
    fn overlapping_channels_collapse_to_pial() {
        // With a lone non-tissue defect the white and pial masks are equal,
        // so every surviving edge belongs to both channels and must come
        // out as the pial label, never as white and never as their sum.
        let mut data = Array3::from_elem((4, 4, 4), 2.0);
        data[[0, 0, 0]] = 0.0;
        let seg = segmentation(data);

        let out = classify_ribbon(&seg, &RibbonOptions::default());

        assert!(out.data.iter().any(|&v| v == PIAL_EDGE_LABEL));
        assert!(out.data.iter().all(|&v| v == 0.0 || v == PIAL_EDGE_LABEL));
    }

    #[test]
    fn pial_superset_codes_fire_only_the_white_channel_interior() {
        // Gray matter (code 3) everywhere except a white-matter block: the
        // pial mask is uniform, so away from the volume faces only the
        // white channel can respond.
        let mut data = Array3::from_elem((8, 8, 8), 3.0);
        for i in 3..5 {
            for j in 3..5 {
                for k in 3..5 {
                    data[[i, j, k]] = 2.0;
                }
            }
        }
        let seg = segmentation(data);

        let out = classify_ribbon(&seg, &RibbonOptions::default());

        let deep_pial = out
            .data
            .indexed_iter()
            .filter(|((i, j, k), &v)| {
                v == PIAL_EDGE_LABEL
                    && (2..6).contains(i)
                    && (2..6).contains(j)
                    && (2..6).contains(k)
            })
            .count();
        let deep_white = out
            .data
            .indexed_iter()
            .filter(|((i, j, k), &v)| {
                v == WHITE_EDGE_LABEL
                    && (2..6).contains(i)
                    && (2..6).contains(j)
                    && (2..6).contains(k)
            })
            .count();

        assert_eq!(deep_pial, 0, "uniform pial mask must not edge internally");
        assert!(deep_white > 0, "white block boundary should label");
    }

    #[test]
    fn atlas_offsets_fold_back_onto_tissue_codes() {
        // 41 mod 39 == 2: contralateral white matter folds onto the white
        // code and classifies identically.
        let mut lhs = Array3::from_elem((6, 6, 6), 2.0);
        let mut rhs = Array3::from_elem((6, 6, 6), 41.0);
        lhs[[2, 2, 2]] = 0.0;
        rhs[[2, 2, 2]] = 39.0; // 39 mod 39 == 0

        let a = classify_ribbon(&segmentation(lhs), &RibbonOptions::default());
        let b = classify_ribbon(&segmentation(rhs), &RibbonOptions::default());
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn output_shares_the_segmentation_space() {
        let seg = mixed_segmentation();
        let out = classify_ribbon(&seg, &RibbonOptions::default());
        assert_eq!(out.shape(), seg.shape());
        assert_eq!(out.affine, seg.affine);
        assert_eq!(out.spacing, seg.spacing);
    }
}
