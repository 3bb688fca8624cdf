//! Discrete edge filters on 3D grids.
//!
//! The Sobel operator is built from separable 1D passes: a central
//! difference along the derivative axis and triangular smoothing along the
//! remaining axes. Every pass pads out-of-range samples with a constant
//! fill value, so the fill participates in smoothing the same way a
//! sequentially applied filter pipeline would.

use ndarray::Array3;

/// Central difference weights of the Sobel kernel.
const DERIVATIVE: [f32; 3] = [-1.0, 0.0, 1.0];
/// Smoothing weights applied on the non-derivative axes.
const SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// Correlate a 3-tap kernel along one axis, reading `fill` outside the grid.
fn correlate1d(input: &Array3<f32>, weights: &[f32; 3], axis: usize, fill: f32) -> Array3<f32> {
    let len = input.shape()[axis];
    let mut out = Array3::zeros(input.dim());

    for ((i, j, k), o) in out.indexed_iter_mut() {
        let idx = [i, j, k];
        let mut acc = 0.0;
        for (tap, &w) in weights.iter().enumerate() {
            let pos = idx[axis] as isize + tap as isize - 1;
            let sample = if pos < 0 || pos as usize >= len {
                fill
            } else {
                let mut nb = idx;
                nb[axis] = pos as usize;
                input[[nb[0], nb[1], nb[2]]]
            };
            acc += w * sample;
        }
        *o = acc;
    }

    out
}

/// Sobel derivative along `axis` with constant out-of-range fill.
pub fn sobel(input: &Array3<f32>, axis: usize, fill: f32) -> Array3<f32> {
    let mut out = correlate1d(input, &DERIVATIVE, axis, fill);
    for smooth_axis in 0..3 {
        if smooth_axis != axis {
            out = correlate1d(&out, &SMOOTH, smooth_axis, fill);
        }
    }
    out
}

/// Per-voxel edge strength: the Euclidean norm of the Sobel derivatives
/// along all three axes.
pub fn gradient_magnitude(input: &Array3<f32>, fill: f32) -> Array3<f32> {
    let mut sum_sq = Array3::<f32>::zeros(input.dim());
    for axis in 0..3 {
        let d = sobel(input, axis, fill);
        sum_sq.zip_mut_with(&d, |s, &g| *s += g * g);
    }
    sum_sq.mapv_inplace(f32::sqrt);
    sum_sq
}
