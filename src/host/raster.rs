//! Raster helpers for the in-memory host: content detection and the two
//! pixel filters the pipeline issues (Dust & Scratches, Unsharp Mask).
//!
//! ## Supported Formats
//!
//! Rasters are `u8` arrays shaped (height, width, channels):
//! - **Grayscale**: (height, width, 1) - processes the single channel
//! - **RGB**: (height, width, 3) - processes all 3 channels
//! - **RGBA**: (height, width, 4) - processes RGB, preserves alpha

use ndarray::{s, Array3, ArrayView3, Axis};
use rayon::prelude::*;

/// Pixel storage of a layer.
pub type Raster = Array3<u8>;

// ============================================================================
// Content detection
// ============================================================================

/// Whether the raster has any visible pixel.
///
/// With an alpha channel a pixel counts when its alpha is non-zero; without
/// one, any non-empty raster is visible. Rows are scanned in parallel.
pub fn has_content(input: ArrayView3<u8>) -> bool {
    let (height, width, channels) = input.dim();
    if height == 0 || width == 0 || channels == 0 {
        return false;
    }
    if channels != 4 {
        return true;
    }

    (0..height)
        .into_par_iter()
        .any(|y| (0..width).any(|x| input[[y, x, 3]] > 0))
}

// ============================================================================
// Dust & Scratches
// ============================================================================

/// Apply Dust & Scratches - u8 version.
///
/// Computes the median of each pixel's neighborhood and replaces the pixel
/// with it only where the two differ by more than `threshold`. Small texture
/// survives, isolated specks are removed.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `radius` - Neighborhood radius (1-10)
/// * `threshold` - Minimum difference from the median before a pixel changes
///
/// # Returns
/// Filtered image with same channel count
pub fn dust_and_scratches_u8(input: ArrayView3<u8>, radius: u32, threshold: u8) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let radius = radius.clamp(1, 10) as usize;
    let window_size = (radius * 2 + 1) * (radius * 2 + 1);
    let color_channels = if channels == 4 { 3 } else { channels };

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(width * channels);
            let mut values: Vec<u8> = Vec::with_capacity(window_size);

            for x in 0..width {
                for c in 0..color_channels {
                    values.clear();
                    for dy in 0..=(radius * 2) {
                        let sy = (y as isize + dy as isize - radius as isize)
                            .clamp(0, height as isize - 1) as usize;

                        for dx in 0..=(radius * 2) {
                            let sx = (x as isize + dx as isize - radius as isize)
                                .clamp(0, width as isize - 1) as usize;

                            values.push(input[[sy, sx, c]]);
                        }
                    }

                    values.sort_unstable();
                    let median = values[values.len() / 2];
                    let v = input[[y, x, c]];
                    row.push(if v.abs_diff(median) > threshold { median } else { v });
                }
                if channels == 4 {
                    row.push(input[[y, x, 3]]);
                }
            }
            row
        })
        .collect();

    assemble(rows, height, width, channels)
}

// ============================================================================
// Unsharp Mask
// ============================================================================

/// Gaussian weights for offsets `-reach..=reach` with `reach = ceil(3 sigma)`,
/// summing to one.
fn blur_weights(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let reach = (sigma * 3.0).ceil() as i32;
    let spread = 2.0 * sigma * sigma;
    let raw: Vec<f32> = (-reach..=reach)
        .map(|d| (-((d * d) as f32) / spread).exp())
        .collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// One 1D blur pass along `axis` (`Axis(0)` vertical, `Axis(1)` horizontal),
/// clamping at the borders. Rows are computed in parallel.
fn blur_pass(src: ArrayView3<f32>, weights: &[f32], axis: Axis) -> Array3<f32> {
    let (height, width, channels) = src.dim();
    let reach = (weights.len() / 2) as isize;
    let limit = src.len_of(axis) as isize - 1;
    let vertical = axis == Axis(0);

    let rows: Vec<Vec<f32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(width * channels);
            for x in 0..width {
                let pos = (if vertical { y } else { x }) as isize;
                for c in 0..channels {
                    let sum: f32 = weights
                        .iter()
                        .enumerate()
                        .map(|(i, w)| {
                            let at = (pos + i as isize - reach).clamp(0, limit) as usize;
                            let v = if vertical { src[[at, x, c]] } else { src[[y, at, c]] };
                            v * w
                        })
                        .sum();
                    row.push(sum);
                }
            }
            row
        })
        .collect();

    let flat = rows.concat();
    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        flat[(y * width + x) * channels + c]
    })
}

/// Gaussian blur of the color channels, in f32. Alpha is dropped.
fn blur_color_f32(input: ArrayView3<u8>, sigma: f32) -> Array3<f32> {
    let channels = input.dim().2;
    let color_channels = if channels == 4 { 3 } else { channels };
    let color = input.slice(s![.., .., ..color_channels]).mapv(f32::from);
    let weights = blur_weights(sigma);
    let across = blur_pass(color.view(), &weights, Axis(1));
    blur_pass(across.view(), &weights, Axis(0))
}

/// Apply Unsharp Mask - u8 version.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `amount` - Strength in percent (100 = add the full detail difference once)
/// * `radius` - Blur sigma in pixels
/// * `threshold` - Differences at or below this level are left untouched
///
/// # Returns
/// Sharpened image with same channel count
pub fn unsharp_mask_u8(input: ArrayView3<u8>, amount: u32, radius: f32, threshold: u8) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let color_channels = if channels == 4 { 3 } else { channels };
    let blurred = blur_color_f32(input, radius);
    let strength = amount as f32 / 100.0;

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(width * channels);
            for x in 0..width {
                for c in 0..color_channels {
                    let v = input[[y, x, c]] as f32;
                    let diff = v - blurred[[y, x, c]];
                    let out = if diff.abs() > threshold as f32 {
                        (v + strength * diff).round().clamp(0.0, 255.0)
                    } else {
                        v
                    };
                    row.push(out as u8);
                }
                if channels == 4 {
                    row.push(input[[y, x, 3]]);
                }
            }
            row
        })
        .collect();

    assemble(rows, height, width, channels)
}

fn assemble(rows: Vec<Vec<u8>>, height: usize, width: usize, channels: usize) -> Array3<u8> {
    let mut output = Array3::<u8>::zeros((height, width, channels));
    for (y, row) in rows.into_iter().enumerate() {
        for (i, v) in row.into_iter().enumerate() {
            output[[y, i / channels, i % channels]] = v;
        }
    }
    output
}
