//! Slice-heatmap rendering for a [`sem_core::Tensor4`]. A thin library so
//! `sem-cli query` can render a plot inline when a request carries a
//! `plot` block, without the CLI depending on the standalone `sem-plot`
//! binary.

use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use sem_core::{Tensor4, Vec3};

/// One axis-aligned slice through a velocity field, ready to rasterize.
pub struct Slice {
    /// Row-major magnitude grid, `rows × cols`.
    magnitude: Vec<f32>,
    rows: usize,
    cols: usize,
}

/// Take the constant-`index` slice of `tensor` along `axis`, matching the
/// source's `vel[index, :, :]` / `vel[:, index, :]` / `vel[:, :, index]`.
pub fn slice_mesh(tensor: &Tensor4, axis: &str, index: usize) -> Result<Slice> {
    let (nx, ny, nz) = tensor.dims;
    let (rows, cols, layers) = match axis {
        "x" => (ny, nz, nx),
        "y" => (nx, nz, ny),
        "z" => (nx, ny, nz),
        other => bail!("invalid plot axis '{other}'; must be one of ['x', 'y', 'z']"),
    };
    if index >= layers {
        bail!("invalid plot index '{index}': meshgrid has only {layers} layers in {axis}-axis");
    }

    let mut magnitude = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let v: Vec3 = match axis {
                "x" => tensor.get(index, r, c),
                "y" => tensor.get(r, index, c),
                _ => tensor.get(r, c, index),
            };
            magnitude[r * cols + c] = v.length() as f32;
        }
    }
    Ok(Slice { magnitude, rows, cols })
}

/// Diverging blue-white-red colormap approximating matplotlib's `coolwarm`,
/// `t` normalized to `[0, 1]`.
pub fn coolwarm(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let lo = [59.0, 76.0, 192.0];
    let mid = [221.0, 221.0, 221.0];
    let hi = [180.0, 4.0, 38.0];
    let lerp = |a: f32, b: f32, f: f32| a + (b - a) * f;
    let rgb = if t < 0.5 {
        let f = t / 0.5;
        [lerp(lo[0], mid[0], f), lerp(lo[1], mid[1], f), lerp(lo[2], mid[2], f)]
    } else {
        let f = (t - 0.5) / 0.5;
        [lerp(mid[0], hi[0], f), lerp(mid[1], hi[1], f), lerp(mid[2], hi[2], f)]
    };
    [rgb[0] as u8, rgb[1] as u8, rgb[2] as u8]
}

/// Rasterize `slice` into an `[w, h]` image, nearest-neighbor resampled, with
/// row 0 of the slice drawn at the bottom (matplotlib's `origin="lower"`).
pub fn render(slice: &Slice, size: [u32; 2]) -> RgbImage {
    let (w, h) = (size[0].max(1), size[1].max(1));
    let min = slice.magnitude.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = slice.magnitude.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = (max - min).max(1e-12);

    let mut img = RgbImage::new(w, h);
    for py in 0..h {
        // origin="lower": image row 0 (top) is the slice's last row.
        let slice_row = slice.rows - 1 - ((py as usize * slice.rows) / h as usize).min(slice.rows - 1);
        for px in 0..w {
            let slice_col = ((px as usize * slice.cols) / w as usize).min(slice.cols - 1);
            let m = slice.magnitude[slice_row * slice.cols + slice_col];
            let t = (m - min) / range;
            let [r, g, b] = coolwarm(t);
            img.put_pixel(px, py, Rgb([r, g, b]));
        }
    }
    img
}

/// Slice, colorize, and write a PNG heatmap for one axis/index of `tensor`.
pub fn plot_mesh(tensor: &Tensor4, axis: &str, index: usize, size: [u32; 2], save: &std::path::Path) -> Result<()> {
    let slice = slice_mesh(tensor, axis, index)?;
    let img = render(&slice, size);
    if let Some(parent) = save.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save(save)?;
    Ok(())
}
