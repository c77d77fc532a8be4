//! Sine-weighted blend kernel
//!
//! Mixes a source image into a destination over a rectangle anchored at the
//! click point. The weight is a raised sine of the distance from that point,
//! so the blended patch shows concentric rings whose frequency grows with the
//! mixing ratio:
//!
//! ```text
//! d      = hypot(x - origin_x, y - origin_y) / hypot(width, height)
//! weight = (1 + sin(ratio * PI/2 * d + PI/2)) / 2
//! out    = round(dst + weight * (src - dst))
//! ```
//!
//! Weight is 1 (full copy) at the origin and 0 (untouched) wherever
//! `ratio * d` is 2, 6, 10, ...  Inside the region `d < 1`, so ratios up to 2
//! never fully cancel a pixel.

use std::f64::consts::FRAC_PI_2;

use log::{debug, info};

use crate::bitmap::BitmapDescriptor;
use crate::display::{PixelBuffer, PixelBufferMut};
use crate::error::BlendError;
use crate::lock::{acquire_pair, Lockable};

/// Geometry and mixing ratio of one blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendRequest {
    pub origin_x: u32,
    pub origin_y: u32,
    pub width: u32,
    pub height: u32,
    pub ratio: f64,
}

impl BlendRequest {
    /// The ratio must already be clamped by the caller; anything not finite
    /// and positive is refused.
    pub fn new(
        origin_x: u32,
        origin_y: u32,
        width: u32,
        height: u32,
        ratio: f64,
    ) -> Result<Self, BlendError> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(BlendError::InvalidRatio(ratio));
        }
        Ok(Self {
            origin_x,
            origin_y,
            width,
            height,
            ratio,
        })
    }

    /// Distance at which `d` reaches 1
    #[inline]
    fn reach(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }

    /// Blend weight in [0, 1] at pixel (x, y)
    pub fn weight_at(&self, x: u32, y: u32) -> f64 {
        let reach = self.reach();
        if reach == 0.0 {
            return 1.0;
        }
        let dx = x as f64 - self.origin_x as f64;
        let dy = y as f64 - self.origin_y as f64;
        let d = dx.hypot(dy) / reach;
        (0.5 * (1.0 + (self.ratio * FRAC_PI_2 * d + FRAC_PI_2).sin())).clamp(0.0, 1.0)
    }
}

/// What one blend touched
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlendStats {
    /// Pixels inside the clipped region
    pub pixels: usize,
    pub columns: std::ops::Range<u32>,
    pub rows: std::ops::Range<u32>,
}

#[inline]
fn mix_channel(src: u8, dst: u8, weight: f64) -> u8 {
    let v = dst as f64 + weight * (src as f64 - dst as f64);
    v.round().clamp(0.0, 255.0) as u8
}

/// Blend `source` into `destination` in place.
///
/// Both views must have the same size. The region is clipped to the buffer;
/// nothing outside `[origin_x, origin_x + width) x [origin_y, origin_y + height)`
/// is read or written. Formats and pitches of the two views may differ.
pub fn blend(
    source: &PixelBuffer<'_>,
    destination: &mut PixelBufferMut<'_>,
    request: &BlendRequest,
) -> Result<BlendStats, BlendError> {
    if source.width() != destination.width() || source.height() != destination.height() {
        return Err(BlendError::DimensionMismatch {
            source: BitmapDescriptor::new(source.height(), source.width(), "source"),
            destination: BitmapDescriptor::new(
                destination.height(),
                destination.width(),
                "destination",
            ),
        });
    }

    let x_end = request
        .origin_x
        .saturating_add(request.width)
        .min(destination.width());
    let y_end = request
        .origin_y
        .saturating_add(request.height)
        .min(destination.height());
    let columns = request.origin_x.min(x_end)..x_end;
    let rows = request.origin_y.min(y_end)..y_end;
    if columns.is_empty() || rows.is_empty() {
        debug!("blend region {:?} x {:?} is empty", columns, rows);
        return Ok(BlendStats {
            pixels: 0,
            columns,
            rows,
        });
    }

    let src_format = source.layout().format;
    let dst_format = destination.layout().format;
    let src_bpp = src_format.bytes_per_pixel();
    let dst_bpp = dst_format.bytes_per_pixel();

    for y in rows.clone() {
        let src_row = source.row(y);
        let dst_row = destination.row_mut(y);
        for x in columns.clone() {
            let weight = request.weight_at(x, y);
            let si = x as usize * src_bpp;
            let di = x as usize * dst_bpp;
            let (sr, sg, sb) = src_format.read_rgb(&src_row[si..si + src_bpp]);
            let dst_px = &mut dst_row[di..di + dst_bpp];
            let (dr, dg, db) = dst_format.read_rgb(dst_px);
            dst_format.write_rgb(
                dst_px,
                mix_channel(sr, dr, weight),
                mix_channel(sg, dg, weight),
                mix_channel(sb, db, weight),
            );
        }
    }

    let pixels = columns.len() * rows.len();
    debug!("blended {} pixels in {:?} x {:?}", pixels, columns, rows);
    Ok(BlendStats {
        pixels,
        columns,
        rows,
    })
}

/// Lock both bitmaps, blend `source` into `destination`, unlock.
///
/// Sizes are compared before either lock is taken. Both locks are released
/// on every path out of this function.
pub fn draw<D, S>(
    destination: &mut D,
    source: &mut S,
    request: &BlendRequest,
) -> Result<BlendStats, BlendError>
where
    D: Lockable + ?Sized,
    S: Lockable + ?Sized,
{
    let dst_desc = destination.descriptor();
    let src_desc = source.descriptor();
    if !src_desc.matches(&dst_desc) {
        return Err(BlendError::DimensionMismatch {
            source: src_desc,
            destination: dst_desc,
        });
    }

    let (mut dst_lock, src_lock) = acquire_pair(destination, source)?;
    let src_view = src_lock.view()?;
    let mut dst_view = dst_lock.view_mut()?;

    info!(
        "blending {} into {} at ({}, {}) with sine ratio {}",
        src_desc.name, dst_desc.name, request.origin_x, request.origin_y, request.ratio
    );
    blend(&src_view, &mut dst_view, request)
}
