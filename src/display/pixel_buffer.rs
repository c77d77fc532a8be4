use serde::{Deserialize, Serialize};

use crate::error::BlendError;

// ============================================================================
// Pixel Format
// ============================================================================

/// Alpha-free pixel layouts a lock may hand back.
/// Byte orders are as laid out in memory; packed formats are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// R, G, B
    Rgb24,
    /// B, G, R
    Bgr24,
    /// 0x00RRGGBB as u32 (bytes B, G, R, X)
    Xrgb8888,
    /// 0x00BBGGRR as u32 (bytes R, G, B, X)
    Xbgr8888,
    /// RRRRRGGG GGGBBBBB as u16
    Rgb565,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 | Self::Bgr24 => 3,
            Self::Xrgb8888 | Self::Xbgr8888 => 4,
            Self::Rgb565 => 2,
        }
    }

    /// Decode one pixel into 8-bit channels
    #[inline]
    pub fn read_rgb(self, px: &[u8]) -> (u8, u8, u8) {
        match self {
            Self::Rgb24 | Self::Xbgr8888 => (px[0], px[1], px[2]),
            Self::Bgr24 | Self::Xrgb8888 => (px[2], px[1], px[0]),
            Self::Rgb565 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let r5 = ((v >> 11) & 0x1F) as u8;
                let g6 = ((v >> 5) & 0x3F) as u8;
                let b5 = (v & 0x1F) as u8;
                // Bit replication so 31 -> 255 and 63 -> 255
                ((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
            },
        }
    }

    /// Encode 8-bit channels into one pixel. Padding bytes are left alone.
    #[inline]
    pub fn write_rgb(self, px: &mut [u8], r: u8, g: u8, b: u8) {
        match self {
            Self::Rgb24 | Self::Xbgr8888 => {
                px[0] = r;
                px[1] = g;
                px[2] = b;
            },
            Self::Bgr24 | Self::Xrgb8888 => {
                px[0] = b;
                px[1] = g;
                px[2] = r;
            },
            Self::Rgb565 => {
                let r5 = quantize(r, 31);
                let g6 = quantize(g, 63);
                let b5 = quantize(b, 31);
                let v = (r5 << 11) | (g6 << 5) | b5;
                px[..2].copy_from_slice(&v.to_le_bytes());
            },
        }
    }
}

/// Round an 8-bit channel down to `max` levels
#[inline]
fn quantize(v: u8, max: u16) -> u16 {
    (v as u16 * max + 127) / 255
}

// ============================================================================
// Layout
// ============================================================================

/// Geometry of a locked region.
///
/// `pitch` is the byte distance between the start of logical row `y` and row
/// `y + 1`. A negative pitch means rows are stored bottom-to-top: logical row 0
/// is the last physical row in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub width: u32,
    pub height: u32,
    pub pitch: i32,
    pub format: PixelFormat,
}

impl PixelLayout {
    /// Tightly packed rows, top-down
    pub fn packed(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pitch: (width as usize * format.bytes_per_pixel()) as i32,
            format,
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.pitch.unsigned_abs() as usize
    }

    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Bytes a slice must hold to back this layout. Every row start must lie
    /// inside the slice, even for zero-width rows.
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        (self.height as usize - 1) * self.stride() + self.row_bytes()
    }

    fn validate(&self, len: usize) -> Result<(), BlendError> {
        if self.height > 1 && self.stride() < self.row_bytes() {
            return Err(BlendError::InvalidLayout(format!(
                "pitch {} is shorter than a {}-pixel row of {} bytes",
                self.pitch,
                self.width,
                self.row_bytes()
            )));
        }
        if len < self.required_len() {
            return Err(BlendError::InvalidLayout(format!(
                "{} bytes cannot hold {}x{} pixels with pitch {}",
                len, self.width, self.height, self.pitch
            )));
        }
        Ok(())
    }

    /// Byte offset of logical row `y`, honoring the pitch sign
    #[inline]
    pub fn row_offset(&self, y: u32) -> usize {
        let physical = if self.pitch < 0 {
            self.height - 1 - y
        } else {
            y
        };
        physical as usize * self.stride()
    }

    #[inline]
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        self.row_offset(y) + x as usize * self.format.bytes_per_pixel()
    }
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Read-only view over locked pixel memory.
/// The slice starts at the lowest address of the region regardless of pitch sign.
#[derive(Clone, Copy)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    layout: PixelLayout,
}

impl<'a> PixelBuffer<'a> {
    pub fn new(data: &'a [u8], layout: PixelLayout) -> Result<Self, BlendError> {
        layout.validate(data.len())?;
        Ok(Self { data, layout })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.layout.height
    }

    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Bytes of logical row `y`
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = self.layout.row_offset(y);
        &self.data[start..start + self.layout.row_bytes()]
    }

    pub fn rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.layout.width || y >= self.layout.height {
            return None;
        }
        let i = self.layout.pixel_offset(x, y);
        Some(self.layout.format.read_rgb(&self.data[i..]))
    }
}

/// Read-write view over locked pixel memory
pub struct PixelBufferMut<'a> {
    data: &'a mut [u8],
    layout: PixelLayout,
}

impl<'a> PixelBufferMut<'a> {
    pub fn new(data: &'a mut [u8], layout: PixelLayout) -> Result<Self, BlendError> {
        layout.validate(data.len())?;
        Ok(Self { data, layout })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.layout.height
    }

    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Reborrow as a read-only view
    pub fn as_buffer(&self) -> PixelBuffer<'_> {
        PixelBuffer {
            data: &*self.data,
            layout: self.layout,
        }
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = self.layout.row_offset(y);
        let len = self.layout.row_bytes();
        &mut self.data[start..start + len]
    }

    pub fn rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        self.as_buffer().rgb(x, y)
    }

    /// Write a pixel if (x, y) is inside bounds
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        if x >= self.layout.width || y >= self.layout.height {
            return;
        }
        let i = self.layout.pixel_offset(x, y);
        self.layout.format.write_rgb(&mut self.data[i..], r, g, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Rgb24.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Xrgb8888.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
    }

    #[test]
    fn test_xrgb_byte_order() {
        let mut px = [0u8, 0, 0, 0xAA];
        PixelFormat::Xrgb8888.write_rgb(&mut px, 1, 2, 3);
        assert_eq!(px, [3, 2, 1, 0xAA]);
        assert_eq!(u32::from_le_bytes(px) & 0x00FF_FFFF, 0x0001_0203);
    }

    #[test]
    fn test_rgb565_extremes_survive() {
        let mut px = [0u8; 2];
        PixelFormat::Rgb565.write_rgb(&mut px, 255, 0, 255);
        assert_eq!(u16::from_le_bytes(px), 0xF81F);
        assert_eq!(PixelFormat::Rgb565.read_rgb(&px), (255, 0, 255));
    }

    #[test]
    fn test_rgb565_reread_is_stable() {
        // Anything read out of a 565 pixel must encode back to the same bits
        for v in [0u16, 0x0841, 0x1234, 0x7BEF, 0xFFFF] {
            let px = v.to_le_bytes();
            let (r, g, b) = PixelFormat::Rgb565.read_rgb(&px);
            let mut out = [0u8; 2];
            PixelFormat::Rgb565.write_rgb(&mut out, r, g, b);
            assert_eq!(u16::from_le_bytes(out), v);
        }
    }

    #[test]
    fn test_positive_pitch_offsets() {
        let layout = PixelLayout {
            width: 3,
            height: 2,
            pitch: 12,
            format: PixelFormat::Rgb24,
        };
        assert_eq!(layout.row_offset(0), 0);
        assert_eq!(layout.row_offset(1), 12);
        assert_eq!(layout.pixel_offset(2, 1), 18);
        assert_eq!(layout.required_len(), 12 + 9);
    }

    #[test]
    fn test_negative_pitch_row_zero_is_last_physical_row() {
        // Each physical row is filled with its own sentinel
        let stride = 8;
        let height = 4u32;
        let mut data = Vec::new();
        for physical in 0..height {
            data.extend(std::iter::repeat(10 + physical as u8).take(stride));
        }
        let layout = PixelLayout {
            width: 2,
            height,
            pitch: -(stride as i32),
            format: PixelFormat::Xbgr8888,
        };
        let view = PixelBuffer::new(&data, layout).unwrap();
        assert_eq!(view.rgb(0, 0), Some((13, 13, 13)));
        assert_eq!(view.rgb(1, 3), Some((10, 10, 10)));
        assert!(view.row(1).iter().all(|&b| b == 12));
    }

    #[test]
    fn test_rejects_short_pitch() {
        let data = vec![0u8; 64];
        let layout = PixelLayout {
            width: 4,
            height: 2,
            pitch: 8,
            format: PixelFormat::Rgb24,
        };
        assert!(matches!(
            PixelBuffer::new(&data, layout),
            Err(BlendError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_zero_width_rows_still_need_their_starts() {
        let layout = PixelLayout {
            width: 0,
            height: 3,
            pitch: 4,
            format: PixelFormat::Xrgb8888,
        };
        assert_eq!(layout.required_len(), 8);
        assert!(PixelBuffer::new(&[], layout).is_err());
        assert!(PixelBuffer::new(&[0u8; 8], layout).is_ok());
    }

    #[test]
    fn test_rejects_short_slice() {
        let mut data = vec![0u8; 10];
        let layout = PixelLayout::packed(2, 2, PixelFormat::Rgb24);
        assert!(PixelBufferMut::new(&mut data, layout).is_err());
    }

    #[test]
    fn test_set_rgb_out_of_bounds_is_ignored() {
        let mut data = vec![0u8; 12];
        let layout = PixelLayout::packed(2, 2, PixelFormat::Rgb24);
        let mut view = PixelBufferMut::new(&mut data, layout).unwrap();
        view.set_rgb(2, 0, 255, 255, 255);
        view.set_rgb(0, 2, 255, 255, 255);
        view.set_rgb(1, 1, 9, 8, 7);
        assert_eq!(view.rgb(1, 1), Some((9, 8, 7)));
        assert_eq!(data.iter().filter(|&&b| b != 0).count(), 3);
    }
}
