//! In-memory bitmaps loaded from image files
//!
//! A [`Bitmap`] owns its pixels and hands them out only through the
//! [`Lockable`] contract, so the blend code sees the same pitch/format
//! negotiation it would get from a hardware surface.

use std::fmt;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::display::{PixelBufferMut, PixelFormat, PixelLayout};
use crate::error::AcquisitionFailure;
use crate::lock::{LockInfo, Lockable};

/// Size and name of a loaded bitmap, compared once before anything is drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapDescriptor {
    pub height: u32,
    pub width: u32,
    pub name: String,
}

impl BitmapDescriptor {
    pub fn new(height: u32, width: u32, name: impl Into<String>) -> Self {
        Self {
            height,
            width,
            name: name.into(),
        }
    }

    /// Same resolution; names are not compared
    pub fn matches(&self, other: &Self) -> bool {
        self.height == other.height && self.width == other.width
    }
}

impl fmt::Display for BitmapDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bitmap {}:", self.name)?;
        writeln!(f, "Height: {}", self.height)?;
        write!(f, "Width: {}", self.width)
    }
}

/// Physical row order of the backing storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    #[default]
    TopDown,
    /// Last row first, as BMP files store them; locks report a negative pitch
    BottomUp,
}

pub struct Bitmap {
    name: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    order: RowOrder,
    pixels: Vec<u8>,
    locked: bool,
}

impl Bitmap {
    /// Zero-filled bitmap
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: PixelFormat,
        order: RowOrder,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            format,
            order,
            pixels: vec![0; width as usize * height as usize * format.bytes_per_pixel()],
            locked: false,
        }
    }

    /// Decode an image file and store it in `format`
    pub fn load(
        path: impl AsRef<Path>,
        format: PixelFormat,
        order: RowOrder,
    ) -> Result<Self, String> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| format!("File \"{}\" has not been loaded: {}", path.display(), e))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::from_rgb_image(name, &img.to_rgb8(), format, order))
    }

    pub fn from_rgb_image(
        name: impl Into<String>,
        img: &RgbImage,
        format: PixelFormat,
        order: RowOrder,
    ) -> Self {
        let (width, height) = img.dimensions();
        let mut bitmap = Self::new(name, width, height, format, order);
        let layout = bitmap.layout();
        if let Ok(mut view) = PixelBufferMut::new(&mut bitmap.pixels, layout) {
            for (x, y, px) in img.enumerate_pixels() {
                view.set_rgb(x, y, px[0], px[1], px[2]);
            }
        }
        bitmap
    }

    /// Build a bitmap where every pixel is `(r, g, b)`
    pub fn filled(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: PixelFormat,
        order: RowOrder,
        rgb: (u8, u8, u8),
    ) -> Self {
        let img = RgbImage::from_pixel(width, height, image::Rgb([rgb.0, rgb.1, rgb.2]));
        Self::from_rgb_image(name, &img, format, order)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn pitch(&self) -> i32 {
        let row = (self.width as usize * self.format.bytes_per_pixel()) as i32;
        match self.order {
            RowOrder::TopDown => row,
            RowOrder::BottomUp => -row,
        }
    }

    fn layout(&self) -> PixelLayout {
        PixelLayout {
            width: self.width,
            height: self.height,
            pitch: self.pitch(),
            format: self.format,
        }
    }

    /// Copy out as a top-down RGB image
    pub fn to_rgb_image(&self) -> RgbImage {
        let layout = self.layout();
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let (r, g, b) = self.format.read_rgb(&self.pixels[layout.pixel_offset(x, y)..]);
            image::Rgb([r, g, b])
        })
    }
}

impl Lockable for Bitmap {
    fn descriptor(&self) -> BitmapDescriptor {
        BitmapDescriptor::new(self.height, self.width, self.name.clone())
    }

    fn lock(&mut self) -> Result<LockInfo, AcquisitionFailure> {
        if self.locked {
            return Err(AcquisitionFailure::AlreadyLocked {
                name: self.name.clone(),
            });
        }
        if self.pixels.is_empty() {
            return Err(AcquisitionFailure::Invalid {
                name: self.name.clone(),
                reason: format!("{}x{} bitmap has no pixels", self.width, self.height),
            });
        }
        self.locked = true;
        Ok(LockInfo {
            pitch: self.pitch(),
            format: self.format,
        })
    }

    fn locked_pixels(&self) -> Option<&[u8]> {
        self.locked.then_some(self.pixels.as_slice())
    }

    fn locked_pixels_mut(&mut self) -> Option<&mut [u8]> {
        if self.locked {
            Some(&mut self.pixels)
        } else {
            None
        }
    }

    fn unlock(&mut self) {
        self.locked = false;
    }
}
