//! Scoped pixel locking
//!
//! A [`PixelLock`] is the only way to reach a bitmap's raw memory. Acquiring
//! one locks the resource, dropping it unlocks, so every successful acquire is
//! paired with exactly one release on every exit path.

use log::debug;

use crate::bitmap::BitmapDescriptor;
use crate::display::{PixelBuffer, PixelBufferMut, PixelFormat, PixelLayout};
use crate::error::{AcquisitionFailure, BlendError};

/// What a successful lock reports about the memory it exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInfo {
    pub pitch: i32,
    pub format: PixelFormat,
}

impl LockInfo {
    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.format.bytes_per_pixel()
    }
}

/// A resource whose pixel memory can be locked for exclusive read-write access.
///
/// Implementors only do the bookkeeping; callers go through [`PixelLock`]
/// instead of calling `lock`/`unlock` directly.
pub trait Lockable {
    fn descriptor(&self) -> BitmapDescriptor;

    /// Lock the pixels in an alpha-free format of the resource's choosing
    fn lock(&mut self) -> Result<LockInfo, AcquisitionFailure>;

    /// Pixel memory while locked, lowest address first. `None` when unlocked
    /// or when the lock came back without memory.
    fn locked_pixels(&self) -> Option<&[u8]>;

    fn locked_pixels_mut(&mut self) -> Option<&mut [u8]>;

    fn unlock(&mut self);
}

/// An acquired lock. Releases the resource on drop.
pub struct PixelLock<'a, L: Lockable + ?Sized> {
    target: &'a mut L,
    info: LockInfo,
    width: u32,
    height: u32,
    name: String,
}

impl<'a, L: Lockable + ?Sized> PixelLock<'a, L> {
    pub fn acquire(target: &'a mut L) -> Result<Self, AcquisitionFailure> {
        let desc = target.descriptor();
        let info = target.lock()?;
        debug!(
            "locked {}: pitch {}, pixel_size {}",
            desc.name,
            info.pitch,
            info.pixel_size()
        );
        Ok(Self {
            target,
            info,
            width: desc.width,
            height: desc.height,
            name: desc.name,
        })
    }

    pub fn layout(&self) -> PixelLayout {
        PixelLayout {
            width: self.width,
            height: self.height,
            pitch: self.info.pitch,
            format: self.info.format,
        }
    }

    pub fn view(&self) -> Result<PixelBuffer<'_>, BlendError> {
        let layout = self.layout();
        let data = self
            .target
            .locked_pixels()
            .ok_or_else(|| BlendError::BufferUnavailable {
                name: self.name.clone(),
            })?;
        PixelBuffer::new(data, layout)
    }

    pub fn view_mut(&mut self) -> Result<PixelBufferMut<'_>, BlendError> {
        let layout = self.layout();
        let data = self
            .target
            .locked_pixels_mut()
            .ok_or_else(|| BlendError::BufferUnavailable {
                name: self.name.clone(),
            })?;
        PixelBufferMut::new(data, layout)
    }
}

impl<L: Lockable + ?Sized> Drop for PixelLock<'_, L> {
    fn drop(&mut self) {
        self.target.unlock();
        debug!("unlocked {}", self.name);
    }
}

/// Lock two resources, or neither.
/// If the second lock fails the first is released before the error returns.
pub fn acquire_pair<'a, 'b, A, B>(
    first: &'a mut A,
    second: &'b mut B,
) -> Result<(PixelLock<'a, A>, PixelLock<'b, B>), AcquisitionFailure>
where
    A: Lockable + ?Sized,
    B: Lockable + ?Sized,
{
    let first = PixelLock::acquire(first)?;
    let second = PixelLock::acquire(second)?;
    Ok((first, second))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Lockable with scripted failures and lock bookkeeping
    pub(crate) struct Probe {
        pub name: &'static str,
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u8>,
        pub fail_lock: bool,
        pub hand_back_memory: bool,
        pub locked: bool,
        pub locks: usize,
        pub unlocks: usize,
    }

    impl Probe {
        pub(crate) fn new(name: &'static str, width: u32, height: u32) -> Self {
            Self {
                name,
                width,
                height,
                pixels: vec![0; (width * height * 3) as usize],
                fail_lock: false,
                hand_back_memory: true,
                locked: false,
                locks: 0,
                unlocks: 0,
            }
        }
    }

    impl Lockable for Probe {
        fn descriptor(&self) -> BitmapDescriptor {
            BitmapDescriptor::new(self.height, self.width, self.name)
        }

        fn lock(&mut self) -> Result<LockInfo, AcquisitionFailure> {
            if self.fail_lock {
                return Err(AcquisitionFailure::Invalid {
                    name: self.name.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            self.locked = true;
            self.locks += 1;
            Ok(LockInfo {
                pitch: (self.width * 3) as i32,
                format: PixelFormat::Rgb24,
            })
        }

        fn locked_pixels(&self) -> Option<&[u8]> {
            (self.locked && self.hand_back_memory).then_some(self.pixels.as_slice())
        }

        fn locked_pixels_mut(&mut self) -> Option<&mut [u8]> {
            if self.locked && self.hand_back_memory {
                Some(&mut self.pixels)
            } else {
                None
            }
        }

        fn unlock(&mut self) {
            self.locked = false;
            self.unlocks += 1;
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let mut probe = Probe::new("a", 2, 2);
        {
            let lock = PixelLock::acquire(&mut probe).unwrap();
            assert_eq!(lock.layout().pitch, 6);
        }
        assert!(!probe.locked);
        assert_eq!((probe.locks, probe.unlocks), (1, 1));
    }

    #[test]
    fn test_pair_releases_first_when_second_fails() {
        let mut a = Probe::new("a", 2, 2);
        let mut b = Probe::new("b", 2, 2);
        b.fail_lock = true;

        let result = acquire_pair(&mut a, &mut b);
        assert!(matches!(result, Err(AcquisitionFailure::Invalid { .. })));
        drop(result);

        assert!(!a.locked);
        assert_eq!((a.locks, a.unlocks), (1, 1));
        assert_eq!((b.locks, b.unlocks), (0, 0));
    }

    #[test]
    fn test_pair_first_failure_touches_nothing() {
        let mut a = Probe::new("a", 2, 2);
        let mut b = Probe::new("b", 2, 2);
        a.fail_lock = true;

        assert!(acquire_pair(&mut a, &mut b).is_err());
        assert_eq!((a.locks, a.unlocks, b.locks, b.unlocks), (0, 0, 0, 0));
    }

    #[test]
    fn test_missing_memory_is_buffer_unavailable() {
        let mut probe = Probe::new("empty", 2, 2);
        probe.hand_back_memory = false;
        let mut lock = PixelLock::acquire(&mut probe).unwrap();
        assert!(matches!(
            lock.view(),
            Err(BlendError::BufferUnavailable { ref name }) if name == "empty"
        ));
        assert!(lock.view_mut().is_err());
        drop(lock);
        assert_eq!(probe.unlocks, 1);
    }
}
