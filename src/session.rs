//! Interactive state: the mixing ratio and whether the loop keeps running
//!
//! The session never touches pixels. It turns input events into commands and
//! the main loop carries them out.

use log::{info, warn};
use sdl2::keyboard::Keycode;

use crate::blend::BlendRequest;
use crate::config::Settings;
use crate::display::InputEvent;

/// Outcome of a ratio adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioChange {
    Changed(f64),
    /// The step would have reached zero; snapped to the minimum instead
    Clamped(f64),
}

/// The caller-held sine ratio. Always finite and > 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixingRatio {
    value: f64,
    step: f64,
    min: f64,
}

impl MixingRatio {
    pub fn new(initial: f64, step: f64, min: f64) -> Self {
        let min = if min.is_finite() && min > 0.0 {
            min
        } else {
            crate::config::DEFAULT_MIN_RATIO
        };
        let value = if initial.is_finite() && initial > 0.0 {
            initial
        } else {
            min
        };
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            crate::config::DEFAULT_RATIO_STEP
        };
        Self { value, step, min }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn increase(&mut self) -> f64 {
        self.value += self.step;
        self.value
    }

    pub fn decrease(&mut self) -> RatioChange {
        self.value -= self.step;
        if self.value <= 0.0 {
            self.value = self.min;
            RatioChange::Clamped(self.value)
        } else {
            RatioChange::Changed(self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Blend(BlendRequest),
    /// Show the displayed bitmap again without changing it
    Redraw,
    Nothing,
}

pub struct Session {
    ratio: MixingRatio,
    running: bool,
    width: u32,
    height: u32,
    region_size: Option<u32>,
}

impl Session {
    /// `width`/`height` are the (already validated, identical) image sizes
    pub fn new(settings: &Settings, width: u32, height: u32) -> Self {
        Self {
            ratio: MixingRatio::new(
                settings.initial_ratio,
                settings.ratio_step,
                settings.min_ratio,
            ),
            running: true,
            width,
            height,
            region_size: settings.region_size,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ratio(&self) -> f64 {
        self.ratio.value()
    }

    pub fn handle(&mut self, event: &InputEvent) -> Command {
        match *event {
            InputEvent::Quit => self.quit(),
            InputEvent::Exposed => Command::Redraw,
            InputEvent::KeyDown(key) => self.handle_key(key),
            InputEvent::MouseDown { x, y, .. } => self.click(x, y),
        }
    }

    fn quit(&mut self) -> Command {
        self.running = false;
        Command::Quit
    }

    fn handle_key(&mut self, key: Keycode) -> Command {
        match key {
            Keycode::Space | Keycode::Escape => self.quit(),
            Keycode::Up => {
                let v = self.ratio.increase();
                info!("Sine argument increased to: {}", v);
                Command::Nothing
            },
            Keycode::Down => {
                match self.ratio.decrease() {
                    RatioChange::Changed(v) => info!("Sine argument decreased to: {}", v),
                    RatioChange::Clamped(v) => info!("Minimum value is: {}", v),
                }
                Command::Nothing
            },
            // Reserved, no action yet
            Keycode::Left | Keycode::Right => Command::Nothing,
            _ => Command::Nothing,
        }
    }

    fn click(&self, x: i32, y: i32) -> Command {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Command::Nothing;
        }
        let (w, h) = match self.region_size {
            Some(n) => (n, n),
            None => (self.width, self.height),
        };
        match BlendRequest::new(x as u32, y as u32, w, h, self.ratio.value()) {
            Ok(req) => Command::Blend(req),
            Err(e) => {
                warn!("click at ({}, {}) ignored: {}", x, y, e);
                Command::Nothing
            },
        }
    }
}
