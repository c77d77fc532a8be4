mod pixel_buffer;

pub use pixel_buffer::{PixelBuffer, PixelBufferMut, PixelFormat, PixelLayout};

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use crate::lock::{Lockable, PixelLock};

pub struct Display {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    width: u32,
    height: u32,
}

/// Streaming texture the displayed bitmap is copied into before presenting
pub struct RenderTarget<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Quit,
    /// Window contents were lost and must be drawn again
    Exposed,
    KeyDown(Keycode),
    MouseDown {
        x: i32,
        y: i32,
        button: MouseButtonKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButtonKind {
    Left,
    Right,
    Middle,
}

impl Display {
    /// Create a window of the given size.
    /// vsync=true: presents are locked to monitor refresh
    pub fn new(
        title: &str,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<(Self, TextureCreator<WindowContext>), String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder.build().map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump()?;

        Ok((
            Self {
                canvas,
                event_pump,
                width,
                height,
            },
            texture_creator,
        ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Upload `bitmap` and show it
    pub fn present<L: Lockable + ?Sized>(
        &mut self,
        target: &mut RenderTarget,
        bitmap: &mut L,
    ) -> Result<(), String> {
        target.upload(bitmap)?;

        self.canvas.set_draw_color(Color::RGB(0, 0, 0));
        self.canvas.clear();
        self.canvas.copy(&target.texture, None, None)?;
        self.canvas.present();
        Ok(())
    }

    /// Block until at least one event arrives, then drain the queue
    pub fn wait_events(&mut self) -> Vec<InputEvent> {
        let first = self.event_pump.wait_event();
        std::iter::once(first)
            .chain(self.event_pump.poll_iter())
            .filter_map(map_event)
            .collect()
    }
}

impl<'a> RenderTarget<'a> {
    pub fn with_size(
        texture_creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Self, String> {
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            texture,
            width,
            height,
        })
    }

    /// Copy a bitmap into the texture, top row first.
    /// The bitmap is locked for the duration of the copy.
    pub fn upload<L: Lockable + ?Sized>(&mut self, bitmap: &mut L) -> Result<(), String> {
        let lock = PixelLock::acquire(bitmap).map_err(|e| e.to_string())?;
        let view = lock.view().map_err(|e| e.to_string())?;
        let w = self.width.min(view.width());
        let h = self.height.min(view.height());

        self.texture.with_lock(None, |buf: &mut [u8], pitch: usize| {
            for y in 0..h {
                let row = &mut buf[y as usize * pitch..];
                for x in 0..w {
                    if let Some((r, g, b)) = view.rgb(x, y) {
                        let i = x as usize * 3;
                        row[i] = r;
                        row[i + 1] = g;
                        row[i + 2] = b;
                    }
                }
            }
        })
    }
}

fn map_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Quit { .. } => Some(InputEvent::Quit),
        Event::Window {
            win_event: WindowEvent::Exposed,
            ..
        } => Some(InputEvent::Exposed),
        Event::KeyDown {
            keycode: Some(k), ..
        } => Some(InputEvent::KeyDown(k)),
        Event::MouseButtonDown {
            x, y, mouse_btn, ..
        } => map_mouse_button(mouse_btn).map(|button| InputEvent::MouseDown { x, y, button }),
        _ => None,
    }
}

fn map_mouse_button(btn: MouseButton) -> Option<MouseButtonKind> {
    match btn {
        MouseButton::Left => Some(MouseButtonKind::Left),
        MouseButton::Right => Some(MouseButtonKind::Right),
        MouseButton::Middle => Some(MouseButtonKind::Middle),
        _ => None,
    }
}
