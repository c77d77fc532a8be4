// Helpers kept public for tests and future controls
#![allow(dead_code)]

mod bitmap;
mod blend;
mod config;
mod display;
mod error;
mod lock;
mod session;

use bitmap::Bitmap;
use config::{parse_args, usage, CliAction};
use display::{Display, RenderTarget};
use error::BlendError;
use lock::Lockable;
use log::{debug, error, info, warn};
use session::{Command, Session};

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(CliAction::Run(cli)) => cli,
        Ok(CliAction::Help) => {
            println!("{}", usage());
            return Ok(());
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", usage());
            return Err(e);
        },
    };
    let settings = cli.settings()?;
    let order = settings.row_order();

    let mut displayed = Bitmap::load(&cli.images[0], settings.pixel_format, order)?;
    let mut overlay = Bitmap::load(&cli.images[1], settings.overlay_format, order)?;

    // Both images must share one resolution before anything is shown
    let shown = displayed.descriptor();
    let blended = overlay.descriptor();
    if !shown.matches(&blended) {
        error!("Bitmaps have different resolutions!");
        error!("{}", shown);
        error!("{}", blended);
        return Err(BlendError::DimensionMismatch {
            source: blended,
            destination: shown,
        }
        .to_string());
    }

    let (mut display, texture_creator) =
        Display::new(&settings.title, shown.width, shown.height, settings.vsync)?;
    let mut target = RenderTarget::with_size(&texture_creator, shown.width, shown.height)?;

    info!("=== sineblend ===");
    info!(
        "{}x{} window: showing {}, blending in {}",
        display.width(),
        display.height(),
        shown.name,
        blended.name
    );
    info!("Click to blend, Up/Down to change the sine ratio, Space or Esc to quit");

    display.present(&mut target, &mut displayed)?;

    let mut session = Session::new(&settings, shown.width, shown.height);
    info!("Sine ratio {}", session.ratio());

    'main: while session.is_running() {
        for event in display.wait_events() {
            match session.handle(&event) {
                Command::Quit => break 'main,
                Command::Blend(request) => match blend::draw(&mut displayed, &mut overlay, &request) {
                    Ok(stats) => {
                        debug!(
                            "blended {} pixels (columns {:?}, rows {:?})",
                            stats.pixels, stats.columns, stats.rows
                        );
                        display.present(&mut target, &mut displayed)?;
                    },
                    // One failed click never ends the session
                    Err(e) => warn!("blend skipped: {}", e),
                },
                Command::Redraw => display.present(&mut target, &mut displayed)?,
                Command::Nothing => {},
            }
        }
    }

    info!("Program has been terminated!");
    Ok(())
}
