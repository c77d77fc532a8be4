//! Settings file and command line
//!
//! Everything has a default, so the only thing a user must supply is the two
//! image paths. Values from `--config FILE` are applied first, then flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bitmap::RowOrder;
use crate::display::PixelFormat;

pub const DEFAULT_RATIO: f64 = 2.0;
pub const DEFAULT_RATIO_STEP: f64 = 0.5;
pub const DEFAULT_MIN_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub initial_ratio: f64,
    pub ratio_step: f64,
    /// Decreasing the ratio to zero or below snaps to this value
    pub min_ratio: f64,
    /// Side of the square blended on click; `None` blends to the image edges
    pub region_size: Option<u32>,
    /// Layout of the displayed (destination) bitmap
    pub pixel_format: PixelFormat,
    /// Layout of the bitmap that gets blended in
    pub overlay_format: PixelFormat,
    pub bottom_up: bool,
    pub vsync: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "sineblend".to_string(),
            initial_ratio: DEFAULT_RATIO,
            ratio_step: DEFAULT_RATIO_STEP,
            min_ratio: DEFAULT_MIN_RATIO,
            region_size: None,
            pixel_format: PixelFormat::Xrgb8888,
            overlay_format: PixelFormat::Rgb24,
            bottom_up: false,
            vsync: true,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let settings: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_json(&json).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.initial_ratio) {
            return Err(format!("initial_ratio must be > 0, got {}", self.initial_ratio));
        }
        if !positive(self.ratio_step) {
            return Err(format!("ratio_step must be > 0, got {}", self.ratio_step));
        }
        if !positive(self.min_ratio) {
            return Err(format!("min_ratio must be > 0, got {}", self.min_ratio));
        }
        if self.region_size == Some(0) {
            return Err("region_size must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn row_order(&self) -> RowOrder {
        if self.bottom_up {
            RowOrder::BottomUp
        } else {
            RowOrder::TopDown
        }
    }
}

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliArgs {
    pub images: Vec<String>,
    pub config: Option<String>,
    pub ratio: Option<f64>,
    pub region: Option<u32>,
    pub bottom_up: bool,
    pub no_vsync: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    Run(CliArgs),
    Help,
}

impl CliArgs {
    /// File settings (or defaults) with command line overrides applied
    pub fn settings(&self) -> Result<Settings, String> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(r) = self.ratio {
            settings.initial_ratio = r;
        }
        if self.region.is_some() {
            settings.region_size = self.region;
        }
        if self.bottom_up {
            settings.bottom_up = true;
        }
        if self.no_vsync {
            settings.vsync = false;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} needs a value", flag))
}

/// Parse arguments (without the program name)
pub fn parse_args(args: &[String]) -> Result<CliAction, String> {
    let mut cli = CliArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(CliAction::Help),
            "--bottom-up" => cli.bottom_up = true,
            "--no-vsync" => cli.no_vsync = true,
            "--config" | "-c" => {
                cli.config = Some(flag_value(args, i, "--config")?.to_string());
                i += 1;
            },
            "--ratio" | "-r" => {
                let v = flag_value(args, i, "--ratio")?;
                cli.ratio = Some(v.parse().map_err(|_| format!("bad --ratio value '{}'", v))?);
                i += 1;
            },
            "--region" => {
                let v = flag_value(args, i, "--region")?;
                cli.region = Some(v.parse().map_err(|_| format!("bad --region value '{}'", v))?);
                i += 1;
            },
            other if other.starts_with('-') => return Err(format!("unknown option '{}'", other)),
            path => cli.images.push(path.to_string()),
        }
        i += 1;
    }

    if cli.images.len() < 2 {
        return Err("Program was initialized with no bitmaps! Two image paths are required.".to_string());
    }
    Ok(CliAction::Run(cli))
}

pub fn usage() -> String {
    [
        "Usage: sineblend <IMAGE1> <IMAGE2> [OPTIONS]",
        "",
        "IMAGE1 is shown; clicking blends IMAGE2 into it. Both must be the same size.",
        "",
        "Options:",
        "  --config FILE, -c FILE  JSON settings file",
        "  --ratio R, -r R         Initial sine ratio (default: 2.0)",
        "  --region N              Blend an NxN square per click instead of to the image edges",
        "  --bottom-up             Store bitmaps bottom-to-top (negative pitch)",
        "  --no-vsync              Disable VSync",
        "  --help, -h              Show this help message",
        "",
        "Controls:",
        "  Click       Blend at the pointer",
        "  Up / Down   Raise / lower the sine ratio",
        "  Space, Esc  Quit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_match_interactive_demo() {
        let s = Settings::default();
        assert_eq!(s.initial_ratio, 2.0);
        assert_eq!(s.ratio_step, 0.5);
        assert_eq!(s.min_ratio, 0.5);
        assert_eq!(s.region_size, None);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{ "region_size": 64, "pixel_format": "rgb565" }"#).unwrap();
        assert_eq!(s.region_size, Some(64));
        assert_eq!(s.pixel_format, PixelFormat::Rgb565);
        assert_eq!(s.overlay_format, PixelFormat::Rgb24);
        assert_eq!(s.title, "sineblend");
    }

    #[test]
    fn test_json_rejects_non_positive_ratio() {
        assert!(Settings::from_json(r#"{ "initial_ratio": 0.0 }"#).is_err());
        assert!(Settings::from_json(r#"{ "ratio_step": -1 }"#).is_err());
        assert!(Settings::from_json(r#"{ "region_size": 0 }"#).is_err());
    }

    #[test]
    fn test_parse_two_images_and_flags() {
        let action =
            parse_args(&args(&["a.bmp", "--ratio", "3.5", "b.png", "--region", "32", "--bottom-up"]))
                .unwrap();
        let CliAction::Run(cli) = action else {
            panic!("expected run");
        };
        assert_eq!(cli.images, vec!["a.bmp", "b.png"]);
        assert_eq!(cli.ratio, Some(3.5));
        assert_eq!(cli.region, Some(32));

        let s = cli.settings().unwrap();
        assert_eq!(s.initial_ratio, 3.5);
        assert_eq!(s.region_size, Some(32));
        assert_eq!(s.row_order(), RowOrder::BottomUp);
    }

    #[test]
    fn test_parse_requires_two_images() {
        assert!(parse_args(&args(&["only.bmp"])).is_err());
        assert!(parse_args(&[]).is_err());
    }

    #[test]
    fn test_parse_help_and_errors() {
        assert_eq!(parse_args(&args(&["--help"])), Ok(CliAction::Help));
        assert!(parse_args(&args(&["a", "b", "--ratio"])).is_err());
        assert!(parse_args(&args(&["a", "b", "--ratio", "lots"])).is_err());
        assert!(parse_args(&args(&["a", "b", "--wat"])).is_err());
    }

    #[test]
    fn test_cli_ratio_is_validated() {
        let CliAction::Run(cli) = parse_args(&args(&["a", "b", "-r", "-2"])).unwrap() else {
            panic!("expected run");
        };
        assert!(cli.settings().is_err());
    }
}
