// Command-line configuration (clap derive).
//
//   kuronuri photo.jpg                      open a window on photo.jpg
//   kuronuri photo.jpg -o redacted.png      choose where S saves to
//   kuronuri scan.png --auto -t 120         detect, accept all, save, exit

use std::path::PathBuf;

use clap::Parser;
use clap::builder::TypedValueParser;

use crate::detect::{DEFAULT_GRID_SIZE, DEFAULT_THRESHOLD};
use crate::editor::DEFAULT_HANDLE_TOLERANCE;
use crate::io::DEFAULT_EXPORT_NAME;
use crate::session::SessionOptions;

/// Black out rectangular regions of an image.
///
/// Drag on empty space to draw a mask, drag a mask to move it, drag a corner
/// of the selected mask to resize it. Delete removes the selection, D suggests
/// masks over dark regions, A accepts the suggestions, S saves, Esc quits.
#[derive(Parser, Debug, Clone)]
#[command(name = "kuronuri", version)]
pub struct Config {
    /// Image to open.
    #[arg(value_name = "IMAGE")]
    pub input: PathBuf,

    /// Where the masked PNG is written.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_EXPORT_NAME)]
    pub output: PathBuf,

    /// Grid cells strictly darker than this (0-255) count as a region.
    #[arg(short, long, value_name = "0-255", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u8,

    /// Detection runs on an N x N grayscale copy of the image.
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_GRID_SIZE,
          value_parser = clap::value_parser!(u16).range(1..=1024).map(usize::from))]
    pub grid: usize,

    /// Corner handle grab distance in pixels.
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_HANDLE_TOLERANCE)]
    pub handle_size: f32,

    /// No window: detect, accept every suggestion, save and exit.
    #[arg(long)]
    pub auto: bool,
}

impl Config {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            threshold: self.threshold,
            grid_size: self.grid,
            handle_tolerance: self.handle_size,
        }
    }
}
