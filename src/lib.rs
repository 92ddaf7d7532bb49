//! Kuronuri: black out rectangular regions of an image.
//!
//! The interesting parts are the [`editor`] (pointer gestures turning into
//! create / move / resize / delete on a list of mask rectangles) and the
//! [`detect`] pass (flood fill over a small grayscale grid that suggests
//! masks over dark regions). [`session`] ties them to one loaded image;
//! [`draw`] and [`io`] are the window, renderer and file collaborators.

pub mod config;
pub mod detect;
pub mod draw;
pub mod editor;
pub mod error;
pub mod io;
pub mod session;
pub mod types;

pub use error::Error;

/// Install the log subscriber.
///
/// Console output, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() -> Result<(), Error> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
