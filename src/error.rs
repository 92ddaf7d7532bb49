// Crate-wide error type.
// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Creating the window failed
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Reading or decoding the input image failed
    #[error("Image load error: {0}")]
    ImageLoad(String),

    /// Encoding or writing the masked image failed
    #[error("Export error: {0}")]
    Export(String),

    /// Pixel data could not be read or the detection worker died.
    /// Masks are left untouched when this happens.
    #[error("Detection failed: {0}")]
    Detection(String),

    /// Installing the log subscriber failed
    #[error("Logging init error: {0}")]
    Logging(String),
}
