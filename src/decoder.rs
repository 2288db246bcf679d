//! Decoder adapter: greyscale pixels in, decoded QR text (or nothing) out.

use crate::frame::LumaBuffer;
use rqrr::PreparedImage;
use tracing::{debug, trace};

/// A QR decoding primitive
pub trait QrDecoder: Send {
    /// Decode the first readable QR code in the image
    fn decode(&mut self, image: &LumaBuffer) -> Option<String>;
}

/// [`QrDecoder`] backed by `rqrr`
#[derive(Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&mut self, image: &LumaBuffer) -> Option<String> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 {
            return None;
        }

        let mut prepared =
            PreparedImage::prepare_from_greyscale(width, height, |x, y| image.get(x, y));
        let grids = prepared.detect_grids();
        trace!("Found {} potential QR grids", grids.len());

        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => return Some(content),
                Err(e) => debug!("Grid decode failed: {:?}", e),
            }
        }

        None
    }
}
