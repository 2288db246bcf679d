use crate::error::FrameError;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

/// An 8-bit greyscale frame, one byte per pixel, rows tightly packed
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl FrameData {
    pub fn new(id: u64, timestamp: SystemTime, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// Number of bytes a complete frame of these dimensions holds
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Greyscale pixel buffer reused across scan ticks.
///
/// The backing storage is only reallocated when the source dimensions change.
#[derive(Debug, Default)]
pub struct LumaBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    reallocations: u64,
}

impl LumaBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of times the buffer had to be resized
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Pixel at (x, y); callers stay within bounds
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }

    fn ensure_dimensions(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            trace!(
                "Resizing luma buffer {}x{} -> {}x{}",
                self.width,
                self.height,
                width,
                height
            );
            self.width = width;
            self.height = height;
            self.pixels.resize(width as usize * height as usize, 0);
            self.reallocations += 1;
        }
    }

    /// Copy a frame into the buffer
    pub fn fill_from(&mut self, frame: &FrameData) -> Result<(), FrameError> {
        let expected = frame.expected_size();
        let Some(src) = frame.data.get(..expected) else {
            return Err(FrameError::BufferTooSmall {
                expected,
                actual: frame.data.len(),
            });
        };

        self.ensure_dimensions(frame.width, frame.height);
        self.pixels.copy_from_slice(src);
        Ok(())
    }
}
