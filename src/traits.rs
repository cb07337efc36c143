//! Traits at the boundary between the pipeline and its caller.

use crate::PixelBuffer;

/// The surface that supplies source pixels to the pipeline and receives its output.
///
/// This is the only contact point between the pipeline and whatever displays or stores images.
/// See [`process_canvas`](crate::process_canvas).
pub trait Canvas {
    /// The image to quantize.
    fn source_pixels(&self) -> &PixelBuffer;

    /// Receives the quantized image after a successful run.
    fn publish_result(&mut self, image: PixelBuffer);
}

/// A [`Canvas`] that simply holds its source and the last published result in memory.
#[derive(Debug, Clone)]
pub struct MemoryCanvas {
    /// The source image.
    source: PixelBuffer,
    /// The most recently published image, if any.
    result: Option<PixelBuffer>,
}

impl MemoryCanvas {
    /// Creates a new [`MemoryCanvas`] with no result.
    #[must_use]
    pub fn new(source: PixelBuffer) -> Self {
        Self { source, result: None }
    }

    /// Returns the most recently published image.
    #[must_use]
    pub fn result(&self) -> Option<&PixelBuffer> {
        self.result.as_ref()
    }

    /// Consumes the canvas and returns the most recently published image.
    #[must_use]
    pub fn into_result(self) -> Option<PixelBuffer> {
        self.result
    }
}

impl Canvas for MemoryCanvas {
    fn source_pixels(&self) -> &PixelBuffer {
        &self.source
    }

    fn publish_result(&mut self, image: PixelBuffer) {
        self.result = Some(image);
    }
}
