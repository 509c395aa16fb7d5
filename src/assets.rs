use std::sync::Arc;

pub(crate) mod decode;
pub(crate) mod loader;
pub(crate) mod source;

#[derive(Clone, Debug)]
/// Decoded raster image in premultiplied RGBA8 form.
///
/// Once placed in the loader cache an image is shared read-only between renders.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Width over height.
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}
