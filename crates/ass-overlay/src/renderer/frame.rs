//! RGBA frame buffer for inspecting rendered images

use crate::compositor::Image;

/// Pixel format for frame data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGBA with 8 bits per channel
    Rgba8,
    /// BGRA with 8 bits per channel
    Bgra8,
    /// RGB with 8 bits per channel
    Rgb8,
}

/// Rendered frame containing pixel data
#[derive(Clone)]
pub struct Frame {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    timestamp: i64,
    format: PixelFormat,
}

impl Frame {
    /// Create a frame around an RGBA buffer
    pub fn new(buffer: Vec<u8>, width: u32, height: u32, timestamp: i64) -> Self {
        Self::with_format(buffer, width, height, timestamp, PixelFormat::Rgba8)
    }

    /// Create a frame with a specific pixel format
    pub fn with_format(buffer: Vec<u8>, width: u32, height: u32, timestamp: i64, format: PixelFormat) -> Self {
        Self {
            buffer,
            width,
            height,
            timestamp,
            format,
        }
    }

    /// Create a transparent frame
    pub fn empty(width: u32, height: u32, timestamp: i64) -> Self {
        Self::new(vec![0; width as usize * height as usize * 4], width, height, timestamp)
    }

    /// Paint `images` in order over a transparent frame
    pub fn from_images(images: &[Image], width: u32, height: u32, timestamp: i64) -> Self {
        let mut frame = Self::empty(width, height, timestamp);
        frame.blend_images(images);
        frame
    }

    /// Paint `images` in order over the frame. Each coverage byte is scaled
    /// by the image color's opacity; pixels outside the frame are dropped.
    pub fn blend_images(&mut self, images: &[Image]) {
        if self.format != PixelFormat::Rgba8 {
            log::warn!("blending into a {:?} frame is not supported", self.format);
            return;
        }
        let width = self.width as i32;
        let height = self.height as i32;
        for image in images {
            let [r, g, b, a] = image.color.to_be_bytes();
            let opacity = 255 - u32::from(a);
            if opacity == 0 {
                continue;
            }
            for y in 0..image.h {
                let fy = image.dst_y + y;
                if fy < 0 || fy >= height {
                    continue;
                }
                let row = image.row(y);
                for (x, &coverage) in row.iter().enumerate().take(image.w.max(0) as usize) {
                    let fx = image.dst_x + x as i32;
                    if coverage == 0 || fx < 0 || fx >= width {
                        continue;
                    }
                    let k = u32::from(coverage) * opacity / 255;
                    let at = (fy as usize * self.width as usize + fx as usize) * 4;
                    let px = &mut self.buffer[at..at + 4];
                    for (dst, src) in px.iter_mut().zip([r, g, b]) {
                        *dst = ((u32::from(*dst) * (255 - k) + u32::from(src) * k) / 255) as u8;
                    }
                    px[3] = (k + u32::from(px[3]) * (255 - k) / 255) as u8;
                }
            }
        }
    }

    /// Frame buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Take ownership of the buffer
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Timestamp in milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// RGBA value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height || self.format != PixelFormat::Rgba8 {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.buffer.get(at..at + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Convert to RGBA if not already
    pub fn to_rgba(mut self) -> Self {
        match self.format {
            PixelFormat::Rgba8 => self,
            PixelFormat::Bgra8 => {
                for chunk in self.buffer.chunks_exact_mut(4) {
                    chunk.swap(0, 2);
                }
                self.format = PixelFormat::Rgba8;
                self
            }
            PixelFormat::Rgb8 => {
                let mut rgba = Vec::with_capacity(self.buffer.len() / 3 * 4);
                for chunk in self.buffer.chunks_exact(3) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
                }
                self.buffer = rgba;
                self.format = PixelFormat::Rgba8;
                self
            }
        }
    }

    /// Whether every pixel is transparent
    pub fn is_empty(&self) -> bool {
        match self.format {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => self.buffer.chunks_exact(4).all(|pixel| pixel[3] == 0),
            PixelFormat::Rgb8 => false,
        }
    }
}
