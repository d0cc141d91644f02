//! Blur effects on coverage bitmaps

use crate::raster::bitmap::Bitmap;
use crate::utils::RenderError;

/// Coverage effect applied in place
pub trait Effect {
    /// Apply the effect to a bitmap
    fn apply(&self, bitmap: &mut Bitmap) -> Result<(), RenderError>;

    /// Effect name, for logging
    fn name(&self) -> &str;
}

/// Repeated 1-2-1 box blur (`\be`)
pub struct BoxBlur {
    passes: u32,
}

impl BoxBlur {
    /// Create a box blur with the given number of passes
    pub fn new(passes: u32) -> Self {
        Self { passes }
    }

    fn blur_pass(bitmap: &mut Bitmap) {
        let (w, h, stride) = (bitmap.w as usize, bitmap.h as usize, bitmap.stride as usize);
        if w == 0 || h == 0 {
            return;
        }
        let buf = &mut bitmap.buffer;

        for y in 0..h {
            let row = y * stride;
            let mut old_sum = 2 * u32::from(buf[row]);
            for x in 0..w - 1 {
                let new_sum = u32::from(buf[row + x]) + u32::from(buf[row + x + 1]);
                buf[row + x] = ((old_sum + new_sum) >> 2) as u8;
                old_sum = new_sum;
            }
        }

        for x in 0..w {
            let mut old_sum = 2 * u32::from(buf[x]);
            for y in 0..h - 1 {
                let new_sum = u32::from(buf[y * stride + x]) + u32::from(buf[(y + 1) * stride + x]);
                buf[y * stride + x] = ((old_sum + new_sum) >> 2) as u8;
                old_sum = new_sum;
            }
        }
    }
}

impl Effect for BoxBlur {
    fn apply(&self, bitmap: &mut Bitmap) -> Result<(), RenderError> {
        for _ in 0..self.passes {
            Self::blur_pass(bitmap);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BoxBlur"
    }
}

/// Separable Gaussian blur with an integer kernel (`\blur`)
pub struct GaussianBlur {
    radius: f64,
    kernel: Vec<u32>,
}

impl GaussianBlur {
    /// Kernel weights sum to this value
    const VOLUME: u32 = 1 << 16;

    /// Create a Gaussian blur; the kernel spans `ceil(radius)` pixels
    /// on each side
    pub fn new(radius: f64) -> Self {
        let kernel = Self::create_kernel(radius);
        Self { radius, kernel }
    }

    /// Half-width of the kernel
    pub fn kernel_radius(&self) -> usize {
        self.kernel.len() / 2
    }

    /// Gaussian falling to 1/256 at `radius`, scaled so that the integer
    /// weights sum as close to [`Self::VOLUME`] as possible without
    /// exceeding it
    fn create_kernel(radius: f64) -> Vec<u32> {
        if radius <= 0.0 {
            return vec![Self::VOLUME];
        }
        let g_r = radius.ceil() as i32;
        let a = (1.0f64 / 256.0).ln() / (radius * radius * 2.0);
        let weights: Vec<f64> = (-g_r..=g_r)
            .map(|i| (a * f64::from(i * i)).exp())
            .collect();
        let build = |factor: f64| -> Vec<u32> {
            weights.iter().map(|w| (w * factor + 0.5) as u32).collect()
        };

        let mut factor = 0.0;
        let mut diff = 1.0e7;
        while diff > 1.0e-7 {
            factor += diff;
            if build(factor).iter().sum::<u32>() > Self::VOLUME {
                factor -= diff;
            }
            diff *= 0.5;
        }
        build(factor)
    }

    fn blur_horizontal(&self, bitmap: &Bitmap, tmp: &mut [u32]) {
        let (w, h, stride) = (bitmap.w as usize, bitmap.h as usize, bitmap.stride as usize);
        let r = self.kernel_radius() as isize;
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0u32;
                for (i, &weight) in self.kernel.iter().enumerate() {
                    let sx = x as isize + i as isize - r;
                    if sx >= 0 && (sx as usize) < w {
                        acc += u32::from(bitmap.buffer[y * stride + sx as usize]) * weight;
                    }
                }
                tmp[y * w + x] = acc;
            }
        }
    }

    fn blur_vertical(&self, tmp: &[u32], bitmap: &mut Bitmap) {
        let (w, h, stride) = (bitmap.w as usize, bitmap.h as usize, bitmap.stride as usize);
        let r = self.kernel_radius() as isize;
        for x in 0..w {
            for y in 0..h {
                let mut acc = 0u64;
                for (i, &weight) in self.kernel.iter().enumerate() {
                    let sy = y as isize + i as isize - r;
                    if sy >= 0 && (sy as usize) < h {
                        let src = (tmp[sy as usize * w + x] + (1 << 15)) >> 16;
                        acc += u64::from(src) * u64::from(weight);
                    }
                }
                bitmap.buffer[y * stride + x] = ((acc + (1 << 15)) >> 16).min(255) as u8;
            }
        }
    }
}

impl Effect for GaussianBlur {
    fn apply(&self, bitmap: &mut Bitmap) -> Result<(), RenderError> {
        if self.radius <= 0.0 || bitmap.w == 0 || bitmap.h == 0 {
            return Ok(());
        }
        let mut tmp = vec![0u32; (bitmap.w * bitmap.h) as usize];
        self.blur_horizontal(bitmap, &mut tmp);
        self.blur_vertical(&tmp, bitmap);
        Ok(())
    }

    fn name(&self) -> &str {
        "GaussianBlur"
    }
}
