//! Image preprocessing for OCR.
//!
//! Every transform takes an image and returns a new buffer; nothing is
//! mutated in place, so stages compose freely and failures can fall
//! back to the stage input.

use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use ndarray::Array2;
use tracing::{debug, warn};

/// Options for the flag-driven enhancement pipeline.
#[derive(Debug, Clone)]
pub struct EnhanceOptions {
    /// Resolution scale factor.
    pub scale: f32,
    /// Gaussian denoise before contrast work.
    pub noise_reduction: bool,
    /// Global histogram equalization.
    pub contrast_enhancement: bool,
    /// Laplacian-style sharpening.
    pub sharpen: bool,
    /// Otsu binarization as the final stage.
    pub binary_threshold: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            scale: 3.0,
            noise_reduction: true,
            contrast_enhancement: true,
            sharpen: true,
            binary_threshold: true,
        }
    }
}

/// Image preprocessor for the OCR pipeline.
#[derive(Debug, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Resize by a scale factor with smooth interpolation.
    pub fn scale(&self, image: &RgbaImage, factor: f32) -> RgbaImage {
        if factor <= 0.0 || (factor - 1.0).abs() < f32::EPSILON {
            return image.clone();
        }
        let width = ((image.width() as f32 * factor) as u32).max(1);
        let height = ((image.height() as f32 * factor) as u32).max(1);
        DynamicImage::ImageRgba8(image.clone())
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_rgba8()
    }

    /// Gaussian denoise. Kernel size is `ceil(radius*2)*2+1`, sigma
    /// `radius/3`.
    pub fn gaussian_blur(&self, image: &RgbaImage, radius: f32) -> RgbaImage {
        let kernel = gaussian_kernel(radius);
        convolve(image, &kernel)
    }

    /// Global histogram equalization through a CDF lookup table.
    pub fn enhance_contrast(&self, image: &RgbaImage) -> RgbaImage {
        let mut histogram = [0u32; 256];
        for p in image.pixels() {
            histogram[luma(p) as usize] += 1;
        }

        let total = (image.width() * image.height()) as f32;
        let mut lut = [0u8; 256];
        let mut cdf = 0u32;
        for i in 0..256 {
            cdf += histogram[i];
            lut[i] = ((cdf as f32 / total) * 255.0).round().min(255.0) as u8;
        }

        let mut out = image.clone();
        for p in out.pixels_mut() {
            let v = lut[luma(p) as usize];
            *p = Rgba([v, v, v, p[3]]);
        }
        out
    }

    /// Sharpen with the standard 5-center Laplacian kernel.
    pub fn sharpen(&self, image: &RgbaImage) -> RgbaImage {
        let kernel =
            Array2::from_shape_vec((3, 3), vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0])
                .expect("static kernel shape");
        convolve(image, &kernel)
    }

    /// Binarize around the Otsu threshold.
    pub fn binarize(&self, image: &RgbaImage) -> RgbaImage {
        let threshold = self.otsu_threshold(image);
        debug!("binary threshold calculated: {}", threshold);

        let mut out = image.clone();
        for p in out.pixels_mut() {
            let v = if luma(p) > threshold { 255 } else { 0 };
            *p = Rgba([v, v, v, p[3]]);
        }
        out
    }

    /// Otsu's between-class-variance threshold over the gray histogram.
    pub fn otsu_threshold(&self, image: &RgbaImage) -> u8 {
        let mut histogram = [0u64; 256];
        for p in image.pixels() {
            histogram[luma(p) as usize] += 1;
        }
        let total = (image.width() * image.height()) as f64;

        let sum: f64 = histogram
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum();

        let mut sum_b = 0.0f64;
        let mut w_b = 0.0f64;
        let mut max_variance = 0.0f64;
        let mut threshold = 0u8;

        for i in 0..256 {
            w_b += histogram[i] as f64;
            if w_b == 0.0 {
                continue;
            }
            let w_f = total - w_b;
            if w_f == 0.0 {
                break;
            }
            sum_b += i as f64 * histogram[i] as f64;
            let m_b = sum_b / w_b;
            let m_f = (sum - sum_b) / w_f;
            let variance = w_b * w_f * (m_b - m_f) * (m_b - m_f);
            if variance > max_variance {
                max_variance = variance;
                threshold = i as u8;
            }
        }

        threshold
    }

    /// Edge emphasis for ruled tables: Sobel X and Y combined by
    /// gradient magnitude.
    pub fn preprocess_table(&self, image: &RgbaImage) -> RgbaImage {
        let sobel_x =
            Array2::from_shape_vec((3, 3), vec![-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0])
                .expect("static kernel shape");
        let sobel_y =
            Array2::from_shape_vec((3, 3), vec![-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0])
                .expect("static kernel shape");

        let edges_x = convolve(image, &sobel_x);
        let edges_y = convolve(image, &sobel_y);

        let mut out = RgbaImage::new(image.width(), image.height());
        for (x, y, p) in out.enumerate_pixels_mut() {
            let ex = edges_x.get_pixel(x, y)[0] as f32;
            let ey = edges_y.get_pixel(x, y)[0] as f32;
            let magnitude = (ex * ex + ey * ey).sqrt().min(255.0) as u8;
            *p = Rgba([magnitude, magnitude, magnitude, 255]);
        }
        out
    }

    /// Mild stroke reinforcement tuned for Hebrew glyph shapes.
    pub fn optimize_for_hebrew(&self, image: &RgbaImage) -> RgbaImage {
        let kernel = Array2::from_shape_vec(
            (3, 3),
            vec![0.0, -0.5, 0.0, -0.5, 3.0, -0.5, 0.0, -0.5, 0.0],
        )
        .expect("static kernel shape");
        convolve(image, &kernel)
    }

    /// Run the flag-selected stages in order: scale, denoise, contrast,
    /// sharpen, binarize. A stage that cannot run is logged and its
    /// input passes through unchanged.
    pub fn enhance_for_ocr(&self, image: &RgbaImage, options: &EnhanceOptions) -> RgbaImage {
        debug!("starting OCR enhancement: {:?}", options);
        let mut current = image.clone();

        if (options.scale - 1.0).abs() > f32::EPSILON {
            if options.scale > 0.0 {
                current = self.scale(&current, options.scale);
                debug!("image scaled by factor {}", options.scale);
            } else {
                warn!("invalid scale factor {}, stage skipped", options.scale);
            }
        }

        if options.noise_reduction {
            current = self.gaussian_blur(&current, 1.0);
        }

        if options.contrast_enhancement {
            current = self.enhance_contrast(&current);
        }

        if options.sharpen {
            current = self.sharpen(&current);
        }

        if options.binary_threshold {
            current = self.binarize(&current);
        }

        current
    }
}

fn luma(p: &Rgba<u8>) -> u8 {
    (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32).round() as u8
}

fn gaussian_kernel(radius: f32) -> Array2<f32> {
    let size = ((radius * 2.0).ceil() as usize) * 2 + 1;
    let sigma = radius / 3.0;
    let sigma2 = 2.0 * sigma * sigma;
    let mut kernel = Array2::<f32>::zeros((size, size));
    let mut sum = 0.0f32;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - size as f32 / 2.0;
            let dy = y as f32 - size as f32 / 2.0;
            let value = (-(dx * dx + dy * dy) / sigma2).exp() / (std::f32::consts::PI * sigma2);
            kernel[[y, x]] = value;
            sum += value;
        }
    }
    kernel.mapv_inplace(|v| v / sum);
    kernel
}

/// Convolve RGB channels against a square kernel, clamping samples at
/// the image edges. Alpha passes through.
fn convolve(image: &RgbaImage, kernel: &Array2<f32>) -> RgbaImage {
    let width = image.width() as i64;
    let height = image.height() as i64;
    let size = kernel.nrows() as i64;
    let offset = size / 2;

    let mut out = RgbaImage::new(image.width(), image.height());
    for y in 0..height {
        for x in 0..width {
            let mut r = 0.0f32;
            let mut g = 0.0f32;
            let mut b = 0.0f32;

            for ky in 0..size {
                for kx in 0..size {
                    let px = (x + kx - offset).clamp(0, width - 1) as u32;
                    let py = (y + ky - offset).clamp(0, height - 1) as u32;
                    let sample = image.get_pixel(px, py);
                    let weight = kernel[[ky as usize, kx as usize]];
                    r += sample[0] as f32 * weight;
                    g += sample[1] as f32 * weight;
                    b += sample[2] as f32 * weight;
                }
            }

            let alpha = image.get_pixel(x as u32, y as u32)[3];
            out.put_pixel(
                x as u32,
                y as u32,
                Rgba([
                    r.clamp(0.0, 255.0) as u8,
                    g.clamp(0.0, 255.0) as u8,
                    b.clamp(0.0, 255.0) as u8,
                    alpha,
                ]),
            );
        }
    }
    out
}
