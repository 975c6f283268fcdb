//! Image decoding and tensor preparation

use crate::model_config::{Normalization, PreprocessingConfig, ResizeFilter};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;
use pawprint_core::{Error, Result};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns encoded image bytes into the network's input tensor
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
    filter: ResizeFilter,
    normalization: Normalization,
}

impl ImagePreprocessor {
    /// Create a preprocessor from configuration
    pub fn new(config: &PreprocessingConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            filter: config.filter,
            normalization: config.normalization,
        }
    }

    /// Target (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode PNG/JPEG/GIF/BMP/WebP bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(Error::decode("image is empty"));
        }
        image::load_from_memory(bytes).map_err(|e| Error::decode(e.to_string()))
    }

    /// Resize, convert to RGB and normalize into channel-major floats
    pub fn to_chw(&self, image: &DynamicImage) -> Vec<f32> {
        let resized = image
            .resize_exact(self.width, self.height, filter_type(self.filter))
            .to_rgb8();

        let plane = (self.width * self.height) as usize;
        let mut out = vec![0f32; plane * 3];
        for (pixel_idx, rgb) in resized.as_raw().chunks_exact(3).enumerate() {
            for channel in 0..3 {
                out[channel * plane + pixel_idx] =
                    normalize(rgb[channel], channel, self.normalization);
            }
        }
        out
    }

    /// Build a `(1, 3, H, W)` tensor on `device`
    pub fn to_tensor(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        let data = self.to_chw(image);
        Tensor::from_vec(
            data,
            (1, 3, self.height as usize, self.width as usize),
            device,
        )
        .map_err(|e| Error::inference(format!("failed to build input tensor: {}", e)))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(&PreprocessingConfig::default())
    }
}

fn filter_type(filter: ResizeFilter) -> FilterType {
    match filter {
        ResizeFilter::Nearest => FilterType::Nearest,
        ResizeFilter::Bilinear => FilterType::Triangle,
        ResizeFilter::CatmullRom => FilterType::CatmullRom,
        ResizeFilter::Gaussian => FilterType::Gaussian,
        ResizeFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

fn normalize(value: u8, channel: usize, normalization: Normalization) -> f32 {
    let v = f32::from(value);
    match normalization {
        Normalization::UnitRange => v / 255.0,
        Normalization::Imagenet => (v / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        Normalization::Raw => v,
    }
}
