//! Image preprocessing for classifier inference.
//!
//! The classifier expects:
//! - Input size: `image_size × image_size` pixels (224 by default)
//! - Normalization: pixels scaled to [0, 1] via pixel / 255
//! - Channel order: RGB
//! - Tensor layout: NHWC (Keras exports) or NCHW, with a batch dimension of 1

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

use crate::config::TensorLayout;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Shape parameters the classifier's input tensor must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub image_size: u32,
    pub layout: TensorLayout,
}

impl InputSpec {
    /// Expected tensor shape.
    pub fn shape(&self) -> [usize; 4] {
        let size = self.image_size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, size, size, CHANNELS],
            TensorLayout::Nchw => [1, CHANNELS, size, size],
        }
    }
}

/// Preprocess an image for classification.
///
/// Resizes to a square of `spec.image_size` (ignoring aspect ratio), converts
/// to RGB, scales to [0, 1], and adds a leading batch dimension.
pub fn preprocess(image: &DynamicImage, spec: InputSpec) -> Array4<f32> {
    let size = spec.image_size;
    let rgb = image
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();
    let scale =
        |x: usize, y: usize, c: usize| rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;

    let n = size as usize;
    match spec.layout {
        TensorLayout::Nhwc => {
            Array4::from_shape_fn((1, n, n, CHANNELS), |(_, y, x, c)| scale(x, y, c))
        }
        TensorLayout::Nchw => {
            Array4::from_shape_fn((1, CHANNELS, n, n), |(_, c, y, x)| scale(x, y, c))
        }
    }
}
