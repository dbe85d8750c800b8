use image::{imageops, RgbImage};
use ndarray::Array4;

/// Converts RGB crops to the landmark network's input tensor
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("landmark_preprocess").entered();

        let resized;
        let image = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            image
        };

        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in image.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn produces_normalized_nchw() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
        image.put_pixel(1, 2, Rgb([0, 255, 0]));
        let tensor = Preprocessor::new(4, 4).preprocess(&image);

        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 2, 1]], 1.0);
    }
}
