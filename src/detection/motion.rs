use super::regions::LabelRaster;
use anyhow::{ensure, Result};
use image::GrayImage;
use ndarray::{ArrayView2, ShapeError, Zip};

/// Whether two samples differ by strictly more than `threshold`
#[inline]
pub fn exceeds(a: u8, b: u8, threshold: u8) -> bool {
    a.abs_diff(b) > threshold
}

/// Finds which key strips contain at least one moving pixel.
///
/// Thresholds the absolute difference against the reference and ORs the
/// result into the owning key, read from the label raster, in one pass.
pub struct MotionDetector {
    threshold: u8,
}

impl MotionDetector {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Per-key motion flags for `current` against `reference`.
    ///
    /// Both images must have the label raster's dimensions.
    pub fn detect(
        &self,
        labels: &LabelRaster,
        reference: &GrayImage,
        current: &GrayImage,
        num_keys: usize,
    ) -> Result<Vec<bool>> {
        let _span = tracing::debug_span!("motion").entered();

        let size = labels.dimensions();
        ensure!(
            reference.dimensions() == size && current.dimensions() == size,
            "motion frames {:?} / {:?} do not match key strip {:?}",
            reference.dimensions(),
            current.dimensions(),
            size
        );

        let label_view = labels.as_array().view();
        let reference = as_view(reference)?;
        let current = as_view(current)?;

        let mut moved = vec![false; num_keys];
        let threshold = self.threshold;
        Zip::from(label_view)
            .and(reference)
            .and(current)
            .for_each(|&label, &r, &c| {
                if label != 0 && exceeds(r, c, threshold) {
                    if let Some(flag) = moved.get_mut(label as usize - 1) {
                        *flag = true;
                    }
                }
            });

        Ok(moved)
    }
}

fn as_view(image: &GrayImage) -> Result<ArrayView2<'_, u8>, ShapeError> {
    let (width, height) = image.dimensions();
    ArrayView2::from_shape((height as usize, width as usize), image.as_raw())
}
