use super::{Frame, FrameSource};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Plays the image files of a directory in file-name order
///
/// Timestamps advance by `1 / fps` per frame so recordings replay with the
/// same calibration timing regardless of decode speed.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
    frame_interval: Duration,
    width: u32,
    height: u32,
}

impl ImageSequence {
    pub fn new<P: AsRef<Path>>(dir: P, fps: u32) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Opening image sequence in {}", dir.display());

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();

        let Some(first) = paths.first() else {
            bail!("No image files found in {}", dir.display());
        };
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("Failed to read {}", first.display()))?;

        tracing::info!("Found {} frames at {}x{}", paths.len(), width, height);

        Ok(Self {
            paths,
            next: 0,
            frame_interval: Duration::from_nanos(1_000_000_000 / fps.max(1) as u64),
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };

        let image = image::open(path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .to_rgb8();
        let timestamp = self.frame_interval * self.next as u32;
        self.next += 1;

        Ok(Some(Frame::new(image, timestamp)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("air-keys-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn plays_images_in_name_order_then_ends() {
        let dir = scratch_dir("order");
        RgbImage::from_pixel(4, 2, Rgb([200, 0, 0]))
            .save(dir.join("b.png"))
            .unwrap();
        RgbImage::from_pixel(4, 2, Rgb([0, 200, 0]))
            .save(dir.join("a.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequence::new(&dir, 10).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.resolution(), (4, 2));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.image.get_pixel(0, 0), &Rgb([0, 200, 0]));
        assert_eq!(first.timestamp, Duration::ZERO);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.image.get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert_eq!(second.timestamp, Duration::from_millis(100));

        assert!(source.next_frame().unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = scratch_dir("empty");
        assert!(ImageSequence::new(&dir, 30).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
