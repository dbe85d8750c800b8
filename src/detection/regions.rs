use crate::config::PipelineConfig;
use crate::error::ConfigError;
use ndarray::Array2;

/// Key strip rectangle with inclusive corners
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRect {
    pub index: usize,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl KeyRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }

    #[cfg(test)]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

/// Split a `width` x `height` frame into `num_keys` equal-width strips along
/// its top edge. Region `i` spans `width*i/N ..= width*(i+1)/N - 1`.
pub fn partition(
    width: u32,
    height: u32,
    num_keys: usize,
    key_height: f32,
) -> Result<Vec<KeyRect>, ConfigError> {
    if num_keys == 0 {
        return Err(ConfigError::NoKeys);
    }
    if width == 0 || height == 0 {
        return Err(ConfigError::DegenerateFrame { width, height });
    }
    if (width as usize) < num_keys {
        return Err(ConfigError::StripTooNarrow { num_keys, width });
    }
    let strip_height = ((key_height * height as f32) as u32).min(height);
    if strip_height == 0 {
        return Err(ConfigError::EmptyStrip(key_height));
    }

    let w = width as u64;
    let n = num_keys as u64;
    let rects = (0..num_keys)
        .map(|i| {
            let k = i as u64;
            KeyRect {
                index: i,
                x0: (w * k / n) as u32,
                y0: 0,
                x1: (w * (k + 1) / n - 1) as u32,
                y1: strip_height - 1,
            }
        })
        .collect();
    Ok(rects)
}

/// Region id per analysis pixel: `index + 1` inside key `index`, 0 elsewhere
#[derive(Clone, Debug)]
pub struct LabelRaster {
    labels: Array2<u16>,
}

impl LabelRaster {
    /// Rasterise `rects` over their union bounding box
    pub fn new(rects: &[KeyRect]) -> Self {
        let left = rects.iter().map(|r| r.x0).min().unwrap_or(0);
        let top = rects.iter().map(|r| r.y0).min().unwrap_or(0);
        let right = rects.iter().map(|r| r.x1 + 1).max().unwrap_or(0);
        let bottom = rects.iter().map(|r| r.y1 + 1).max().unwrap_or(0);

        let mut labels = Array2::<u16>::zeros(((bottom - top) as usize, (right - left) as usize));
        for rect in rects {
            let id = (rect.index + 1) as u16;
            for y in rect.y0..=rect.y1 {
                for x in rect.x0..=rect.x1 {
                    labels[[(y - top) as usize, (x - left) as usize]] = id;
                }
            }
        }
        Self { labels }
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = self.labels.dim();
        (cols as u32, rows as u32)
    }

    #[cfg(test)]
    pub fn label_at(&self, x: u32, y: u32) -> u16 {
        self.labels[[y as usize, x as usize]]
    }

    pub fn as_array(&self) -> &Array2<u16> {
        &self.labels
    }
}

/// Key strips at analysis, capture and display resolution plus the label
/// raster for the analysis strip. Rebuilt only when the capture size changes.
#[derive(Clone, Debug)]
pub struct KeyLayout {
    pub capture_size: (u32, u32),
    pub analysis_size: (u32, u32),
    pub display_size: (u32, u32),
    pub analysis: Vec<KeyRect>,
    pub capture: Vec<KeyRect>,
    pub display: Vec<KeyRect>,
    pub labels: LabelRaster,
}

impl KeyLayout {
    pub fn new(capture_size: (u32, u32), config: &PipelineConfig) -> Result<Self, ConfigError> {
        let (width, height) = capture_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::DegenerateFrame { width, height });
        }

        let analysis_size = scaled_size(capture_size, config.analysis_width);
        let display_size = scaled_size(capture_size, config.display_width);

        let analysis = partition(
            analysis_size.0,
            analysis_size.1,
            config.num_keys,
            config.key_height,
        )?;
        let capture = partition(width, height, config.num_keys, config.key_height)?;
        let display = partition(
            display_size.0,
            display_size.1,
            config.num_keys,
            config.key_height,
        )?;
        let labels = LabelRaster::new(&analysis);

        tracing::debug!(
            "Partitioned {} keys: analysis {:?}, capture {:?}, display {:?}",
            config.num_keys,
            analysis_size,
            capture_size,
            display_size
        );

        Ok(Self {
            capture_size,
            analysis_size,
            display_size,
            analysis,
            capture,
            display,
            labels,
        })
    }

    pub fn num_keys(&self) -> usize {
        self.analysis.len()
    }

    /// Height of the analysis strip in rows
    pub fn strip_height(&self) -> u32 {
        self.labels.dimensions().1
    }
}

/// Scale to `target_width`, keeping the aspect ratio
fn scaled_size((width, height): (u32, u32), target_width: Option<u32>) -> (u32, u32) {
    match target_width {
        Some(target) if target != width => {
            let scaled_height = (height as u64 * target as u64 / width as u64).max(1);
            (target, scaled_height as u32)
        }
        _ => (width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(rects: &[KeyRect], width: u32, num_keys: usize) {
        assert_eq!(rects.len(), num_keys);
        assert_eq!(rects[0].x0, 0);
        assert_eq!(rects[num_keys - 1].x1, width - 1);
        for pair in rects.windows(2) {
            assert_eq!(pair[0].x1 + 1, pair[1].x0, "gap or overlap at {:?}", pair);
        }
        let min = rects.iter().map(KeyRect::width).min().unwrap();
        let max = rects.iter().map(KeyRect::width).max().unwrap();
        assert!(max - min <= 1);
    }

    #[test]
    fn strips_cover_width_without_gaps() {
        for num_keys in 1..=16 {
            for width in [16u32, 97, 320, 641, 1280] {
                let rects = partition(width, 480, num_keys, 0.25).unwrap();
                assert_tiles(&rects, width, num_keys);
                assert!(rects.iter().all(|r| r.y0 == 0 && r.y1 == 119));
            }
        }
    }

    #[test]
    fn right_edge_uses_integer_division() {
        let rects = partition(10, 10, 3, 0.5).unwrap();
        let edges: Vec<_> = rects.iter().map(|r| (r.x0, r.x1)).collect();
        assert_eq!(edges, vec![(0, 2), (3, 5), (6, 9)]);
    }

    #[test]
    fn degenerate_geometry_is_refused() {
        assert_eq!(partition(100, 100, 0, 0.25), Err(ConfigError::NoKeys));
        assert_eq!(
            partition(0, 100, 4, 0.25),
            Err(ConfigError::DegenerateFrame {
                width: 0,
                height: 100
            })
        );
        assert_eq!(
            partition(3, 100, 4, 0.25),
            Err(ConfigError::StripTooNarrow {
                num_keys: 4,
                width: 3
            })
        );
        assert_eq!(partition(100, 3, 4, 0.25), Err(ConfigError::EmptyStrip(0.25)));
    }

    #[test]
    fn label_raster_marks_each_region() {
        let rects = partition(10, 8, 3, 0.5).unwrap();
        let labels = LabelRaster::new(&rects);
        assert_eq!(labels.dimensions(), (10, 4));
        for y in 0..4 {
            for x in 0..10 {
                let owner = rects.iter().find(|r| r.contains(x, y)).unwrap();
                assert_eq!(labels.label_at(x, y), owner.index as u16 + 1);
            }
        }
    }

    #[test]
    fn layout_covers_all_three_scales() {
        let config = PipelineConfig {
            num_keys: 7,
            analysis_width: Some(320),
            display_width: Some(960),
            ..Default::default()
        };
        let layout = KeyLayout::new((640, 480), &config).unwrap();

        assert_eq!(layout.analysis_size, (320, 240));
        assert_eq!(layout.display_size, (960, 720));
        assert_tiles(&layout.analysis, 320, 7);
        assert_tiles(&layout.capture, 640, 7);
        assert_tiles(&layout.display, 960, 7);
        assert_eq!(layout.labels.dimensions(), (320, 60));
        assert_eq!(layout.strip_height(), 60);
    }
}
