use image::{GenericImageView, Rgb};

/// Skin tone box in 8-bit HSV (hue in 0..180, saturation and value in 0..=255)
const HUE: (u8, u8) = (0, 20);
const SATURATION: (u8, u8) = (48, 255);
const VALUE: (u8, u8) = (80, 255);

/// Rejects strips whose motion came from shadows or lighting rather than a
/// finger by requiring some skin-coloured pixels.
pub struct SkinFilter {
    min_fraction: f32,
}

impl SkinFilter {
    pub fn new(min_fraction: f32) -> Self {
        Self { min_fraction }
    }

    /// Strictly more than `min_fraction` of the region must be skin-coloured;
    /// a region sitting exactly on the fraction is rejected.
    pub fn is_plausible<I>(&self, region: &I) -> bool
    where
        I: GenericImageView<Pixel = Rgb<u8>>,
    {
        skin_fraction(region) > self.min_fraction
    }
}

/// Fraction of skin-coloured pixels, 0 for an empty region
pub fn skin_fraction<I>(region: &I) -> f32
where
    I: GenericImageView<Pixel = Rgb<u8>>,
{
    let (width, height) = region.dimensions();
    let total = width as u64 * height as u64;
    if total == 0 {
        return 0.0;
    }
    let skin = region.pixels().filter(|(_, _, p)| is_skin(*p)).count();
    skin as f32 / total as f32
}

pub fn is_skin(pixel: Rgb<u8>) -> bool {
    let (h, s, v) = rgb_to_hsv(pixel);
    (HUE.0..=HUE.1).contains(&h)
        && (SATURATION.0..=SATURATION.1).contains(&s)
        && (VALUE.0..=VALUE.1).contains(&v)
}

/// Convert RGB to 8-bit HSV with hue halved to fit 0..180
fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> (u8, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = (max - min) as f32;

    let s = if max == 0 {
        0.0
    } else {
        diff * 255.0 / max as f32
    };

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut h = if diff == 0.0 {
        0.0
    } else if max as f32 == r {
        60.0 * (g - b) / diff
    } else if max as f32 == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = (h / 2.0).round() as u32 % 180;
    (h as u8, s.round() as u8, max)
}
