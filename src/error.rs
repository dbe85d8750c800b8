/// Construction-time configuration errors.
///
/// The pipeline refuses to start on any of these rather than partition a
/// degenerate raster or map keys that do not exist.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("number of keys must be at least 1")]
    NoKeys,

    #[error("frame geometry {width}x{height} is degenerate")]
    DegenerateFrame { width: u32, height: u32 },

    #[error("{num_keys} keys do not fit in a strip {width} pixels wide")]
    StripTooNarrow { num_keys: usize, width: u32 },

    #[error("key height {0} rounds to an empty strip")]
    EmptyStrip(f32),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("kernel fraction {0} is outside [0, 1]")]
    KernelFraction(f32),

    #[error("skin fraction {0} is outside [0, 1]")]
    SkinFraction(f32),

    #[error("pitch map has {notes} entries but there are {num_keys} keys")]
    ShortPitchMap { notes: usize, num_keys: usize },

    #[error("landmark strategy needs at least 10 keys, got {0}")]
    TooFewKeysForHands(usize),

    #[error("debounce window must be at least one frame")]
    EmptyDebounceWindow,
}
