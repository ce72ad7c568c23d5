//! Core constants taken from the solar viewer's defaults.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Default lowest zoom level a viewport accepts without `force`.
pub const DEFAULT_MIN_ZOOM_LEVEL: i32 = 0;

/// Default highest zoom level a viewport accepts without `force`.
pub const DEFAULT_MAX_ZOOM_LEVEL: i32 = 10;

/// Only every n-th pointer move of a drag is applied to the grid.
pub const DEFAULT_MOVE_THROTTLE: u32 = 2;

/// Upper end of the band in which `asin`/`acos` inputs slightly above 1.0
/// are treated as rounding noise and clamped.
pub const ASIN_PRECISION_THRESHOLD: f64 = 1.000_000_000_000_003;

/// Maximum tilt between the solar equator and the ecliptic, in degrees.
pub const OBLIQUITY_DEGREES: f64 = 7.25;

/// Day of the year (month, day) at which the tilt crosses zero.
pub const ZERO_OBLIQUITY_DATE: (u32, u32) = (7, 7);

/// Leap years are ignored on purpose.
pub const DAYS_PER_YEAR: f64 = 365.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Sidereal rotation rate at the solar equator, degrees per day.
pub const EQUATORIAL_ROTATION_DEG_PER_DAY: f64 = 14.44;

/// Latitude dependent slowdown, degrees per day times sin²(latitude).
pub const DIFFERENTIAL_ROTATION_DEG_PER_DAY: f64 = 3.0;

/// Default center of the solar disk in normalized image coordinates.
pub const DEFAULT_SUN_CENTER: (f64, f64) = (0.5, 0.5);

/// Deepest quad-tree level a tile query can address with i64 indices.
pub const MAX_QUERY_DEPTH: u32 = 62;
