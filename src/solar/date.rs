use crate::core::constants::{
    DAYS_PER_YEAR, DIFFERENTIAL_ROTATION_DEG_PER_DAY, EQUATORIAL_ROTATION_DEG_PER_DAY,
    OBLIQUITY_DEGREES, SECONDS_PER_DAY, ZERO_OBLIQUITY_DATE,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt};

/// The UTC instant an observation was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageDate(NaiveDateTime);

impl ImageDate {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// Build a date from calendar fields. Returns `None` for impossible dates.
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, min, sec))
            .map(Self)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn seconds_since_midnight(&self) -> u32 {
        self.0.num_seconds_from_midnight()
    }

    /// Whole days between this date and the zero-tilt reference date of the
    /// same year. Time of day is ignored.
    fn days_since_zero_obliquity(&self) -> i64 {
        let (month, day) = ZERO_OBLIQUITY_DATE;
        match NaiveDate::from_ymd_opt(self.0.year(), month, day) {
            Some(reference) => (self.0.date() - reference).num_days(),
            None => 0,
        }
    }

    /// Tilt between the solar equator and the observation plane, in radians.
    ///
    /// Uses a fixed 365 day year.
    pub fn obliquity(&self) -> f64 {
        let phase = self.days_since_zero_obliquity() as f64 / DAYS_PER_YEAR * 2.0 * PI;
        OBLIQUITY_DEGREES.to_radians() * phase.sin()
    }

    /// Longitude a feature at `latitude` (radians) has rotated since 0:00 UTC
    /// on this day, in radians.
    pub fn rotation_delta_longitude(&self, latitude: f64) -> f64 {
        rotation_delta_longitude(latitude, self.seconds_since_midnight() as f64)
    }
}

/// Differential rotation correction for `seconds` after midnight.
pub fn rotation_delta_longitude(latitude: f64, seconds: f64) -> f64 {
    let rate = EQUATORIAL_ROTATION_DEG_PER_DAY - DIFFERENTIAL_ROTATION_DEG_PER_DAY * latitude.sin().powi(2);
    (seconds / SECONDS_PER_DAY * rate).to_radians()
}

impl fmt::Display for ImageDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

impl From<NaiveDateTime> for ImageDate {
    fn from(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }
}
