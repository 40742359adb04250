//! Hourly time series for one calendar year.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Result, SimError};

/// Hours in a non-leap year; the fixed basis every returned series uses.
pub const HOURS_PER_YEAR: usize = 8760;
/// Hours in a leap year including Feb 29.
pub const HOURS_PER_LEAP_YEAR: usize = 8784;

/// Returns `true` for timestamps falling on Feb 29.
pub fn is_leap_day(ts: &NaiveDateTime) -> bool {
    ts.month() == 2 && ts.day() == 29
}

/// Zero-based hour of the year (0..8784).
pub fn hour_of_year(ts: &NaiveDateTime) -> u32 {
    ts.ordinal0() * 24 + ts.hour()
}

/// Hourly timestamps for `year`, optionally keeping the Feb 29 hours.
///
/// # Examples
///
/// ```
/// use res_storage_sim::sim::series::year_timestamps;
///
/// assert_eq!(year_timestamps(2023, true).unwrap().len(), 8760);
/// assert_eq!(year_timestamps(2024, true).unwrap().len(), 8784);
/// assert_eq!(year_timestamps(2024, false).unwrap().len(), 8760);
/// ```
pub fn year_timestamps(year: i32, keep_leap_day: bool) -> Result<Vec<NaiveDateTime>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SimError::Series(format!("year {year} is out of range")))?;
    let mut out = Vec::with_capacity(HOURS_PER_LEAP_YEAR);
    let mut ts = start;
    while ts.year() == year {
        if keep_leap_day || !is_leap_day(&ts) {
            out.push(ts);
        }
        ts += Duration::hours(1);
    }
    Ok(out)
}

/// Ordered `(timestamp, MWh)` pairs, one per hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl HourlySeries {
    /// Builds a series, checking lengths match and timestamps strictly increase.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(SimError::Series(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SimError::Series(format!(
                "timestamps must strictly increase: {} is followed by {}",
                w[0], w[1]
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(SimError::Series(format!(
                "non-finite value at {}",
                timestamps[i]
            )));
        }
        Ok(Self { timestamps, values })
    }

    /// Builds a full-year series from values alone. 8760 values skip Feb 29
    /// in a leap year; 8784 values keep it.
    pub fn for_year(year: i32, values: Vec<f64>) -> Result<Self> {
        let keep_leap_day = values.len() == HOURS_PER_LEAP_YEAR;
        let timestamps = year_timestamps(year, keep_leap_day)?;
        Self::new(timestamps, values)
    }

    pub fn constant(year: i32, value: f64, keep_leap_day: bool) -> Result<Self> {
        let timestamps = year_timestamps(year, keep_leap_day)?;
        let values = vec![value; timestamps.len()];
        Self::new(timestamps, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Fails unless `other` covers exactly the same hours.
    pub fn check_aligned(&self, other: &HourlySeries, label: &str) -> Result<()> {
        if self.timestamps != other.timestamps {
            let first_mismatch = self
                .timestamps
                .iter()
                .zip(&other.timestamps)
                .position(|(a, b)| a != b);
            return Err(SimError::Series(match first_mismatch {
                Some(i) => format!(
                    "{label} is not aligned with demand: {} vs {}",
                    other.timestamps[i], self.timestamps[i]
                ),
                None => format!(
                    "{label} has {} hours but demand has {}",
                    other.len(),
                    self.len()
                ),
            }));
        }
        Ok(())
    }

    /// Hour-by-hour sum of `self` and an aligned `other`.
    pub fn plus(&self, other: &HourlySeries) -> Result<HourlySeries> {
        self.check_aligned(other, "series")?;
        let values = self.values.iter().zip(&other.values).map(|(a, b)| a + b).collect();
        Ok(Self {
            timestamps: self.timestamps.clone(),
            values,
        })
    }

    /// Same hours, every value set to zero.
    pub fn zeros_like(&self) -> HourlySeries {
        Self {
            timestamps: self.timestamps.clone(),
            values: vec![0.0; self.len()],
        }
    }

    /// Hour-by-hour transform keeping timestamps.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> HourlySeries {
        Self {
            timestamps: self.timestamps.clone(),
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().zip(self.values.iter().copied())
    }
}
