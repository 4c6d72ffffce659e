//! Sunrise and sunset from the NOAA-style approximation of the sunrise
//! equation, plus the day-arc curve drawn under the clock.

use std::f64::consts::PI;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use thiserror::Error;

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const OBLIQUITY_DEG: f64 = 23.4397;
/// Solar disc radius plus standard refraction.
const HORIZON_DEG: f64 = -0.833;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SunError {
    #[error("sun never rises on this date (polar night)")]
    NeverRises,
    #[error("sun never sets on this date (midnight sun)")]
    NeverSets,
    #[error("computed time out of range")]
    InvalidTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: NaiveDateTime,
    pub noon: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

/// Sun events for `date` at the given coordinates, as wall-clock times in `tz`.
pub fn sun_times<Tz: TimeZone>(date: NaiveDate, lat: f64, lon: f64, tz: &Tz) -> Result<SunTimes, SunError> {
    let Some(epoch) = NaiveDate::from_ymd_opt(2000, 1, 1) else {
        return Err(SunError::InvalidTime);
    };
    let n = (date - epoch).num_days() as f64;
    let j_star = n - lon / 360.0;

    let m = (357.5291 + 0.985_600_28 * j_star).rem_euclid(360.0);
    let m_rad = m.to_radians();
    let c = 1.9148 * m_rad.sin() + 0.02 * (2.0 * m_rad).sin() + 0.0003 * (3.0 * m_rad).sin();
    let lambda = (m + c + 180.0 + 102.9372).rem_euclid(360.0);
    let lambda_rad = lambda.to_radians();

    let transit = J2000 + j_star + 0.0053 * m_rad.sin() - 0.0069 * (2.0 * lambda_rad).sin();

    let sin_decl = lambda_rad.sin() * OBLIQUITY_DEG.to_radians().sin();
    let cos_decl = sin_decl.asin().cos();
    let lat_rad = lat.to_radians();
    let cos_omega =
        (HORIZON_DEG.to_radians().sin() - lat_rad.sin() * sin_decl) / (lat_rad.cos() * cos_decl);

    if cos_omega > 1.0 {
        return Err(SunError::NeverRises);
    }
    if cos_omega < -1.0 {
        return Err(SunError::NeverSets);
    }
    let omega = cos_omega.acos().to_degrees();

    Ok(SunTimes {
        sunrise: julian_to_local(transit - omega / 360.0, tz)?,
        noon: julian_to_local(transit, tz)?,
        sunset: julian_to_local(transit + omega / 360.0, tz)?,
    })
}

fn julian_to_local<Tz: TimeZone>(jd: f64, tz: &Tz) -> Result<NaiveDateTime, SunError> {
    let unix = (jd - UNIX_EPOCH_JD) * 86_400.0;
    let secs = unix.floor();
    let nanos = ((unix - secs) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .map(|utc| utc.with_timezone(tz).naive_local())
        .ok_or(SunError::InvalidTime)
}

/// Position within the day as a fraction of 24 hours.
pub fn day_fraction(time: NaiveTime) -> f64 {
    let secs = time.num_seconds_from_midnight() as f64;
    (secs / 86_400.0).clamp(0.0, 1.0)
}

/// Offset of `at` from midnight starting `day`, as a fraction of 24 hours
/// clamped to that day.
pub fn fraction_of_day(day: NaiveDate, at: NaiveDateTime) -> f64 {
    let secs = (at - day.and_time(NaiveTime::MIN)).num_seconds() as f64;
    (secs / 86_400.0).clamp(0.0, 1.0)
}

/// Sunrise and sunset as day fractions, used to shape the arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayArc {
    pub sunrise: f64,
    pub sunset: f64,
}

impl DayArc {
    /// Arc for `day`. A sunrise before `day` starts or a sunset after it ends
    /// is pinned to that edge.
    pub fn from_times(times: &SunTimes, day: NaiveDate) -> Self {
        Self {
            sunrise: fraction_of_day(day, times.sunrise),
            sunset: fraction_of_day(day, times.sunset),
        }
    }

    pub fn is_day(&self, frac: f64) -> bool {
        frac >= self.sunrise && frac <= self.sunset
    }

    /// Height above the horizon at `frac`: a half sine between sunrise and
    /// sunset peaking at `arc_height / 2`, and shallow dips of at most
    /// `arc_height / 4` below it overnight.
    pub fn height(&self, frac: f64, arc_height: f64) -> f64 {
        let frac = frac.clamp(0.0, 1.0);
        if self.is_day(frac) {
            let span = self.sunset - self.sunrise;
            if span <= f64::EPSILON {
                return 0.0;
            }
            let p = (frac - self.sunrise) / span;
            (arc_height / 2.0) * (PI * p).sin()
        } else if frac < self.sunrise {
            let p = frac / self.sunrise;
            -(arc_height / 4.0) * (p * PI / 2.0).cos()
        } else {
            let night = 1.0 - self.sunset;
            if night <= f64::EPSILON {
                return 0.0;
            }
            let p = (frac - self.sunset) / night;
            -(arc_height / 4.0) * (p * PI / 2.0).sin()
        }
    }
}
