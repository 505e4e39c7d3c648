//! Length measurements and their display formatting

const METERS_PER_MILE: f64 = 1609.344;
const METERS_PER_FOOT: f64 = 0.3048;

/// A non-negative length
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Length {
    meters: f64,
}

impl Length {
    pub const fn zero() -> Self {
        Self { meters: 0.0 }
    }

    /// Negative and non-finite inputs collapse to zero
    pub fn from_meters(meters: f64) -> Self {
        if meters.is_finite() && meters > 0.0 {
            Self { meters }
        } else {
            Self::zero()
        }
    }

    pub fn from_kilometers(kilometers: f64) -> Self {
        Self::from_meters(kilometers * 1000.0)
    }

    #[inline]
    pub fn meters(&self) -> f64 {
        self.meters
    }

    #[inline]
    pub fn kilometers(&self) -> f64 {
        self.meters / 1000.0
    }

    #[inline]
    pub fn miles(&self) -> f64 {
        self.meters / METERS_PER_MILE
    }

    #[inline]
    pub fn feet(&self) -> f64 {
        self.meters / METERS_PER_FOOT
    }
}

impl std::ops::Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length::from_meters(self.meters + rhs.meters)
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Length>>(iter: I) -> Length {
        iter.fold(Length::zero(), |acc, l| acc + l)
    }
}

/// Measurement system used when displaying lengths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Pick the unit system for a POSIX/BCP47 locale tag such as
    /// `en_US.UTF-8` or `en-US`. Only the region matters.
    pub fn from_locale(locale: &str) -> Self {
        let tag = locale.split(['.', '@']).next().unwrap_or_default();
        let region = tag.rsplit(['_', '-']).next().unwrap_or_default();
        if tag.len() == region.len() {
            // No region part
            return Self::Metric;
        }
        match region.to_ascii_uppercase().as_str() {
            "US" | "LR" | "MM" => Self::Imperial,
            _ => Self::Metric,
        }
    }
}

/// Formats lengths for people, switching units by magnitude
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LengthFormatter {
    pub units: UnitSystem,
}

impl LengthFormatter {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn format(&self, length: Length) -> String {
        match self.units {
            UnitSystem::Metric => {
                let km = length.kilometers();
                if km < 1.0 {
                    format!("{:.0} m", length.meters())
                } else if km < 100.0 {
                    format!("{:.2} km", km)
                } else {
                    format!("{} km", format_number_with_commas(km.round() as u64))
                }
            }
            UnitSystem::Imperial => {
                let mi = length.miles();
                if mi < 0.1 {
                    format!("{:.0} ft", length.feet())
                } else if mi < 100.0 {
                    format!("{:.2} mi", mi)
                } else {
                    format!("{} mi", format_number_with_commas(mi.round() as u64))
                }
            }
        }
    }
}

/// Helper to format numbers with comma separators
fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
