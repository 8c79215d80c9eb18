use itertools::Itertools;
use log::info;
use std::fmt::Display;

use crate::{
    components::raster::Grid,
    errors::{InputDataError, Result},
};

/// Burn severity categories, by class code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SeverityClass {
    NoData = 1,
    Unburned = 2,
    Low = 3,
    ModerateLow = 4,
    ModerateHigh = 5,
    High = 6,
}

impl SeverityClass {
    pub const ALL: [Self; 6] = [
        Self::NoData,
        Self::Unburned,
        Self::Low,
        Self::ModerateLow,
        Self::ModerateHigh,
        Self::High,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.code() == code)
    }

    /// Legend label.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoData => "None",
            Self::Unburned => "Unburned",
            Self::Low => "Low severity",
            Self::ModerateLow => "Moderate low severity",
            Self::ModerateHigh => "Moderate high severity",
            Self::High => "High severity",
        }
    }

    /// Map colour, rgb.
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::NoData => [0xFF, 0xFF, 0xFF],
            Self::Unburned => [0x00, 0xFF, 0x00],
            Self::Low => [0xFF, 0xFF, 0x00],
            Self::ModerateLow => [0xFF, 0x90, 0x00],
            Self::ModerateHigh => [0xFF, 0x4D, 0x00],
            Self::High => [0xFF, 0x00, 0xFF],
        }
    }

    /// Low severity or worse.
    pub fn is_burnt(self) -> bool {
        self >= Self::Low
    }
}

impl Display for SeverityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower bound of the unburned class.
pub const UNBURNED_MIN: f32 = -0.5;
/// Upper bound of the low severity class, and of the operator threshold.
pub const LOW_MAX: f32 = 0.269;
pub const MODERATE_LOW_MIN: f32 = 0.270;
pub const MODERATE_LOW_MAX: f32 = 0.439;
pub const MODERATE_HIGH_MIN: f32 = 0.440;
pub const MODERATE_HIGH_MAX: f32 = 0.659;
pub const HIGH_MIN: f32 = 0.660;
pub const HIGH_MAX: f32 = 1.300;

/// Maps `[min, max)` to `class`; the last entry of a table is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReclassEntry {
    pub min: f32,
    pub max: f32,
    pub class: SeverityClass,
}

/// Relativized burn ratio breakpoints for an operator threshold.
///
/// A value takes the class of the last entry whose `min` it reaches, so
/// values between two entries fall in the lower class, values under the
/// unburned range are unburned and values over the high range are high.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityTable {
    threshold: f32,
    entries: [ReclassEntry; 5],
}

impl SeverityTable {
    /// Fails unless `-0.5 < threshold < 0.269`, which keeps the unburned
    /// and low severity ranges non-empty and ordered.
    pub fn new(threshold: f64) -> Result<Self> {
        let narrowed = threshold as f32;
        if !threshold.is_finite() || narrowed <= UNBURNED_MIN || narrowed >= LOW_MAX {
            Err(InputDataError::InvalidThreshold(threshold))?
        }
        let entry = |min, max, class| ReclassEntry { min, max, class };
        Ok(Self {
            threshold: narrowed,
            entries: [
                entry(UNBURNED_MIN, narrowed, SeverityClass::Unburned),
                entry(narrowed, LOW_MAX, SeverityClass::Low),
                entry(MODERATE_LOW_MIN, MODERATE_LOW_MAX, SeverityClass::ModerateLow),
                entry(MODERATE_HIGH_MIN, MODERATE_HIGH_MAX, SeverityClass::ModerateHigh),
                entry(HIGH_MIN, HIGH_MAX, SeverityClass::High),
            ],
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn entries(&self) -> &[ReclassEntry] {
        &self.entries
    }

    pub fn classify(&self, value: f32) -> SeverityClass {
        if value.is_nan() {
            return SeverityClass::NoData;
        }
        self.entries
            .iter()
            .rev()
            .find(|entry| value >= entry.min)
            .map_or(SeverityClass::Unburned, |entry| entry.class)
    }

    /// Class codes of every cell of `rbr`.
    pub fn reclassify(&self, rbr: &Grid<f32>) -> Grid<u8> {
        let classes = rbr.map(|&value| self.classify(value).code());
        info!("{}", ClassCounts::from_grid(&classes));
        classes
    }
}

/// Binary footprint raster value of burnt cells; everything else is 0 (no-data).
pub const BURNT: u8 = 1;

/// Collapses class codes to [BURNT] for low severity or worse, 0 otherwise.
pub fn burnt_mask(classes: &Grid<u8>) -> Grid<u8> {
    classes.map(|&code| {
        if SeverityClass::from_code(code).is_some_and(SeverityClass::is_burnt) {
            BURNT
        } else {
            0
        }
    })
}

/// Cells per severity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassCounts([usize; 6]);

impl ClassCounts {
    pub fn from_grid(classes: &Grid<u8>) -> Self {
        let mut counts = [0; 6];
        for class in classes.data().iter().filter_map(|&code| SeverityClass::from_code(code)) {
            counts[class.code() as usize - 1] += 1;
        }
        Self(counts)
    }

    pub fn get(&self, class: SeverityClass) -> usize {
        self.0[class.code() as usize - 1]
    }

    /// Cells of low severity or worse.
    pub fn burnt(&self) -> usize {
        SeverityClass::ALL
            .into_iter()
            .filter(|class| class.is_burnt())
            .map(|class| self.get(class))
            .sum()
    }
}

impl Display for ClassCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = SeverityClass::ALL
            .into_iter()
            .map(|class| format!("{}: {}", class.label(), self.get(class)))
            .join(", ");
        write!(f, "class counts: {counts}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::transforms::GeoTransform, errors::BurnscarError};
    use ndarray::array;
    use rstest::rstest;

    fn table() -> SeverityTable {
        SeverityTable::new(0.1).unwrap()
    }

    #[rstest]
    #[case(f32::NAN, SeverityClass::NoData)]
    #[case(-3., SeverityClass::Unburned)]
    #[case(-0.5, SeverityClass::Unburned)]
    #[case(0.099, SeverityClass::Unburned)]
    #[case(0.1, SeverityClass::Low)]
    #[case(0.2689, SeverityClass::Low)]
    #[case(0.269, SeverityClass::Low)]
    #[case(0.2695, SeverityClass::Low)]
    #[case(0.270, SeverityClass::ModerateLow)]
    #[case(0.439, SeverityClass::ModerateLow)]
    #[case(0.4395, SeverityClass::ModerateLow)]
    #[case(0.440, SeverityClass::ModerateHigh)]
    #[case(0.659, SeverityClass::ModerateHigh)]
    #[case(0.660, SeverityClass::High)]
    #[case(1.300, SeverityClass::High)]
    #[case(2., SeverityClass::High)]
    fn breakpoints(#[case] value: f32, #[case] expected: SeverityClass) {
        assert_eq!(table().classify(value), expected);
    }

    #[rstest]
    #[case(0.269)]
    #[case(0.3)]
    #[case(-0.5)]
    #[case(-0.7)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_thresholds_that_break_the_table(#[case] threshold: f64) {
        assert!(matches!(
            SeverityTable::new(threshold),
            Err(BurnscarError::InputData(InputDataError::InvalidThreshold(_)))
        ));
    }

    #[rstest]
    #[case(-0.499)]
    #[case(0.)]
    #[case(0.1)]
    #[case(0.2689)]
    fn classification_is_monotonic(#[case] threshold: f64) {
        let table = SeverityTable::new(threshold).unwrap();
        let classes = (-700..=1500)
            .map(|step| table.classify(step as f32 / 1000.))
            .collect::<Vec<_>>();
        assert!(classes.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(classes.first(), Some(&SeverityClass::Unburned));
        assert_eq!(classes.last(), Some(&SeverityClass::High));
    }

    #[rstest]
    fn entries_are_ordered_and_disjoint() {
        let table = SeverityTable::new(0.2).unwrap();
        assert!(table
            .entries()
            .windows(2)
            .all(|pair| pair[0].min < pair[0].max && pair[0].max <= pair[1].min));
        assert_eq!(table.threshold(), 0.2);
    }

    #[rstest]
    fn reclassifies_and_collapses() {
        let rbr = Grid::new(
            array![[f32::NAN, -0.2, 0.15], [0.3, 0.5, 0.9]],
            GeoTransform::new(0., 20., 10., -10.),
        );
        let classes = table().reclassify(&rbr);
        assert_eq!(classes.data(), array![[1u8, 2, 3], [4, 5, 6]]);
        assert!(classes.same_grid(&rbr));

        let burnt = burnt_mask(&classes);
        assert_eq!(burnt.data(), array![[0u8, 0, 1], [1, 1, 1]]);

        let counts = ClassCounts::from_grid(&classes);
        assert_eq!(counts.get(SeverityClass::NoData), 1);
        assert_eq!(counts.burnt(), 4);
    }

    #[rstest]
    fn class_metadata() {
        assert_eq!(SeverityClass::from_code(4), Some(SeverityClass::ModerateLow));
        assert_eq!(SeverityClass::from_code(0), None);
        assert_eq!(SeverityClass::High.color(), [255, 0, 255]);
        assert_eq!(SeverityClass::ModerateHigh.to_string(), "Moderate high severity");
    }
}
