use chrono::Weekday;

const ALL_DAYS: u8 = 0b0111_1111;

/// Day-of-week recurrence filter. Bits 0-6 map Sunday..Saturday.
///
/// An empty mask means every day: a caller who never picked a day wants the
/// recording to run daily, not never.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mask(u8);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseMaskError {
    #[error("incorrect day of week parameter [{0}]")]
    InvalidDay(String),
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_sunday()
}

fn from_sunday(n: u8) -> Weekday {
    (0..n).fold(Weekday::Sun, |day, _| day.succ())
}

impl Mask {
    pub fn new() -> Self {
        Self(0)
    }

    /// Parses a comma separated list of weekday numbers, Sunday being 0.
    pub fn from_list(list: &str) -> Result<Self, ParseMaskError> {
        let mut mask = Self::new();
        for day in list.split(',').map(str::trim) {
            let n = day
                .parse::<u8>()
                .ok()
                .filter(|d| *d <= 6)
                .ok_or_else(|| ParseMaskError::InvalidDay(list.to_string()))?;
            mask.enable(from_sunday(n));
        }
        Ok(mask)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn enable(&mut self, day: Weekday) {
        self.0 |= bit(day);
    }

    pub fn enable_all(&mut self) {
        self.0 = ALL_DAYS;
    }

    pub fn enabled(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn all_enabled(&self) -> bool {
        self.0 == 0 || self.0 == ALL_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    #[test]
    fn enable() {
        let mut m = Mask::new();
        m.enable(Weekday::Wed);
        m.enable(Weekday::Sat);
        assert_eq!(m.bits(), 0b0100_1000);

        m.enable(Weekday::Sat);
        assert_eq!(m.bits(), 0b0100_1000, "enable is not idempotent");
    }

    #[test]
    fn enable_keeps_other_days() {
        for day in WEEK {
            let mut m = Mask::new();
            m.enable(Weekday::Mon);
            m.enable(day);
            for other in WEEK {
                let expected = other == day || other == Weekday::Mon;
                assert_eq!(m.enabled(other), expected, "{} after enabling {}", other, day);
            }
        }
    }

    #[test]
    fn enable_all() {
        let mut m = Mask::new();
        m.enable_all();
        assert_eq!(m.bits(), 0b0111_1111);
        assert!(WEEK.iter().all(|d| m.enabled(*d)));
    }

    #[test]
    fn all_enabled() {
        let mut m = Mask::new();
        assert!(m.all_enabled(), "empty mask should be a wildcard");

        m.enable(Weekday::Mon);
        assert!(!m.all_enabled());

        for day in WEEK {
            m.enable(day);
        }
        assert!(m.all_enabled());
    }

    #[test]
    fn all_enabled_every_value() {
        for v in 0..=u8::MAX {
            assert_eq!(Mask(v).all_enabled(), v == 0 || v == 0b0111_1111, "mask {:#010b}", v);
        }
    }

    #[test]
    fn from_list() {
        let m = Mask::from_list("1, 2,3,4 ,5").unwrap();
        assert_eq!(m.bits(), 0b0011_1110);
        assert!(!m.enabled(Weekday::Sun));
        assert!(!m.enabled(Weekday::Sat));

        assert_eq!(Mask::from_list("0").unwrap().bits(), 0b0000_0001);
        assert_eq!(Mask::from_list("6").unwrap().bits(), 0b0100_0000);
    }

    #[test]
    fn from_list_rejects_garbage() {
        for list in ["7", "-1", "mon", "1,,2", ""] {
            assert_eq!(
                Mask::from_list(list),
                Err(ParseMaskError::InvalidDay(list.to_string())),
                "{:?} should be rejected",
                list
            );
        }
    }
}
