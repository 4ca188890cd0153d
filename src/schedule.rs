use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};

use crate::{
    dayofweek::Mask,
    recorder::{RecordError, SessionRunner},
    util::until,
};

const CLOCK_FORMATS: [&str; 2] = ["%H:%M:%S %z", "%H:%M %z"];

/// Gaps longer than this are slept through in one go, waking up
/// `FINAL_APPROACH` before the session starts.
const LONG_WAIT: Duration = Duration::from_secs(60);
const FINAL_APPROACH: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    #[error("incorrect clock time [{0}], expected e.g. \"23:00:00 +0800\"")]
    InvalidClock(String),
    #[error("schedule start {start} is after its end {end}")]
    InvalidWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    #[error("record duration {0} must be positive and under 24 hours")]
    InvalidDuration(chrono::Duration),
    #[error("recording session failed: {0}")]
    Session(#[from] RecordError),
}

/// Parses a clock time with an explicit offset, like `23:00:00 +0800`.
pub fn parse_clock(clock: &str) -> Result<(NaiveTime, FixedOffset), ScheduleError> {
    let clock = clock.trim();
    for fmt in CLOCK_FORMATS {
        let parsed = DateTime::parse_from_str(
            &format!("1970-01-01 {}", clock),
            &format!("%Y-%m-%d {}", fmt),
        );
        if let Ok(dt) = parsed {
            return Ok((dt.time(), *dt.offset()));
        }
    }
    Err(ScheduleError::InvalidClock(clock.to_string()))
}

/// The clock time `duration` after `clock`, in the same offset. Used to turn
/// a start time and a recording length into an end time.
pub fn clock_after(clock: &str, duration: chrono::Duration) -> Result<String, ScheduleError> {
    if duration <= chrono::Duration::zero() || duration >= chrono::Duration::days(1) {
        return Err(ScheduleError::InvalidDuration(duration));
    }

    let (time, offset) = parse_clock(clock)?;
    let (end, _) = time.overflowing_add_signed(duration);
    Ok(on_date(NaiveDate::default(), end, offset)?.format("%H:%M:%S %z").to_string())
}

fn on_date(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, ScheduleError> {
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| ScheduleError::InvalidClock(format!("{} {}", time, offset)))
}

/// One recording window. Each recurrence produces a new value rather than
/// mutating the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub mask: Mask,
    pub recur: bool,
}

impl ScheduleWindow {
    /// Computes the first qualifying window from daily clock times.
    ///
    /// Both times are placed on today's date as seen from the start time's
    /// offset. An end earlier than the start falls on the following day, so
    /// `23:00` to `01:00` is a two hour window across midnight. The window
    /// then moves forward to the first enabled weekday, and if it has already
    /// started by `now` it moves to the next day instead.
    pub fn new(
        start_clock: &str,
        end_clock: &str,
        mask: Mask,
        recur: bool,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, ScheduleError> {
        let (start_time, start_offset) = parse_clock(start_clock)?;
        let (end_time, end_offset) = parse_clock(end_clock)?;

        let today = now.with_timezone(&start_offset).date_naive();
        let start = on_date(today, start_time, start_offset)?;
        let mut end = on_date(today, end_time, end_offset)?;
        if end < start {
            end += chrono::Duration::days(1);
        }

        let mut window = Self {
            start,
            end,
            mask,
            recur,
        }
        .aligned();
        if window.start < now {
            window = window.shifted().aligned();
        }

        Ok(window)
    }

    pub fn from_instants(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        mask: Mask,
        recur: bool,
    ) -> Result<Self, ScheduleError> {
        if start > end {
            return Err(ScheduleError::InvalidWindow { start, end });
        }
        Ok(Self {
            start,
            end,
            mask,
            recur,
        })
    }

    /// The window of the next recurrence, on the next enabled weekday.
    pub fn next(&self) -> Self {
        self.shifted().aligned()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    fn shifted(&self) -> Self {
        Self {
            start: self.start + chrono::Duration::days(1),
            end: self.end + chrono::Duration::days(1),
            ..*self
        }
    }

    fn aligned(self) -> Self {
        if self.mask.all_enabled() {
            return self;
        }

        let mut window = self;
        for _ in 0..7 {
            if window.mask.enabled(window.start.weekday()) {
                break;
            }
            window = window.shifted();
        }
        window
    }
}

async fn wait_for(start: &DateTime<FixedOffset>) {
    let remaining = until(start);
    if remaining > LONG_WAIT {
        info!("Waiting until {} to start recording", start);
        tokio::time::sleep(remaining - FINAL_APPROACH).await;
    }
}

/// Runs sessions for `window` and, when it recurs, every following window.
/// Returns after a single session unless the window recurs; any session
/// error stops the schedule.
pub async fn run<R>(runner: &R, window: ScheduleWindow) -> Result<(), ScheduleError>
where
    R: SessionRunner + ?Sized,
{
    let mut window = window;
    loop {
        wait_for(&window.start).await;

        info!(
            "Session {} - {} ({} minutes)",
            window.start,
            window.end,
            window.duration().num_minutes()
        );
        let stats = runner.run_session(window.start, window.end).await?;
        debug!("Session finished with {}", stats.summary());

        if !window.recur {
            return Ok(());
        }
        window = window.next();
    }
}
