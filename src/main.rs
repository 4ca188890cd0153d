use std::path::PathBuf;

use chrono::{Datelike, Local};
use clap::Parser;
use crhk_rs::{
    dayofweek::{Mask, ParseMaskError},
    recorder::{Recorder, RecorderConfig},
    resolver::Resolver,
    schedule::{self, ScheduleError, ScheduleWindow},
    util,
};
use log::{error, info};
use regex::Regex;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Channel name in abbreviation
    #[arg(short, long, default_value = "881")]
    channel: String,

    /// Start time with timezone offset, e.g. "23:00:00 +0800"
    #[arg(short, long)]
    start: Option<String>,

    /// End time with timezone offset; overrides the duration
    #[arg(short, long)]
    end: Option<String>,

    /// Record duration, e.g. "1h30m" [must be under 24 hours]
    #[arg(short, long, value_parser = parse_duration)]
    duration: Option<chrono::Duration>,

    /// Day of week on scheduled recording [comma separated] [Sunday=0]
    #[arg(short, long, default_value = "1,2,3,4,5")]
    weekdays: String,

    /// Repeat recording at scheduled time on next day
    #[arg(short, long)]
    repeat: bool,

    /// Directory the recordings are written to
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("record time value must be provided")]
    MissingTime,
    #[error("record time cannot be infinite")]
    NoEnd,
    #[error("{0}")]
    Mask(#[from] ParseMaskError),
    #[error("{0}")]
    Schedule(#[from] ScheduleError),
    #[error("could not create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

fn parse_duration(s: &str) -> Result<chrono::Duration, String> {
    let re = Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").map_err(|e| e.to_string())?;
    let caps = re
        .captures(s.trim())
        .filter(|_| !s.trim().is_empty())
        .ok_or_else(|| format!("invalid duration [{}], expected e.g. 1h30m", s))?;

    let part = |i: usize| -> Result<i64, String> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>())
            .map_err(|e| e.to_string())
    };

    Ok(chrono::Duration::hours(part(1)?)
        + chrono::Duration::minutes(part(2)?)
        + chrono::Duration::seconds(part(3)?))
}

fn window(args: &Args) -> Result<ScheduleWindow, CliError> {
    if args.duration.is_none() && args.start.is_none() && args.end.is_none() {
        return Err(CliError::MissingTime);
    }

    let now = Local::now().fixed_offset();

    // A few seconds ahead so the first segment isn't skipped
    let start = match &args.start {
        Some(start) => start.clone(),
        None => (now + chrono::Duration::seconds(3))
            .format("%H:%M:%S %z")
            .to_string(),
    };

    let end = match (&args.end, args.duration) {
        (Some(end), _) => end.clone(),
        (None, Some(duration)) => schedule::clock_after(&start, duration)?,
        (None, None) => return Err(CliError::NoEnd),
    };

    let mask = if !args.weekdays.trim().is_empty() {
        Mask::from_list(&args.weekdays)?
    } else if !args.repeat {
        // Just now, just once
        let (_, offset) = schedule::parse_clock(&start)?;
        let mut mask = Mask::new();
        mask.enable(now.with_timezone(&offset).weekday());
        mask
    } else {
        Mask::new()
    };

    Ok(ScheduleWindow::new(&start, &end, mask, args.repeat, now)?)
}

async fn run(args: Args) -> Result<(), CliError> {
    let window = window(&args)?;
    info!(
        "Recording channel {} from {} to {}{}",
        args.channel,
        window.start,
        window.end,
        if window.recur { ", repeating" } else { "" }
    );

    let client = util::HttpClient::new()?;
    let config = RecorderConfig {
        outdir: args.outdir,
        ..Default::default()
    };
    let recorder = Recorder::new(Resolver::new(client), &args.channel, config);

    schedule::run(&recorder, window).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cli: &[&str]) -> Args {
        Args::parse_from(std::iter::once("crhk-rs").chain(cli.iter().copied()))
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), chrono::Duration::minutes(90));
        assert_eq!(parse_duration("45m").unwrap(), chrono::Duration::minutes(45));
        assert_eq!(parse_duration("90s").unwrap(), chrono::Duration::seconds(90));
        assert_eq!(
            parse_duration("2h0m5s").unwrap(),
            chrono::Duration::seconds(2 * 3600 + 5)
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("m30").is_err());
    }

    #[test]
    fn needs_some_time() {
        assert!(matches!(window(&args(&[])), Err(CliError::MissingTime)));
        assert!(matches!(
            window(&args(&["-s", "23:00:00 +0800"])),
            Err(CliError::NoEnd)
        ));
    }

    #[test]
    fn end_overrides_duration() {
        let w = window(&args(&[
            "-s",
            "23:00:00 +0800",
            "-e",
            "23:30:00 +0800",
            "-d",
            "2h",
        ]))
        .unwrap();
        assert_eq!(w.duration(), chrono::Duration::minutes(30));
    }

    #[test]
    fn duration_sets_end() {
        let w = window(&args(&["-s", "23:00:00 +0800", "-d", "2h", "-w", "", "-r"])).unwrap();
        assert_eq!(w.duration(), chrono::Duration::hours(2));
        assert!(w.mask.all_enabled());
        assert!(w.recur);
    }

    #[test]
    fn bad_weekdays() {
        assert!(matches!(
            window(&args(&["-s", "23:00:00 +0800", "-d", "1h", "-w", "1,8"])),
            Err(CliError::Mask(_))
        ));
    }
}
