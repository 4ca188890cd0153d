//! # crhk-rs
//!
//! This crate records the live radio streams of
//! [881903.com](https://www.881903.com) on a schedule. It authenticates
//! against the CloudFront signed-cookie scheme the site uses, polls the
//! rolling segment playlist, downloads every new segment once and appends it
//! to one file per session.
//!
//! ## Usage
//!
//! A [`recorder::Recorder`] records one channel. It pulls segments from a
//! [`resolver::StreamSource`], which for the live site is
//! [`resolver::Resolver`]. The [`schedule`] module turns daily clock times
//! and a day-of-week mask into recording windows and drives the recorder
//! through them.
//!
//! ```no_run
//! use crhk_rs::{dayofweek::Mask, recorder, resolver, schedule, util};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create HttpClient, a wrapper around reqwest::Client but includes a
//!     // middleware for retrying transient errors
//!     let client = util::HttpClient::new().unwrap();
//!     let resolver = resolver::Resolver::new(client);
//!     let recorder = recorder::Recorder::new(resolver, "881", Default::default());
//!
//!     // Weekdays from 23:00 to 01:00 the next morning, Hong Kong time
//!     let mask = Mask::from_list("1,2,3,4,5").unwrap();
//!     let now = chrono::Utc::now().fixed_offset();
//!     let window =
//!         schedule::ScheduleWindow::new("23:00:00 +0800", "01:00:00 +0800", mask, true, now)
//!             .unwrap();
//!
//!     schedule::run(&recorder, window).await.unwrap();
//! }
//! ```
//!
//! Each session writes `<channel>_<start>.aac` into the recorder's output
//! directory, holding the raw segment payloads in playlist order.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod cloudfront;
pub mod dayofweek;
pub mod hls;
pub mod recorder;
pub mod resolver;
pub mod schedule;
pub mod stats;
pub mod url;
pub mod util;
pub mod worker;
