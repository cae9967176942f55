//! WWV time station signal synthesis.
//!
//! This crate turns wall-clock time into the audio format broadcast by NIST's WWV
//! shortwave station: a minute-mark tone, per-second ticks, standard audio tones, a
//! 100 Hz sub-carrier carrying a binary coded decimal time code, and a voice announcement
//! of the upcoming minute.
//!
//! The pieces, leaves first:
//!
//! - [`bcd`] encodes integer field values into weighted bit patterns.
//! - [`minute`] builds the full 61-second WWV time code for one UTC minute.
//! - [`announce`] assembles and plays the spoken time announcement.
//! - [`composer`] renders minutes into audio, one second at a time.
//! - [`producer`] feeds the composer freshly built minutes, live or replayed.
//!
//! A producer thread and the composer communicate over a bounded channel of [`Minute`]
//! values; the composer exposes the [`audio::Source`] pull interface to whatever sink
//! drives it.
//!
//! # Examples
//!
//! ```no_run
//! # use std::sync::mpsc::sync_channel;
//! # use audio::Source;
//! # use wwv::announce::WaveAnnouncer;
//! # use wwv::composer::Composer;
//! # use wwv::producer;
//! let tz = clock::tz::parse_file("/usr/share/zoneinfo/America/New_York").unwrap();
//! let announcer = WaveAnnouncer::from_dir("announcements".as_ref(), -2.5, 44100).unwrap();
//! let (minutes, _handle) = producer::live(tz, producer::Config::default());
//! let mut composer = Composer::new(minutes, announcer, -6.0, 44100);
//!
//! let mut buf = vec![0f32; 441];
//! while let Ok(n) = composer.read(&mut buf) {
//! 	// hand buf[..n] to the audio sink
//! }
//! ```

pub mod announce;
pub mod bcd;
pub mod composer;
pub mod minute;
pub mod producer;

pub use composer::Composer;
pub use minute::Minute;
