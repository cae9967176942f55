//! Generate a WWV-style time station audio signal.
//!
//! This application synthesizes the audio format of NIST's WWV shortwave station: second
//! ticks, standard tones, a 100 Hz time code sub-carrier, and a voice announcement of
//! each upcoming minute. One second of audio is produced per second of clock time.
//!
//! Output is raw PCM (32-bit float, little endian, mono, 44.1 kHz) on standard output,
//! or the default audio device when built with the `playback` feature and run with
//! `--device`. The program runs until interrupted; SIGINT exits cleanly with status 0.
//!
//! # Command Line Arguments
//!
//! | Short form | Long form         | Argument                | Default          | Description                            |
//! | ---------- | ----------------- | ----------------------- | ---------------- | -------------------------------------- |
//! | `-a`       | `--amplitude`     | dBFS (float)            | -6.0             | Output amplitude                       |
//! |            | `--announcements` | Directory               | `announcements`  | Voice clip directory                   |
//! | `-z`       | `--timezone`      | Filename or [TZ string] | New York         | Timezone for the DST bits              |
//! | `-t`       | `--time`          | [Date time string]      | Current time     | Replay from a fixed start time         |
//! | `-n`, `-c` | `--count`         | Integer > 0             | Unlimited        | Stop after this many minutes           |
//! |            | `--dut1`          | Integer (0.1 s units)   | 0                | UT1-UTC correction to signal           |
//! |            | `--lsw`           |                         | From leap table  | Force the leap second warning bit      |
//! |            | `--noise`         | dBFS (float)            | Off              | Mix shortwave-style static at this level |
//! |            | `--device`        |                         | Off              | Play on the default audio device       |
//!
//! The timezone defaults to `/usr/share/zoneinfo/America/New_York`, falling back to the
//! built-in rule `EST5EDT,M3.2.0,M11.1.0` when no tz database is installed. WWV encodes
//! its daylight savings bits against that zone.
//!
//! [TZ string]: https://www.gnu.org/software/libc/manual/html_node/TZ-Variable.html
//! [Date time string]: clock::parse_timestamp
//!
//! # Examples
//!
//! Stream the live signal to a file:
//! ```sh
//! wwvgen > wwv.f32
//! ```
//!
//! Render six deterministic minutes starting mid-minute:
//! ```sh
//! wwvgen -t "2017-08-15 10:04:30.500" -n 6 --dut1 3 > wwv.f32
//! ```
//!
//! Play on the default output device (requires the `playback` build feature):
//! ```sh
//! wwvgen --device --noise -45
//! ```

use audio::{Mixer, Source, SourceError, WhiteNoise};
use std::error::Error;
use std::io::{self, BufWriter, Write};
use std::num::NonZero;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use wwv::announce::WaveAnnouncer;
use wwv::{producer, Composer};

use args::{Arguments, ArgumentsError};
use clock::tz::{self, TzFileError};

mod args;

/// Output sample rate. The voice clips are recorded at this rate.
const SAMPLE_RATE: usize = 44100;
/// Announcer level relative to the rest of the program.
const ANNOUNCE_DBFS: f64 = -2.5;
/// Read size for the stdout sink: 10 ms of audio.
const CHUNK: usize = SAMPLE_RATE / 100;

/// The tz database entry WWV derives its DST bits from.
const NY_TZ_FILE: &str = "/usr/share/zoneinfo/America/New_York";
/// Fallback rule when no tz database is installed.
const NY_TZ_STRING: &[u8] = b"EST5EDT,M3.2.0,M11.1.0";

/// Set by the SIGINT handler; checked by the output loops.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_interrupt(_sig: libc::c_int) {
	INTERRUPTED.store(true, Ordering::SeqCst);
}

fn interrupted() -> bool {
	INTERRUPTED.load(Ordering::SeqCst)
}

/// Wire the producer, announcer, and composer into a single output source.
///
/// Voice clips load here, so a missing or unreadable clip aborts startup before any
/// audio is produced.
fn build_source(args: Arguments) -> Result<(Box<dyn Source + Send>, producer::Handle), Box<dyn Error>> {
	let timezone = match args.timezone {
		Some(tz) => tz,
		None => tz::parse_file(NY_TZ_FILE).or_else(|e| {
			if let TzFileError::FileReadError(_) = e {
				tz::parse_tzstring(NY_TZ_STRING).map_err(TzFileError::from)
			} else {
				Err(e)
			}
		})?,
	};

	let announcer = WaveAnnouncer::from_dir(&args.announcements, ANNOUNCE_DBFS, SAMPLE_RATE)?;

	let config = producer::Config {
		dut1: args.dut1,
		force_lsw: args.lsw,
		count: args.count.map(NonZero::get),
	};
	let (minutes, handle) = match args.time {
		Some(start) => producer::replay(start, timezone, config),
		None => producer::live(timezone, config),
	};

	let composer = Composer::new(minutes, announcer, args.amplitude, SAMPLE_RATE);
	let source: Box<dyn Source + Send> = match args.noise {
		Some(noise_dbfs) => Box::new(Mixer::new(
			0.0,
			vec![Box::new(composer), Box::new(WhiteNoise::new(noise_dbfs))],
		)),
		None => Box::new(composer),
	};

	Ok((source, handle))
}

/// Pump the source to stdout as raw little endian float PCM.
fn stream_to_stdout(mut source: Box<dyn Source + Send>) -> Result<(), String> {
	let stdout = io::stdout();
	let mut out = BufWriter::new(stdout.lock());
	let mut buf = vec![0f32; CHUNK];
	loop {
		if interrupted() {
			break;
		}
		let n = match source.read(&mut buf) {
			Ok(n) => n,
			Err(SourceError::Exhausted) => break,
			Err(e) => return Err(e.to_string()),
		};
		for v in &buf[..n] {
			out.write_all(&v.to_le_bytes()).map_err(|e| e.to_string())?;
		}
		if n < buf.len() {
			break;
		}
	}
	out.flush().map_err(|e| e.to_string())
}

#[cfg(feature = "playback")]
mod playback {
	use super::*;
	use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

	/// Play the source on the default audio output device until it ends or SIGINT.
	pub fn play(mut source: Box<dyn Source + Send>) -> Result<(), Box<dyn Error>> {
		let host = cpal::default_host();
		let device = host
			.default_output_device()
			.ok_or("Failed to get default audio output device")?;
		let config = cpal::StreamConfig {
			channels: 1,
			sample_rate: cpal::SampleRate(SAMPLE_RATE as u32),
			buffer_size: cpal::BufferSize::Default,
		};

		let (done_tx, done_rx) = mpsc::channel::<Result<(), String>>();
		let stream = device.build_output_stream(
			&config,
			move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match source.read(data) {
				Ok(n) if n == data.len() => (),
				Ok(n) => {
					data[n..].fill(0.0);
					let _ = done_tx.send(Ok(()));
				}
				Err(SourceError::Exhausted) => {
					data.fill(0.0);
					let _ = done_tx.send(Ok(()));
				}
				Err(e) => {
					data.fill(0.0);
					let _ = done_tx.send(Err(e.to_string()));
				}
			},
			|e| panic!("Error occurred on the stream: {}", e),
			None,
		)?;
		stream.play()?;

		loop {
			if interrupted() {
				eprintln!("Done");
				return Ok(());
			}
			match done_rx.recv_timeout(Duration::from_millis(100)) {
				Ok(result) => return result.map_err(Into::into),
				Err(mpsc::RecvTimeoutError::Timeout) => (),
				Err(mpsc::RecvTimeoutError::Disconnected) => {
					return Err("Audio stream stopped unexpectedly".into())
				}
			}
		}
	}
}

/// Build the signal chain and run the selected sink until it finishes or SIGINT fires.
fn run(args: Arguments) -> Result<(), Box<dyn Error>> {
	let device = args.device;
	let (source, _handle) = build_source(args)?;

	if device {
		#[cfg(feature = "playback")]
		return playback::play(source);
		#[cfg(not(feature = "playback"))]
		return Err("Built without playback support; rebuild with --features playback".into());
	}

	// Stream on a worker thread so SIGINT exits promptly even while the composer is
	// blocked waiting on the next minute
	let (done_tx, done_rx) = mpsc::channel();
	thread::spawn(move || {
		let _ = done_tx.send(stream_to_stdout(source));
	});
	loop {
		if interrupted() {
			eprintln!("Done");
			return Ok(());
		}
		match done_rx.recv_timeout(Duration::from_millis(100)) {
			Ok(result) => return result.map_err(Into::into),
			Err(mpsc::RecvTimeoutError::Timeout) => (),
			Err(mpsc::RecvTimeoutError::Disconnected) => {
				return Err("Audio thread exited unexpectedly".into())
			}
		}
	}
}

/// Main program entry point.
///
/// Parses input arguments and streams the time station signal. See [`crate`]
/// documentation for details.
fn main() -> ExitCode {
	let args = match Arguments::parse(std::env::args_os().skip(1)) {
		Ok(args) => args,
		Err(e) => {
			return if let ArgumentsError::Help = e {
				println!("\
Generate a WWV-style time station audio signal.

Usage: wwvgen [OPTIONS]

Options:
  -a, --amplitude <DBFS>    output amplitude, default -6.0
  --announcements <DIR>     voice clip directory, default \"announcements\"
  -z, --timezone <TZ>       TZif file or TZ string for the DST bits, default New York
  -t, --time <DATETIME>     replay from a fixed start time instead of the wall clock
  -n, -c, --count <COUNT>   stop after this many minutes, default unlimited
  --dut1 <TENTHS>           UT1-UTC in 0.1 s units, default 0
  --lsw                     force the leap second warning bit
  --noise <DBFS>            mix shortwave-style static at this level
  --device                  play on the default audio device (needs the playback feature)

Output is raw PCM, 32-bit float little endian, mono, 44.1 kHz, on stdout.

Examples:
  wwvgen > wwv.f32
  wwvgen -t \"2017-08-15 10:04:30.500\" -n 6 --dut1 3 > wwv.f32
  wwvgen -z \"EST5EDT,M3.2.0,M11.1.0\" -a -12 > wwv.f32\n");
				ExitCode::SUCCESS
			} else {
				eprintln!("{}", e);
				ExitCode::FAILURE
			}
		}
	};

	// Install the SIGINT handler before any audio starts
	let handler = handle_interrupt as extern "C" fn(libc::c_int);
	unsafe {
		libc::signal(libc::SIGINT, handler as libc::sighandler_t);
	}

	run(args)
		.map(|_| ExitCode::SUCCESS)
		.inspect_err(|e| eprintln!("{}", e))
		.unwrap_or(ExitCode::FAILURE)
}
