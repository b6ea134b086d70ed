//! # Overview
//!
//! `flatmidi` decodes Standard Midi Files (SMF) into flat lists of fixed-width event records,
//! ready to be handed over to numeric code without any further unpacking.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use flatmidi::{Options, TimeUnit};
//!
//! # fn read_file() -> Vec<u8> {
//! #     vec![
//! #         b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0,
//! #         b'M', b'T', b'r', b'k', 0, 0, 0, 12,
//! #         0x00, 0x90, 60, 100, 0x83, 0x60, 0x80, 60, 0, 0x00, 0xFF, 0x2F,
//! #     ]
//! # }
//! let bytes = read_file();
//! let decoded = flatmidi::load(&bytes, &Options::default().time_unit(TimeUnit::Seconds)).unwrap();
//!
//! for track in decoded.seconds().unwrap().tracks.iter() {
//!     for ev in track.iter() {
//!         println!("{:?} on key {} after {}s", ev.kind, ev.key, ev.delta.as_f64());
//!     }
//! }
//! ```
//!
//! # Pipeline
//!
//! Decoding always produces an [`Smf<Ticks>`](struct.Smf.html), whose event times are MIDI ticks
//! relative to the previous event of the same track, along with the tempo map gathered from every
//! track.
//! From there, a number of consuming passes can be chained:
//!
//! - [`Smf::into_micros`](struct.Smf.html#method.into_micros) and
//!   [`Smf::into_seconds`](struct.Smf.html#method.into_seconds) rewrite tick deltas into real time,
//!   consuming the tempo map.
//! - [`Smf::merge_tracks`](struct.Smf.html#method.merge_tracks) interleaves all tracks into a
//!   single chronological track.
//! - [`Smf::compute_durations`](struct.Smf.html#method.compute_durations) stores the length of
//!   every note in its `NoteOn` event.
//! - [`Smf::remove_note_off`](struct.Smf.html#method.remove_note_off) drops `NoteOff` events
//!   without disturbing the timing of the remaining ones.
//!
//! The [`load`](fn.load.html) function runs the whole pipeline as configured by an
//! [`Options`](struct.Options.html) value.
//!
//! # About lifetimes
//!
//! Unlike most MIDI parsers, nothing returned by `flatmidi` borrows from the input buffer.
//! Events are plain `Copy` records, and the raw bytes can be dropped as soon as decoding returns.
//!
//! # About features
//!
//! - The `std` feature (enabled by default)
//!
//!   Implements `std::error::Error` for [`Error`](struct.Error.html).
//!   Disabling it makes the crate `no_std + alloc`.
//!
//! - The `parallel` feature (enabled by default)
//!
//!   Decodes the tracks of large files on multiple threads through `rayon`.
//!   The output, including which error is reported for a broken file, is identical to the
//!   single-threaded decoder.
//!
//! - The `strict` feature
//!
//!   By default `flatmidi` tolerates the kind of corruption found in real-world files: overlong
//!   variable-length integers are truncated, out-of-range velocities are clamped and short tempo
//!   messages are ignored.
//!   With `strict`, these raise errors of the kind `ErrorKind::Malformed` instead.
//!
//! - The `tracing` feature
//!
//!   Reports tolerated corruption and pipeline decisions through the `tracing` crate.
//!   Without it the decoder never logs anything.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// Forward to `tracing::warn!` when the `tracing` feature is enabled.
macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::warn!($($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}
/// Forward to `tracing::debug!` when the `tracing` feature is enabled.
macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::debug!($($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

/// All of the errors this crate produces.
#[macro_use]
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{ErrorKind, Result, ResultExt, StdResult},
        primitive::ByteCursor,
        time::{RealTime, Time},
    };
    pub(crate) use alloc::{vec, vec::Vec};
    pub(crate) use core::{cmp::Ordering, convert::TryFrom, fmt, mem, ops};
}

mod event;
mod filter;
mod merge;
mod options;
mod primitive;
mod riff;
mod smf;
mod tempo;
mod time;

pub use crate::{
    error::{Error, ErrorKind, Result},
    event::{Event, EventKind, TrackDecoder},
    options::{load, Decoded, Options},
    primitive::{ByteCursor, VarInt},
    smf::{Chunk, Format, Header, Smf, Track},
    tempo::{TempoChange, TempoMap, DEFAULT_MICROS_PER_BEAT},
    time::{Micros, RealTime, Seconds, Ticks, Time, TimeUnit},
};
