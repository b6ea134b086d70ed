//! Runtime configuration and the all-in-one `load` entry point.

use crate::{
    prelude::*,
    smf::{Header, Smf, Track},
    tempo::TempoMap,
    time::{Micros, Seconds, Ticks, TimeUnit},
};

/// What to decode and which passes to run on the decoded file.
///
/// Fields can be set directly or through the builder-style setters:
///
/// ```rust
/// use flatmidi::{Options, TimeUnit};
///
/// let options = Options::default()
///     .time_unit(TimeUnit::Ticks)
///     .notes_only(false)
///     .compute_durations(true);
/// assert!(options.merge_tracks);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Options {
    /// Interleave all tracks into one. Enabled by default.
    pub merge_tracks: bool,
    /// The unit of the decoded event times. Microseconds by default.
    pub time_unit: TimeUnit,
    /// Only emit `NoteOn` and `NoteOff` events. Enabled by default.
    pub notes_only: bool,
    /// Store the length of every note in its `NoteOn` event. Disabled by default.
    pub compute_durations: bool,
    /// Drop `NoteOff` events once everything else is done. Disabled by default.
    pub remove_note_off: bool,
    /// The program every channel starts with, before any program change. 0 by default.
    pub default_program: u8,
}
impl Default for Options {
    fn default() -> Options {
        Options {
            merge_tracks: true,
            time_unit: TimeUnit::Micros,
            notes_only: true,
            compute_durations: false,
            remove_note_off: false,
            default_program: 0,
        }
    }
}
impl Options {
    #[inline]
    pub fn merge_tracks(mut self, merge_tracks: bool) -> Options {
        self.merge_tracks = merge_tracks;
        self
    }

    #[inline]
    pub fn time_unit(mut self, time_unit: TimeUnit) -> Options {
        self.time_unit = time_unit;
        self
    }

    #[inline]
    pub fn notes_only(mut self, notes_only: bool) -> Options {
        self.notes_only = notes_only;
        self
    }

    #[inline]
    pub fn compute_durations(mut self, compute_durations: bool) -> Options {
        self.compute_durations = compute_durations;
        self
    }

    #[inline]
    pub fn remove_note_off(mut self, remove_note_off: bool) -> Options {
        self.remove_note_off = remove_note_off;
        self
    }

    /// Set the initial program of every channel. Values above 127 are clamped.
    #[inline]
    pub fn default_program(mut self, program: u8) -> Options {
        self.default_program = program.min(0x7F);
        self
    }
}

/// A decoded file, in whichever time unit was requested.
#[derive(Clone, PartialEq, Debug)]
pub enum Decoded {
    Ticks(Smf<Ticks>),
    Micros(Smf<Micros>),
    Seconds(Smf<Seconds>),
}
impl Decoded {
    #[inline]
    pub fn time_unit(&self) -> TimeUnit {
        match self {
            Decoded::Ticks(_) => TimeUnit::Ticks,
            Decoded::Micros(_) => TimeUnit::Micros,
            Decoded::Seconds(_) => TimeUnit::Seconds,
        }
    }

    #[inline]
    pub fn header(&self) -> &Header {
        match self {
            Decoded::Ticks(smf) => &smf.header,
            Decoded::Micros(smf) => &smf.header,
            Decoded::Seconds(smf) => &smf.header,
        }
    }

    #[inline]
    pub fn ticks_per_beat(&self) -> u16 {
        self.header().ticks_per_beat
    }

    /// The tempo map, which is only kept when no time conversion took place.
    #[inline]
    pub fn tempo_map(&self) -> Option<&TempoMap> {
        match self {
            Decoded::Ticks(smf) => smf.tempo_map.as_ref(),
            _ => None,
        }
    }

    #[inline]
    pub fn ticks(&self) -> Option<&Smf<Ticks>> {
        match self {
            Decoded::Ticks(smf) => Some(smf),
            _ => None,
        }
    }

    #[inline]
    pub fn micros(&self) -> Option<&Smf<Micros>> {
        match self {
            Decoded::Micros(smf) => Some(smf),
            _ => None,
        }
    }

    #[inline]
    pub fn seconds(&self) -> Option<&Smf<Seconds>> {
        match self {
            Decoded::Seconds(smf) => Some(smf),
            _ => None,
        }
    }

    pub fn track_count(&self) -> usize {
        match self {
            Decoded::Ticks(smf) => smf.tracks.len(),
            Decoded::Micros(smf) => smf.tracks.len(),
            Decoded::Seconds(smf) => smf.tracks.len(),
        }
    }

    pub fn event_count(&self) -> usize {
        match self {
            Decoded::Ticks(smf) => smf.event_count(),
            Decoded::Micros(smf) => smf.event_count(),
            Decoded::Seconds(smf) => smf.event_count(),
        }
    }

    /// The raw bytes of every track, as laid out by [`Track::as_bytes`](struct.Track.html#method.as_bytes).
    pub fn track_bytes(&self) -> Vec<&[u8]> {
        match self {
            Decoded::Ticks(smf) => smf.tracks.iter().map(Track::as_bytes).collect(),
            Decoded::Micros(smf) => smf.tracks.iter().map(Track::as_bytes).collect(),
            Decoded::Seconds(smf) => smf.tracks.iter().map(Track::as_bytes).collect(),
        }
    }
}

/// Decode a file and run the passes selected in `options` on it.
///
/// Passes run in a fixed order: time conversion, track merging, note durations and finally
/// `NoteOff` removal.
pub fn load(raw: &[u8], options: &Options) -> Result<Decoded> {
    let smf = Smf::parse_with(raw, options)?;
    debug!(
        "decoded {} tracks with {} events",
        smf.tracks.len(),
        smf.event_count()
    );
    Ok(match options.time_unit {
        TimeUnit::Ticks => Decoded::Ticks(finish(smf, options)),
        TimeUnit::Micros => Decoded::Micros(finish(smf.into_micros(), options)),
        TimeUnit::Seconds => Decoded::Seconds(finish(smf.into_seconds(), options)),
    })
}

fn finish<T: Time>(mut smf: Smf<T>, options: &Options) -> Smf<T> {
    if options.merge_tracks {
        smf = smf.merge_tracks();
    }
    if options.compute_durations {
        smf = smf.compute_durations();
    }
    if options.remove_note_off {
        smf = smf.remove_note_off();
    }
    smf
}
