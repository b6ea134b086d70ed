//! Specific to the SMF packaging of MIDI streams.

use crate::{
    event::{Event, TrackDecoder},
    filter, merge,
    options::Options,
    prelude::*,
    riff,
    tempo::{self, TempoMap},
    time::{Micros, Seconds, Ticks},
};

/// How many bytes must a MIDI body have in order to enable multithreading.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// A raw chunk: a 4-byte tag and the payload it announces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: [u8; 4],
    pub data: &'a [u8],
}
impl<'a> Chunk<'a> {
    /// Read a chunk that must carry the `expected` tag, advancing the cursor past it.
    ///
    /// Chunks with other tags are an error, they are never skipped.
    pub fn read(raw: &mut ByteCursor<'a>, expected: &[u8; 4]) -> Result<Chunk<'a>> {
        let tag = raw.take(4).context("reading chunk tag")?;
        let tag = [tag[0], tag[1], tag[2], tag[3]];
        ensure!(
            &tag == expected,
            ErrorKind::UnexpectedChunkType {
                expected: *expected,
                found: tag,
            }
        );
        let len = raw.read_u32().context("reading chunk length")?;
        let data = raw.take(len as usize).context("reading chunk data")?;
        Ok(Chunk { tag, data })
    }
}

/// The different formats an SMF file can be.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// A single track.
    SingleTrack,
    /// Several tracks meant to be played simultaneously.
    Parallel,
    /// Several independent tracks meant to be played one after another.
    Sequential,
}
impl Format {
    fn from_raw(raw: u16) -> Result<Format> {
        Ok(match raw {
            0 => Format::SingleTrack,
            1 => Format::Parallel,
            2 => Format::Sequential,
            _ => bail!(err_invalid!("invalid smf format")),
        })
    }
}

/// A MIDI file header.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    pub format: Format,
    /// How many track chunks the file declares.
    pub track_count: u16,
    /// How many ticks make up a beat (a quarter note).
    pub ticks_per_beat: u16,
}
impl Header {
    pub fn new(format: Format, track_count: u16, ticks_per_beat: u16) -> Header {
        Header {
            format,
            track_count,
            ticks_per_beat,
        }
    }

    /// Read the header from the payload of an `MThd` chunk.
    ///
    /// Only the first 6 bytes are looked at, anything after them is ignored.
    fn read(raw: &[u8]) -> Result<Header> {
        let mut raw = ByteCursor::new(raw);
        let format = raw.read_u16().context("reading smf format")?;
        let track_count = raw.read_u16().context("reading track count")?;
        let division = raw.read_u16().context("reading timing division")?;
        let format = Format::from_raw(format)?;
        ensure!(
            division & 0x8000 == 0,
            err_invalid!("smpte timing is not supported")
        );
        ensure!(division != 0, err_invalid!("zero ticks per beat"));
        if cfg!(feature = "strict") {
            ensure!(
                format != Format::SingleTrack || track_count == 1,
                err_malformed!("singletrack format file has multiple tracks")
            );
        }
        Ok(Header::new(format, track_count, division))
    }
}

/// A single track: a flat list of events in chronological order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Track<T: Time = Ticks> {
    pub events: Vec<Event<T>>,
}
impl<T: Time> Track<T> {
    #[inline]
    pub fn new(events: Vec<Event<T>>) -> Track<T> {
        Track { events }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Event<T>> {
        self.events.iter()
    }

    /// The absolute time of every event, from the start of the track.
    pub fn absolute_times(&self) -> impl Iterator<Item = T::Abs> + '_ {
        self.events.iter().scan(T::Abs::default(), |time, ev| {
            *time = *time + ev.delta.widen();
            Some(*time)
        })
    }

    /// The events as raw native-endian bytes, `size_of::<Event<T>>()` bytes per event.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Event<T>` is `repr(C)` and, for every `Time` implementor, laid out without
        // padding (checked at compile time in the `event` module), so all bytes are initialized.
        unsafe {
            core::slice::from_raw_parts(
                self.events.as_ptr() as *const u8,
                self.events.len() * mem::size_of::<Event<T>>(),
            )
        }
    }
}
impl<'a, T: Time> IntoIterator for &'a Track<T> {
    type Item = &'a Event<T>;
    type IntoIter = core::slice::Iter<'a, Event<T>>;
    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// A decoded Standard Midi File.
///
/// The time unit of the events is part of the type.
/// Files start out in [`Ticks`](struct.Ticks.html), and can be converted into real time once,
/// which consumes the tempo map.
#[derive(Clone, PartialEq, Debug)]
pub struct Smf<T: Time = Ticks> {
    pub header: Header,
    /// The tempo changes of every track, sorted by tick.
    ///
    /// Only present while event times are in ticks.
    pub tempo_map: Option<TempoMap>,
    pub tracks: Vec<Track<T>>,
}
impl Smf<Ticks> {
    /// Decode a file with the default options.
    pub fn parse(raw: &[u8]) -> Result<Smf<Ticks>> {
        Smf::parse_with(raw, &Options::default())
    }

    /// Decode a file, honoring the decoding-related fields of `options` (`notes_only` and
    /// `default_program`).
    ///
    /// RMID files are unwrapped transparently.
    pub fn parse_with(raw: &[u8], options: &Options) -> Result<Smf<Ticks>> {
        let raw = if raw.starts_with(b"RIFF") {
            riff::unwrap(raw).context("unwrapping riff container")?
        } else {
            raw
        };
        let mut raw = ByteCursor::new(raw);
        let header = Chunk::read(&mut raw, b"MThd").context("reading header chunk")?;
        let header = Header::read(header.data).context("reading header")?;
        //Split every chunk up front, so chunk errors always take precedence over event errors
        let chunks = (0..header.track_count)
            .map(|_| Chunk::read(&mut raw, b"MTrk").map(|chunk| chunk.data))
            .collect::<Result<Vec<&[u8]>>>()
            .context("reading track chunk")?;
        let mut tempo_map = TempoMap::new();
        let tracks = decode_tracks(&chunks, options, &mut tempo_map)?;
        tempo_map.ensure_sorted();
        Ok(Smf {
            header,
            tempo_map: Some(tempo_map),
            tracks,
        })
    }

    /// Rewrite every event time into whole microseconds.
    pub fn into_micros(self) -> Smf<Micros> {
        self.into_real_time()
    }

    /// Rewrite every event time into fractional seconds.
    pub fn into_seconds(self) -> Smf<Seconds> {
        self.into_real_time()
    }

    fn into_real_time<U: RealTime>(self) -> Smf<U> {
        let mut tempo_map = self.tempo_map.unwrap_or_default();
        tempo_map.ensure_sorted();
        let ticks_per_beat = self.header.ticks_per_beat.max(1);
        let tracks = self
            .tracks
            .iter()
            .map(|track| tempo::convert_track::<U>(track, &tempo_map, ticks_per_beat))
            .collect();
        Smf {
            header: self.header,
            tempo_map: None,
            tracks,
        }
    }
}
impl<T: Time> Smf<T> {
    pub fn new(header: Header, tempo_map: Option<TempoMap>, tracks: Vec<Track<T>>) -> Smf<T> {
        Smf {
            header,
            tempo_map,
            tracks,
        }
    }

    /// Interleave all tracks into a single one, in chronological order.
    ///
    /// Events at the same time are ordered by track index, and keep their relative order within
    /// their track.
    pub fn merge_tracks(mut self) -> Smf<T> {
        let merged = merge::merge(mem::take(&mut self.tracks));
        self.tracks = vec![merged];
        self
    }

    /// Store the length of every note in the `duration` field of its `NoteOn` event.
    pub fn compute_durations(mut self) -> Smf<T> {
        for track in self.tracks.iter_mut() {
            filter::compute_durations(track);
        }
        self
    }

    /// Remove all `NoteOff` events, keeping the remaining events at the same absolute times.
    ///
    /// Unlike plainly erasing them from `events`, the delta of every dropped event is folded into
    /// the next remaining event of its track. `NoteOff`s at the end of a track leave nothing
    /// behind.
    pub fn remove_note_off(mut self) -> Smf<T> {
        for track in self.tracks.iter_mut() {
            filter::remove_note_off(track);
        }
        self
    }

    /// Total amount of events across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}

/// Decode the track chunks in order, accumulating tempo changes into `tempo_map`.
fn decode_tracks(
    chunks: &[&[u8]],
    options: &Options,
    tempo_map: &mut TempoMap,
) -> Result<Vec<Track<Ticks>>> {
    //Attempt to use multiple threads if possible and advantageous
    #[cfg(feature = "parallel")]
    {
        let body_len: usize = chunks.iter().map(|chunk| chunk.len()).sum();
        if chunks.len() > 1 && body_len >= PARALLEL_ENABLE_THRESHOLD {
            use rayon::prelude::*;

            debug!(
                "decoding {} tracks ({} bytes) in parallel",
                chunks.len(),
                body_len
            );
            let decoded = chunks
                .par_iter()
                .enumerate()
                .map(|(idx, &data)| -> Result<(Track<Ticks>, TempoMap)> {
                    //Gather tempo changes privately, they are replayed in track order below
                    let mut raw_tempo = TempoMap::raw();
                    let track = TrackDecoder::new(data, idx as u16, options)
                        .decode(&mut raw_tempo)
                        .context("decoding track")?;
                    Ok((track, raw_tempo))
                })
                .collect::<Vec<_>>();
            let mut tracks = Vec::with_capacity(decoded.len());
            for result in decoded {
                let (track, raw_tempo) = result?;
                tempo_map.absorb(raw_tempo);
                tracks.push(track);
            }
            return Ok(tracks);
        }
    }
    //Fall back to single-threaded
    chunks
        .iter()
        .enumerate()
        .map(|(idx, &data)| {
            TrackDecoder::new(data, idx as u16, options)
                .decode(tempo_map)
                .context("decoding track")
        })
        .collect()
}
