//! Fixed-width event records and the decoder that produces them from a track chunk.

use crate::{
    options::Options,
    prelude::*,
    smf::Track,
    tempo::TempoMap,
    time::Ticks,
};

/// How many events per byte to estimate when allocating memory for events while decoding.
///
/// Real-world files average a little above 3 bytes per event with running status, so this errs on
/// the side of overallocating.
/// Files decoded with `notes_only` will usually end up with less events than estimated, which
/// is fine.
const BYTES_TO_EVENTS: f32 = 1.0 / 3.0;

/// The type of a channel message, numerically equal to the top nibble of its status byte.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// Stop playing a note.
    NoteOff = 0x80,
    /// Start playing a note.
    NoteOn = 0x90,
    /// Modify the velocity of a note after it has been played.
    PolyAftertouch = 0xA0,
    /// Modify the value of a MIDI controller.
    Control = 0xB0,
    /// Change the program (instrument) of a channel.
    ProgramChange = 0xC0,
    /// Change the velocity of all notes in a channel at once.
    ChannelAftertouch = 0xD0,
    /// Set the pitch bend of a channel.
    PitchBend = 0xE0,
}
impl EventKind {
    /// Get the kind of a channel message from its status byte.
    ///
    /// The channel nibble is ignored. Returns `None` for non-channel statuses.
    #[inline]
    pub fn from_status(status: u8) -> Option<EventKind> {
        Some(match status & 0xF0 {
            0x80 => EventKind::NoteOff,
            0x90 => EventKind::NoteOn,
            0xA0 => EventKind::PolyAftertouch,
            0xB0 => EventKind::Control,
            0xC0 => EventKind::ProgramChange,
            0xD0 => EventKind::ChannelAftertouch,
            0xE0 => EventKind::PitchBend,
            _ => return None,
        })
    }

    /// The status nibble of this message type, in the top 4 bits.
    #[inline]
    pub fn status_nibble(self) -> u8 {
        self as u8
    }
}

/// A single decoded channel event.
///
/// Events are plain `repr(C)` records without padding: 16 bytes for integer time units and 24 bytes
/// for [`Seconds`](struct.Seconds.html).
/// A slice of them can be reinterpreted as raw bytes through
/// [`Track::as_bytes`](struct.Track.html#method.as_bytes).
///
/// What `key` and `value` hold depends on `kind`:
///
/// | `kind` | `key` | `value` |
/// |---|---|---|
/// | `NoteOn`, `NoteOff`, `PolyAftertouch` | key | velocity |
/// | `Control` | controller | value |
/// | `ChannelAftertouch` | 0 | velocity |
/// | `PitchBend` | low 7 bits | high 7 bits |
#[derive(Copy, Clone, PartialEq, Debug)]
#[repr(C)]
pub struct Event<T: Time = Ticks> {
    /// Time since the previous event of the same track.
    pub delta: T,
    /// For `NoteOn` events with durations computed, how long the note plays. Zero otherwise.
    pub duration: T,
    /// Index of the track this event was decoded from.
    pub track: u16,
    /// The program in effect on this event's channel when it was decoded.
    pub program: u8,
    pub kind: EventKind,
    /// The MIDI channel, in `0..16`.
    pub channel: u8,
    pub key: u8,
    pub value: u8,
    _reserved: u8,
}
impl<T: Time> Event<T> {
    #[inline]
    pub fn new(
        delta: T,
        track: u16,
        program: u8,
        kind: EventKind,
        channel: u8,
        key: u8,
        value: u8,
    ) -> Event<T> {
        Event {
            delta,
            duration: T::default(),
            track,
            program,
            kind,
            channel,
            key,
            value,
            _reserved: 0,
        }
    }

    /// The same event with different timing, possibly in a different unit.
    #[inline]
    pub fn with_times<U: Time>(&self, delta: U, duration: U) -> Event<U> {
        Event {
            delta,
            duration,
            track: self.track,
            program: self.program,
            kind: self.kind,
            channel: self.channel,
            key: self.key,
            value: self.value,
            _reserved: 0,
        }
    }
}

const _: [(); 16] = [(); mem::size_of::<Event<Ticks>>()];
const _: [(); 16] = [(); mem::size_of::<Event<crate::time::Micros>>()];
const _: [(); 24] = [(); mem::size_of::<Event<crate::time::Seconds>>()];

/// Decodes the payload of a single `MTrk` chunk into a flat list of events.
///
/// Meta events, system exclusive and system common messages are consumed and dropped, except for
/// Set Tempo meta events, which are recorded into a shared [`TempoMap`](struct.TempoMap.html).
/// Program changes are not emitted either, but update the program reported by later events on
/// the same channel.
#[derive(Clone, Debug)]
pub struct TrackDecoder<'a> {
    raw: ByteCursor<'a>,
    track: u16,
    running_status: Option<u8>,
    program: [u8; 16],
    /// Absolute tick of the last message read.
    tick: u64,
    /// Absolute tick of the last event emitted.
    last_emit: u64,
    notes_only: bool,
    events: Vec<Event<Ticks>>,
}
impl<'a> TrackDecoder<'a> {
    /// Create a decoder over the payload of a track chunk.
    pub fn new(raw: &'a [u8], track: u16, options: &Options) -> TrackDecoder<'a> {
        TrackDecoder {
            raw: ByteCursor::new(raw),
            track,
            running_status: None,
            program: [options.default_program.min(0x7F); 16],
            tick: 0,
            last_emit: 0,
            notes_only: options.notes_only,
            events: Vec::with_capacity((raw.len() as f32 * BYTES_TO_EVENTS) as usize),
        }
    }

    /// The status byte that a data byte read right now would use, if any.
    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// The program currently selected on each channel.
    #[inline]
    pub fn programs(&self) -> &[u8; 16] {
        &self.program
    }

    /// How many track bytes have been consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.raw.position()
    }

    /// Decode the whole track, recording any tempo changes into `tempo`.
    ///
    /// Decoding stops at the End of Track meta event or at the end of the chunk, whichever comes
    /// first.
    pub fn decode(mut self, tempo: &mut TempoMap) -> Result<Track<Ticks>> {
        loop {
            if self.raw.remain() == 0 {
                debug!("track {} ended without an end of track event", self.track);
                break;
            }
            if !self.step(tempo).context("decoding track event")? {
                break;
            }
        }
        Ok(Track::new(self.events))
    }

    /// Decode a single message. Returns whether decoding should go on.
    fn step(&mut self, tempo: &mut TempoMap) -> StdResult<bool, ErrorKind> {
        let delta: u32 = self.raw.read_varlen()?;
        self.tick += delta as u64;
        let status = match self.raw.peek() {
            Some(0xFF) => {
                self.raw.read_u8()?;
                self.running_status = None;
                return self.read_meta(tempo);
            }
            Some(0xF8..=0xFE) => {
                //System realtime, leaves running status alone
                self.raw.read_u8()?;
                return Ok(true);
            }
            Some(status @ 0xF0..=0xF7) => {
                self.raw.read_u8()?;
                self.running_status = None;
                self.skip_system_common(status)?;
                return Ok(true);
            }
            Some(status @ 0x80..=0xEF) => {
                self.raw.read_u8()?;
                self.running_status = Some(status);
                status
            }
            Some(_) => self.running_status.ok_or(ErrorKind::MissingStatusByte)?,
            None => bail!(ErrorKind::EndOfStream),
        };
        self.read_channel_message(status)?;
        Ok(true)
    }

    fn read_meta(&mut self, tempo: &mut TempoMap) -> StdResult<bool, ErrorKind> {
        let kind = self.raw.read_u8()?;
        if kind == 0x2F {
            //End of track, the length byte may well be missing
            return Ok(false);
        }
        let len: u32 = self.raw.read_varlen()?;
        let data = self.raw.take(len as usize)?;
        if kind == 0x51 {
            if data.len() >= 3 {
                let micros_per_beat = ByteCursor::new(data).read_u24()?;
                let tick = u32::try_from(self.tick).unwrap_or(u32::MAX);
                tempo.record(tick, micros_per_beat);
            } else if cfg!(feature = "strict") {
                bail!(err_malformed!("set tempo event too short"));
            } else {
                warn!(
                    "ignoring {}-byte set tempo event in track {}",
                    data.len(),
                    self.track
                );
            }
        }
        Ok(true)
    }

    /// Consume the data bytes of a system exclusive or system common message.
    fn skip_system_common(&mut self, status: u8) -> StdResult<(), ErrorKind> {
        match status {
            0xF0 => while self.raw.read_u8()? != 0xF7 {},
            0xF1 | 0xF3 => {
                self.raw.take(1)?;
            }
            0xF2 => {
                self.raw.take(2)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn read_channel_message(&mut self, status: u8) -> StdResult<(), ErrorKind> {
        let channel = status & 0x0F;
        let kind = match EventKind::from_status(status) {
            Some(kind) => kind,
            None => bail!(err_invalid!("channel message with system status")),
        };
        match kind {
            EventKind::NoteOn | EventKind::NoteOff => {
                let data = self.raw.take(2)?;
                let key = check_key(data[0])?;
                let vel = clamp_value(data[1])?;
                let kind = if kind == EventKind::NoteOn && vel == 0 {
                    EventKind::NoteOff
                } else {
                    kind
                };
                self.emit(kind, channel, key, vel);
            }
            EventKind::PolyAftertouch | EventKind::Control | EventKind::PitchBend => {
                let data = self.raw.take(2)?;
                if !self.notes_only {
                    let key = check_key(data[0])?;
                    let value = clamp_value(data[1])?;
                    self.emit(kind, channel, key, value);
                }
            }
            EventKind::ChannelAftertouch => {
                let data = self.raw.take(1)?;
                if !self.notes_only {
                    let value = clamp_value(data[0])?;
                    self.emit(kind, channel, 0, value);
                }
            }
            EventKind::ProgramChange => {
                let program = self.raw.read_u8()?;
                if program < 0x80 {
                    self.program[channel as usize] = program;
                } else {
                    warn!(
                        "ignoring program change to {} on channel {} of track {}",
                        program, channel, self.track
                    );
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, kind: EventKind, channel: u8, key: u8, value: u8) {
        let delta = u32::try_from(self.tick - self.last_emit).unwrap_or(u32::MAX);
        self.last_emit = self.tick;
        self.events.push(Event::new(
            Ticks(delta),
            self.track,
            self.program[channel as usize],
            kind,
            channel,
            key,
            value,
        ));
    }
}

#[inline]
fn check_key(key: u8) -> StdResult<u8, ErrorKind> {
    ensure!(key < 0x80, ErrorKind::DataByteOutOfRange(key));
    Ok(key)
}

#[inline]
fn clamp_value(value: u8) -> StdResult<u8, ErrorKind> {
    if value < 0x80 {
        Ok(value)
    } else if cfg!(feature = "strict") {
        Err(ErrorKind::DataByteOutOfRange(value))
    } else {
        warn!("clamping data byte {:#04x} to 0x7f", value);
        Ok(0x7F)
    }
}
