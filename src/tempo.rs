//! Tempo changes and the conversion of tick timings into real time.

use crate::{event::Event, prelude::*, smf::Track, time::Ticks};

/// The tempo assumed by the MIDI standard until a Set Tempo meta message says otherwise: 120
/// beats per minute.
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

/// A change of tempo at a given point in time.
///
/// Laid out as two consecutive `u32`s, so a list of tempo changes can be viewed as an `N × 2`
/// integer matrix.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(C)]
pub struct TempoChange {
    /// Absolute position of the change, in ticks since the start of the file.
    pub tick: u32,
    /// The new tempo, in microseconds per beat (quarter note).
    pub micros_per_beat: u32,
}
impl TempoChange {
    #[inline]
    pub fn new(tick: u32, micros_per_beat: u32) -> TempoChange {
        TempoChange {
            tick,
            micros_per_beat,
        }
    }
}

/// All tempo changes in a file, gathered from every track.
///
/// Tempo changes may appear in any track, so the map is shared by all of them.
/// Once a file is fully decoded, the map is sorted by tick and always starts at tick 0 if it is not
/// empty.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
    /// Raw maps only collect the changes of a single track, to be replayed into the shared map
    /// later, and therefore never insert the initial default tempo by themselves.
    raw: bool,
}
impl TempoMap {
    /// Create an empty tempo map.
    #[inline]
    pub fn new() -> TempoMap {
        TempoMap::default()
    }

    /// A map that records changes exactly as they come, without inserting a default initial
    /// tempo.
    #[inline]
    pub(crate) fn raw() -> TempoMap {
        TempoMap {
            changes: Vec::new(),
            raw: true,
        }
    }

    /// Record a tempo change at an absolute tick.
    ///
    /// If this is the first change in the map and it does not happen at tick 0, a change to the
    /// default tempo is recorded at tick 0 first.
    pub fn record(&mut self, tick: u32, micros_per_beat: u32) {
        if !self.raw && self.changes.is_empty() && tick > 0 {
            debug!(
                "first tempo change at tick {}, assuming {}us/beat before it",
                tick, DEFAULT_MICROS_PER_BEAT
            );
            self.changes
                .push(TempoChange::new(0, DEFAULT_MICROS_PER_BEAT));
        }
        self.changes.push(TempoChange::new(tick, micros_per_beat));
    }

    /// Replay the changes of a raw map into this one, in order.
    pub(crate) fn absorb(&mut self, raw: TempoMap) {
        for change in raw.changes {
            self.record(change.tick, change.micros_per_beat);
        }
    }

    /// Sort the changes by tick if they are not sorted already.
    ///
    /// The sort is stable: changes at the same tick keep their recording order, so the last one
    /// recorded wins.
    pub fn ensure_sorted(&mut self) {
        let sorted = self.changes.windows(2).all(|w| w[0].tick <= w[1].tick);
        if !sorted {
            debug!("tempo map out of order, sorting {} changes", self.changes.len());
            self.changes.sort_by_key(|change| change.tick);
        }
    }

    /// Whether the changes are in non-decreasing tick order.
    pub fn is_sorted(&self) -> bool {
        self.changes.windows(2).all(|w| w[0].tick <= w[1].tick)
    }

    #[inline]
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, TempoChange> {
        self.changes.iter()
    }

    /// The tempo changes as raw native-endian bytes, 8 bytes per change.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `TempoChange` is `repr(C)` and made of two `u32`s, so it has no padding and
        // every byte is initialized.
        unsafe {
            core::slice::from_raw_parts(
                self.changes.as_ptr() as *const u8,
                self.changes.len() * mem::size_of::<TempoChange>(),
            )
        }
    }

    /// The real time at which an absolute tick happens.
    pub fn time_at<U: RealTime>(&self, tick: u64, ticks_per_beat: u16) -> U::Abs {
        let mut walker = TempoWalker::new(self);
        U::at(walker.advance_to(tick), ticks_per_beat)
    }
}
impl<'a> IntoIterator for &'a TempoMap {
    type Item = &'a TempoChange;
    type IntoIter = core::slice::Iter<'a, TempoChange>;
    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Walks a tempo map forward, accumulating `ticks * micros_per_beat` exactly.
///
/// Every real-time value is derived from this integer sum in a single rounding step, so two events
/// at the same tick always get the same time, no matter which events were visited before them.
struct TempoWalker<'a> {
    changes: &'a [TempoChange],
    tick: u64,
    tick_micros: u128,
    micros_per_beat: u32,
}
impl<'a> TempoWalker<'a> {
    fn new(map: &'a TempoMap) -> TempoWalker<'a> {
        TempoWalker {
            changes: &map.changes,
            tick: 0,
            tick_micros: 0,
            micros_per_beat: DEFAULT_MICROS_PER_BEAT,
        }
    }

    /// Move forward to `target`, switching tempos on the way, and return the tick-micros there.
    ///
    /// `target` must not be behind the current tick.
    fn advance_to(&mut self, target: u64) -> u128 {
        while let Some((change, rest)) = self.changes.split_first() {
            let change_tick = change.tick as u64;
            if change_tick > target {
                break;
            }
            self.step(change_tick);
            self.micros_per_beat = change.micros_per_beat;
            self.changes = rest;
        }
        self.step(target);
        self.tick_micros
    }

    fn step(&mut self, to: u64) {
        let ticks = to.saturating_sub(self.tick) as u128;
        self.tick_micros = self
            .tick_micros
            .saturating_add(ticks * self.micros_per_beat as u128);
        self.tick = self.tick.max(to);
    }
}

/// Rewrite the tick deltas of a track into real-time deltas.
pub(crate) fn convert_track<U: RealTime>(
    track: &Track<Ticks>,
    tempo: &TempoMap,
    ticks_per_beat: u16,
) -> Track<U> {
    let mut walker = TempoWalker::new(tempo);
    let mut tick = 0;
    let mut last_time = U::Abs::default();
    let events = track
        .events
        .iter()
        .map(|ev| {
            tick += ev.delta.as_int() as u64;
            let time = U::at(walker.advance_to(tick), ticks_per_beat);
            let delta = U::between(last_time, time);
            last_time = time;
            let duration = if ev.duration.as_int() == 0 {
                U::default()
            } else {
                let end = tick + ev.duration.as_int() as u64;
                U::between(time, tempo.time_at::<U>(end, ticks_per_beat))
            };
            ev.with_times(delta, duration)
        })
        .collect::<Vec<Event<U>>>();
    Track::new(events)
}
