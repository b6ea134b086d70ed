//! Interleaving of several tracks into a single chronological one.

use crate::{prelude::*, smf::Track};
use alloc::collections::BinaryHeap;
use core::cmp::Reverse;

/// The next unconsumed event of a track, keyed by its absolute time and then its track index.
struct Pending<T: Time> {
    time: T::Abs,
    track: usize,
}
impl<T: Time> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<T: Time> Eq for Pending<T> {}
impl<T: Time> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: Time> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        T::cmp_abs(&self.time, &other.time).then(self.track.cmp(&other.track))
    }
}

/// Merge `tracks` into one track, rewriting deltas relative to the previous merged event.
///
/// Events keep their original `track` field, so the source of every event can still be told apart.
pub(crate) fn merge<T: Time>(tracks: Vec<Track<T>>) -> Track<T> {
    let total = tracks.iter().map(Track::len).sum();
    let mut out = Vec::with_capacity(total);
    let mut cursors = vec![0usize; tracks.len()];
    let mut heap = BinaryHeap::with_capacity(tracks.len());
    for (idx, track) in tracks.iter().enumerate() {
        if let Some(first) = track.events.first() {
            heap.push(Reverse(Pending::<T> {
                time: first.delta.widen(),
                track: idx,
            }));
        }
    }
    let mut last = T::Abs::default();
    while let Some(Reverse(Pending { time, track })) = heap.pop() {
        let events = &tracks[track].events;
        let ev = events[cursors[track]];
        out.push(ev.with_times(T::between(last, time), ev.duration));
        last = time;
        cursors[track] += 1;
        if let Some(next) = events.get(cursors[track]) {
            heap.push(Reverse(Pending {
                time: time + next.delta.widen(),
                track,
            }));
        }
    }
    Track::new(out)
}
