//! Passes that run over finished tracks: note durations and `NoteOff` removal.

use crate::{event::EventKind, prelude::*, smf::Track};

/// Slot of a `(channel, key)` pair in a flat per-note table.
#[inline]
fn note_slot(channel: u8, key: u8) -> usize {
    (channel as usize & 0x0F) * 128 + (key as usize & 0x7F)
}

/// Set the duration of every `NoteOn` to the time until the next `NoteOff` of the same channel
/// and key.
///
/// Notes that are never released last until the last event of the track.
pub(crate) fn compute_durations<T: Time>(track: &mut Track<T>) {
    //Times are measured backwards, as the distance to the last event of the track
    let mut until_end = T::Abs::default();
    let mut last_off = vec![T::Abs::default(); 16 * 128];
    for ev in track.events.iter_mut().rev() {
        let slot = note_slot(ev.channel, ev.key);
        match ev.kind {
            EventKind::NoteOn => ev.duration = T::between(last_off[slot], until_end),
            EventKind::NoteOff => last_off[slot] = until_end,
            _ => {}
        }
        until_end = until_end + ev.delta.widen();
    }
}

/// Drop every `NoteOff` event, folding its delta into the next remaining event.
pub(crate) fn remove_note_off<T: Time>(track: &mut Track<T>) {
    let mut carry = T::Abs::default();
    track.events.retain_mut(|ev| {
        if ev.kind == EventKind::NoteOff {
            carry = carry + ev.delta.widen();
            false
        } else {
            ev.delta = T::between(T::Abs::default(), carry + ev.delta.widen());
            carry = T::Abs::default();
            true
        }
    });
}
