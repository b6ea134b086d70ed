//! The units event times can be expressed in.
//!
//! Every event stores its time as a delta from the previous event of the same track.
//! Deltas are kept narrow so that event records stay small, while absolute positions, which only
//! exist transiently while converting, merging or filtering, use a wider accumulator.

use crate::prelude::*;

/// The unit an event time is expressed in.
///
/// Used to pick the output of [`load`](fn.load.html).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// MIDI ticks, as stored in the file. No conversion takes place.
    Ticks,
    /// Whole microseconds.
    Micros,
    /// Fractional seconds.
    Seconds,
}

mod sealed {
    pub trait Sealed {}
}

/// A unit of time that event records can carry.
///
/// This trait is sealed: it is implemented by [`Ticks`](struct.Ticks.html),
/// [`Micros`](struct.Micros.html) and [`Seconds`](struct.Seconds.html) only, whose layouts are
/// known to keep [`Event`](struct.Event.html) records free of padding bytes.
pub trait Time:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static + sealed::Sealed
{
    /// Accumulator for absolute positions in this unit.
    type Abs: Copy + Default + PartialOrd + ops::Add<Output = Self::Abs> + fmt::Debug + Send + Sync;

    /// The unit tag for this type.
    const UNIT: TimeUnit;

    /// Widen a delta into an absolute offset.
    fn widen(self) -> Self::Abs;

    /// The delta from `from` to `to`, saturating to the representable range.
    fn between(from: Self::Abs, to: Self::Abs) -> Self;

    /// Total ordering over absolute positions.
    fn cmp_abs(a: &Self::Abs, b: &Self::Abs) -> Ordering;
}

/// A unit of real (wall-clock) time that tick-based timings can be converted into.
pub trait RealTime: Time {
    /// The absolute time reached once `tick_micros / ticks_per_beat` microseconds have elapsed.
    ///
    /// `tick_micros` is the exact sum of `ticks * micros_per_beat` over every tempo segment since
    /// the start of the file, so the result only depends on the tick being converted.
    fn at(tick_micros: u128, ticks_per_beat: u16) -> Self::Abs;
}

macro_rules! int_time {
    {$(#[$attr:meta])* $name:ident => $unit:ident} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub u32);
        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> $name {
                $name(raw)
            }

            #[inline]
            pub const fn as_int(self) -> u32 {
                self.0
            }
        }
        impl From<u32> for $name {
            #[inline]
            fn from(raw: u32) -> $name {
                $name(raw)
            }
        }
        impl From<$name> for u32 {
            #[inline]
            fn from(time: $name) -> u32 {
                time.0
            }
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl PartialEq<u32> for $name {
            fn eq(&self, rhs: &u32) -> bool {
                self.0 == *rhs
            }
        }
        impl sealed::Sealed for $name {}
        impl Time for $name {
            type Abs = u64;
            const UNIT: TimeUnit = TimeUnit::$unit;

            #[inline]
            fn widen(self) -> u64 {
                self.0 as u64
            }

            #[inline]
            fn between(from: u64, to: u64) -> $name {
                $name(u32::try_from(to.saturating_sub(from)).unwrap_or(u32::MAX))
            }

            #[inline]
            fn cmp_abs(a: &u64, b: &u64) -> Ordering {
                a.cmp(b)
            }
        }
    };
}

int_time! {
    /// A time in MIDI ticks.
    ///
    /// How long a tick lasts depends on the ticks-per-beat value in the file header and on the
    /// tempo in effect.
    Ticks => Ticks
}
int_time! {
    /// A time in whole microseconds.
    Micros => Micros
}

impl RealTime for Micros {
    #[inline]
    fn at(tick_micros: u128, ticks_per_beat: u16) -> u64 {
        u64::try_from(tick_micros / ticks_per_beat.max(1) as u128).unwrap_or(u64::MAX)
    }
}

/// Absolute times in seconds are rounded down to multiples of `2^-SECONDS_GRID_BITS` seconds.
///
/// On this grid, sums and differences of times below `2^(53 - SECONDS_GRID_BITS)` seconds (about
/// 24 days) are exact, so adding up the deltas of a track gives back its absolute times bit for bit.
const SECONDS_GRID_BITS: u32 = 32;

/// A time in fractional seconds.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default)]
#[repr(transparent)]
pub struct Seconds(pub f64);
impl Seconds {
    #[inline]
    pub const fn new(secs: f64) -> Seconds {
        Seconds(secs)
    }

    #[inline]
    pub const fn as_f64(self) -> f64 {
        self.0
    }
}
impl From<f64> for Seconds {
    #[inline]
    fn from(secs: f64) -> Seconds {
        Seconds(secs)
    }
}
impl From<Seconds> for f64 {
    #[inline]
    fn from(time: Seconds) -> f64 {
        time.0
    }
}
impl fmt::Display for Seconds {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl sealed::Sealed for Seconds {}
impl Time for Seconds {
    type Abs = f64;
    const UNIT: TimeUnit = TimeUnit::Seconds;

    #[inline]
    fn widen(self) -> f64 {
        self.0
    }

    #[inline]
    fn between(from: f64, to: f64) -> Seconds {
        let delta = to - from;
        Seconds(if delta > 0.0 { delta } else { 0.0 })
    }

    #[inline]
    fn cmp_abs(a: &f64, b: &f64) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    }
}
impl RealTime for Seconds {
    #[inline]
    fn at(tick_micros: u128, ticks_per_beat: u16) -> f64 {
        let steps = tick_micros.saturating_mul(1 << SECONDS_GRID_BITS)
            / (1_000_000 * ticks_per_beat.max(1) as u128);
        steps as f64 / (1u64 << SECONDS_GRID_BITS) as f64
    }
}
