//! A logging shim so the rest of the crate can log without caring whether the
//! `std` feature (and with it, the `log` crate) is enabled.
//!
//! When `std` is off and `defmt-03` is on, calls go to `defmt` instead; with
//! neither enabled, calls are compiled out entirely.

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "std")]
            ::log::trace!($s $(, $x)*);
            #[cfg(all(not(feature = "std"), feature = "defmt-03"))]
            ::defmt::trace!($s $(, $x)*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "std")]
            ::log::debug!($s $(, $x)*);
            #[cfg(all(not(feature = "std"), feature = "defmt-03"))]
            ::defmt::debug!($s $(, $x)*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "std")]
            ::log::warn!($s $(, $x)*);
            #[cfg(all(not(feature = "std"), feature = "defmt-03"))]
            ::defmt::warn!($s $(, $x)*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "std")]
            ::log::error!($s $(, $x)*);
            #[cfg(all(not(feature = "std"), feature = "defmt-03"))]
            ::defmt::error!($s $(, $x)*);
        }
    };
}
