//! Error type returned by the public API.

use core::fmt;

/// A failure returned by a public `autocom` operation.
///
/// Every variant here is a local return value, not an exception: nothing in
/// this crate panics or unwinds on a caller mistake, matching the "no
/// exceptional control flow" rule the COM layer is specified to follow.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ComError {
    /// A signal, PDU or group id was out of range for the configuration.
    InvalidHandle,
    /// An update bit is configured for this signal and is currently clear;
    /// the caller may poll again later. Not a fault.
    NoUpdate,
    /// The signal's configured kind does not support the requested
    /// operation (e.g. `send_signal` called on a group signal, or the
    /// caller's [`crate::signal::SignalValue`] variant does not match the
    /// signal's configured kind).
    UnsupportedSignalType,
    /// A caller-supplied buffer was too small to hold the data being
    /// transferred.
    BufferTooSmall,
    /// The configuration has more signals, PDUs, or longer buffers than the
    /// `Com` instance's const-generic capacity allows.
    CapacityExceeded,
}

impl fmt::Display for ComError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => f.write_str("invalid signal, PDU or group handle"),
            Self::NoUpdate => f.write_str("update bit not set; no new value to receive"),
            Self::UnsupportedSignalType => {
                f.write_str("signal kind does not support the requested operation")
            }
            Self::BufferTooSmall => f.write_str("caller-supplied buffer too small"),
            Self::CapacityExceeded => f.write_str("configuration exceeds this Com instance's static capacity"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ComError {}
