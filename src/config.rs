//! Immutable, build-time configuration types.
//!
//! Everything in this module is meant to be produced once (typically as a
//! `const`/`static` table by a code generator that is explicitly out of scope
//! for this crate, see `spec.md` §1) and handed to [`crate::com::Com::new`].
//! Nothing here is mutated at runtime; the mutable counterpart lives in
//! [`crate::com::Com`]'s own fields.

/// Maximum byte length of a single signal's scratch/init-value region.
///
/// Large enough for a CAN-FD-sized bulk (`UINT8N`/group) signal. Scalar
/// signals only ever need up to 4 bytes of this.
pub const MAX_SIGNAL_BYTES: usize = 64;

/// The native representation of a signal's value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SignalKind {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    /// A bulk byte block, copied verbatim; width is `bit_size / 8` bytes.
    Uint8N,
    /// A group signal: carries no scalar type, only bulk bytes staged via
    /// `send_signal_group`/`receive_signal_group`.
    GroupSignal,
}

/// Bit ordering used when packing a signal into its PDU buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Endianness {
    Big,
    Little,
    /// Byte-copy, no bit packing or byte-swap at all.
    Opaque,
}

/// A typed, bit-addressed view into an I-PDU's byte buffer.
///
/// A signal never owns bytes; `pdu_index` names the [`IPduConfig`] whose
/// buffer this signal is a view into. Two signals may legally alias
/// overlapping bits of the same PDU.
#[derive(Debug, Copy, Clone)]
pub struct SignalConfig {
    /// Dense index, unique per signal; also this signal's position in
    /// [`ComConfig::signals`].
    pub handle_id: usize,
    pub kind: SignalKind,
    pub endianness: Endianness,
    /// Index into [`ComConfig::pdus`] naming the owning I-PDU.
    pub pdu_index: usize,
    /// Starting bit in the owning PDU buffer.
    pub bit_position: usize,
    /// `1..=32` for scalar kinds, a multiple of 8 for `Uint8N`/`GroupSignal`.
    pub bit_size: u32,
    /// Bit index of this signal's update bit in the owning PDU buffer, or
    /// `None` if this signal does not use one.
    pub update_bit: Option<usize>,
    /// Seed bytes copied into this signal's runtime scratch/init-value
    /// region at construction and used as the source when a PDU group is
    /// started with `initialize = true`.
    pub init_bytes: &'static [u8],
}

/// Reception-specific configuration for an RX I-PDU.
#[derive(Debug, Copy, Clone)]
pub struct RxConfig {
    /// Ticks between reception timeouts once armed.
    pub timeout_ticks: u32,
    /// Ticks for the first arming after a group start; `0` means "use
    /// `timeout_ticks`".
    pub first_timeout_ticks: u32,
    pub on_rx: Option<fn()>,
    pub on_timeout: Option<fn()>,
}

/// Transmission-specific configuration for a TX I-PDU.
#[derive(Debug, Copy, Clone)]
pub struct TxConfig {
    /// Ticks between cyclic transmissions.
    pub cycle_ticks: u32,
    /// Ticks for the first transmission after a group start; `0` means "use
    /// `cycle_ticks`".
    pub first_time_ticks: u32,
    /// Opaque handle passed to [`crate::scheduler::PduR::transmit`]; this is
    /// PduR's own numbering, distinct from this PDU's index in
    /// [`ComConfig::pdus`].
    pub tx_pdu_id: u32,
    pub on_tx_confirm: Option<fn()>,
    pub on_tx_error: Option<fn()>,
}

/// Exactly one of RX, TX, or pass-through (neither scheduled nor
/// timeout-supervised, but still packable/unpackable on demand).
#[derive(Debug, Copy, Clone)]
pub enum Direction {
    Rx(RxConfig),
    Tx(TxConfig),
    PassThrough,
}

/// One fixed-length I-PDU: its buffer length, member signals, group
/// membership, and RX/TX behavior.
#[derive(Debug, Copy, Clone)]
pub struct IPduConfig {
    /// Byte length of the buffer this PDU owns.
    pub length: usize,
    /// Handle ids of the signals that live inside this PDU's buffer, in
    /// declaration order (the order update bits are cleared in and the
    /// order group-start initialization runs in).
    pub signals: &'static [usize],
    /// Bitmap selecting which I-PDU groups enable this PDU. Bit `k` set
    /// means group `k` includes this PDU.
    pub group_mask: u32,
    pub direction: Direction,
}

impl IPduConfig {
    pub(crate) fn rx(&self) -> Option<&RxConfig> {
        match &self.direction {
            Direction::Rx(rx) => Some(rx),
            _ => None,
        }
    }

    pub(crate) fn tx(&self) -> Option<&TxConfig> {
        match &self.direction {
            Direction::Tx(tx) => Some(tx),
            _ => None,
        }
    }
}

/// The full, immutable configuration of a COM layer instance.
#[derive(Debug, Copy, Clone)]
pub struct ComConfig<'a> {
    pub signals: &'a [SignalConfig],
    pub pdus: &'a [IPduConfig],
    /// Number of distinct I-PDU groups; group ids are `0..num_groups` and
    /// must fit in a `u32` bitmap (at most 32 groups).
    pub num_groups: u8,
}
