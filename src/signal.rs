//! Signal Packer: applies the bit codec to typed signals, handling sign
//! extension, opaque/bulk signals and update bits.
//!
//! These functions are pure: they take the owning PDU's buffer explicitly
//! rather than reaching into a [`crate::com::Com`], so they can be exercised
//! directly in tests against a bare byte array.

use crate::config::{Endianness, SignalConfig, SignalKind};
use crate::error::ComError;
use autocom_wire as wire;

/// A signal value supplied by the caller to [`pack`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalValue<'a> {
    S8(i8),
    U8(u8),
    S16(i16),
    U16(u16),
    S32(i32),
    U32(u32),
    /// Bulk bytes for a `Uint8N`/`GroupSignal`/opaque signal.
    Bytes(&'a [u8]),
}

/// A caller-supplied destination for [`unpack`].
#[derive(Debug, PartialEq, Eq)]
pub enum SignalValueMut<'a> {
    S8(&'a mut i8),
    U8(&'a mut u8),
    S16(&'a mut i16),
    U16(&'a mut u16),
    S32(&'a mut i32),
    U32(&'a mut u32),
    Bytes(&'a mut [u8]),
}

fn is_bulk(signal: &SignalConfig) -> bool {
    matches!(signal.kind, SignalKind::Uint8N | SignalKind::GroupSignal)
        || signal.endianness == Endianness::Opaque
}

fn byte_len(signal: &SignalConfig) -> usize {
    (signal.bit_size / 8) as usize
}

fn value_to_word(kind: SignalKind, src: SignalValue) -> Result<u32, ComError> {
    match (kind, src) {
        (SignalKind::S8, SignalValue::S8(v)) => Ok(v as u8 as u32),
        (SignalKind::U8, SignalValue::U8(v)) => Ok(v as u32),
        (SignalKind::S16, SignalValue::S16(v)) => Ok(v as u16 as u32),
        (SignalKind::U16, SignalValue::U16(v)) => Ok(v as u32),
        (SignalKind::S32, SignalValue::S32(v)) => Ok(v as u32),
        (SignalKind::U32, SignalValue::U32(v)) => Ok(v as u32),
        _ => Err(ComError::UnsupportedSignalType),
    }
}

/// Send path: pack `src` into `buf` (the owning PDU's buffer) per `signal`.
///
/// Mirrors `comSendSignal` in the reference implementation: bulk signals are
/// byte-copied; scalar signals are zero-extended to a 32-bit word and
/// deposited via the endian-appropriate bit codec. The update bit, if
/// configured, is set only after a successful write.
pub fn pack(signal: &SignalConfig, buf: &mut [u8], src: SignalValue) -> Result<(), ComError> {
    if is_bulk(signal) {
        let SignalValue::Bytes(bytes) = src else {
            return Err(ComError::UnsupportedSignalType);
        };
        let len = byte_len(signal);
        if bytes.len() < len {
            return Err(ComError::BufferTooSmall);
        }
        let start = signal.bit_position / 8;
        buf[start..start + len].copy_from_slice(&bytes[..len]);
    } else {
        let word = value_to_word(signal.kind, src)?;
        match signal.endianness {
            Endianness::Little => wire::set_le(buf, signal.bit_position, signal.bit_size, word),
            Endianness::Big => wire::set_be(buf, signal.bit_position, signal.bit_size, word),
            Endianness::Opaque => unreachable!("handled by is_bulk"),
        }
    }

    if let Some(bit) = signal.update_bit {
        wire::set_bit(buf, bit);
    }

    Ok(())
}

/// Like [`pack`], but takes the source as a little-endian native byte slice
/// instead of a typed [`SignalValue`].
///
/// Used for group-start initialization, where a signal's configured
/// `init_bytes` must be interpreted according to its own `kind` rather than
/// a caller-chosen variant (mirroring `comSendSignal(signal, signal->initPtr)`
/// in the reference implementation, where the same untyped pointer is
/// reinterpreted per `signal->type`).
pub fn pack_raw(signal: &SignalConfig, buf: &mut [u8], src_bytes: &[u8]) -> Result<(), ComError> {
    if is_bulk(signal) {
        return pack(signal, buf, SignalValue::Bytes(src_bytes));
    }

    fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N], ComError> {
        bytes
            .get(0..N)
            .and_then(|s| s.try_into().ok())
            .ok_or(ComError::BufferTooSmall)
    }

    let value = match signal.kind {
        SignalKind::S8 => SignalValue::S8(i8::from_le_bytes(take(src_bytes)?)),
        SignalKind::U8 => SignalValue::U8(u8::from_le_bytes(take(src_bytes)?)),
        SignalKind::S16 => SignalValue::S16(i16::from_le_bytes(take(src_bytes)?)),
        SignalKind::U16 => SignalValue::U16(u16::from_le_bytes(take(src_bytes)?)),
        SignalKind::S32 => SignalValue::S32(i32::from_le_bytes(take(src_bytes)?)),
        SignalKind::U32 => SignalValue::U32(u32::from_le_bytes(take(src_bytes)?)),
        SignalKind::Uint8N | SignalKind::GroupSignal => unreachable!("handled by is_bulk"),
    };

    pack(signal, buf, value)
}

fn store_word(kind: SignalKind, bit_size: u32, raw: u32, dst: &mut SignalValueMut) -> Result<(), ComError> {
    let field_mask = wire::mask(bit_size);
    let mut v = raw & field_mask;

    let is_signed = matches!(kind, SignalKind::S8 | SignalKind::S16 | SignalKind::S32);
    if is_signed && (v & (1 << (bit_size - 1))) != 0 {
        // field_mask >> 1 leaves the sign bit out of the mask; its one's
        // complement fills every bit above the field with 1, extending the
        // two's-complement sign into the full 32-bit word.
        let sign_mask = !(field_mask >> 1);
        v |= sign_mask;
    }

    match (kind, dst) {
        (SignalKind::S8, SignalValueMut::S8(out)) => **out = v as i32 as i8,
        (SignalKind::U8, SignalValueMut::U8(out)) => **out = v as u8,
        (SignalKind::S16, SignalValueMut::S16(out)) => **out = v as i32 as i16,
        (SignalKind::U16, SignalValueMut::U16(out)) => **out = v as u16,
        (SignalKind::S32, SignalValueMut::S32(out)) => **out = v as i32,
        (SignalKind::U32, SignalValueMut::U32(out)) => **out = v,
        _ => return Err(ComError::UnsupportedSignalType),
    }

    Ok(())
}

/// Receive path: unpack `signal` out of `buf` into `dst`.
///
/// Mirrors `comReceiveSignal`: the update-bit gate is checked first (clear
/// bit -> `NoUpdate`, no read at all); bulk signals are byte-copied; scalar
/// signals are extracted via the endian codec and sign-extended for signed
/// kinds before being narrowed into `dst`.
pub fn unpack(signal: &SignalConfig, buf: &mut [u8], dst: &mut SignalValueMut) -> Result<(), ComError> {
    if let Some(bit) = signal.update_bit {
        if !wire::get_bit(buf, bit) {
            return Err(ComError::NoUpdate);
        }
        wire::clear_bit(buf, bit);
    }

    if is_bulk(signal) {
        let SignalValueMut::Bytes(out) = dst else {
            return Err(ComError::UnsupportedSignalType);
        };
        let len = byte_len(signal);
        if out.len() < len {
            return Err(ComError::BufferTooSmall);
        }
        let start = signal.bit_position / 8;
        out[..len].copy_from_slice(&buf[start..start + len]);
        return Ok(());
    }

    let raw = match signal.endianness {
        Endianness::Little => wire::get_le(buf, signal.bit_position, signal.bit_size),
        Endianness::Big => wire::get_be(buf, signal.bit_position, signal.bit_size),
        Endianness::Opaque => unreachable!("handled by is_bulk"),
    };

    store_word(signal.kind, signal.bit_size, raw, dst)
}
