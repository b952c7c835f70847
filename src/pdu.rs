//! PDU Buffer Store: the passive collaborator that owns the byte buffers
//! signals are packed into.
//!
//! This module has no state of its own; [`crate::com::Com`] owns the actual
//! buffers and scratch storage. What lives here is the one operation the
//! store is responsible for: initializing a PDU's buffer at group start.

use crate::config::{ComConfig, IPduConfig};
use crate::error::ComError;
use crate::signal::pack_raw;

/// Runs the send path for every signal in `pdu`, using each signal's current
/// scratch bytes (`scratch_of`) as source, so the PDU buffer ends up fully
/// defined even when the signals inside it do not tile every bit.
///
/// `scratch_of` maps a signal handle id to its current init/scratch bytes.
pub fn group_start_init<'a>(
    config: &ComConfig,
    pdu: &IPduConfig,
    buf: &mut [u8],
    mut scratch_of: impl FnMut(usize) -> &'a [u8],
) -> Result<(), ComError> {
    for &handle_id in pdu.signals {
        let signal = config
            .signals
            .get(handle_id)
            .ok_or(ComError::InvalidHandle)?;
        let src = scratch_of(handle_id);
        pack_raw(signal, buf, src)?;
    }
    Ok(())
}
