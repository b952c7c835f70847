//! Group Controller: enables and disables I-PDU groups.
//!
//! A group is nothing more than a bit in `group_status`. [`crate::com::Com`]
//! owns that bitmap along with the actual buffers and timers, so the logic
//! here is split into small pure helpers that `Com` drives while iterating
//! its own storage, avoiding handing out overlapping mutable borrows through
//! a closure just to stay "centralized" in this module.

use crate::config::{ComConfig, Direction, IPduConfig};
use crate::error::ComError;

/// Returns the bitmask for `group_id`, or `InvalidHandle` if it is out of
/// range for `config.num_groups`.
pub fn group_bit(config: &ComConfig, group_id: u8) -> Result<u32, ComError> {
    if group_id >= config.num_groups {
        return Err(ComError::InvalidHandle);
    }
    Ok(1u32 << group_id)
}

/// The tick count a PDU's timer should be (re)armed to on group start.
///
/// Mirrors `Com_IpduGroupStart`: the first-arming period
/// (`first_timeout_ticks`/`first_time_ticks`) is used when configured
/// nonzero, falling back to the steady-state period otherwise. PDUs that are
/// neither RX nor TX are not timer-driven at all.
pub fn rearm_ticks(pdu: &IPduConfig) -> u32 {
    match &pdu.direction {
        Direction::Rx(rx) => {
            if rx.first_timeout_ticks > 0 {
                rx.first_timeout_ticks
            } else {
                rx.timeout_ticks
            }
        }
        Direction::Tx(tx) => {
            if tx.first_time_ticks > 0 {
                tx.first_time_ticks
            } else {
                tx.cycle_ticks
            }
        }
        Direction::PassThrough => 0,
    }
}
