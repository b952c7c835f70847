//! Scheduler: cyclic transmission, reception timeout supervision, and the
//! indication protocol exchanged with the lower-layer router (PduR).
//!
//! Like [`crate::pdu`] and [`crate::group`], this module is a set of pure
//! functions operating on state [`crate::com::Com`] owns and passes in by
//! reference; nothing here is itself stateful.

use crate::config::{ComConfig, Direction, IPduConfig};
use crate::error::ComError;

/// Outcome PduR reports back for a transmit attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum TxResult {
    Ok,
    NotOk,
}

/// The lower-layer router this COM layer hands outgoing I-PDUs to.
///
/// `tx_pdu_id` is the id from the PDU's [`crate::config::TxConfig`], not its
/// index into [`ComConfig::pdus`]: PduR has its own, separately configured
/// numbering for the frames it routes.
pub trait PduR {
    fn transmit(&mut self, tx_pdu_id: u32, bytes: &[u8]) -> TxResult;
}

/// Advances every RX I-PDU's reception timer by one tick, firing
/// `on_timeout` and latching at `0` for any that reach it without an
/// intervening [`rx_indication`].
///
/// Mirrors `Com_MainFunctionRx`: a PDU whose timer is already `0` (group not
/// started, or already timed out and not yet re-received) is left alone
/// rather than re-firing every tick.
pub fn main_function_rx(config: &ComConfig, group_status: u32, timers: &mut [u32]) {
    for (idx, p) in config.pdus.iter().enumerate() {
        let Direction::Rx(rx) = &p.direction else {
            continue;
        };
        if p.group_mask & group_status == 0 {
            continue;
        }
        if timers[idx] == 0 {
            continue;
        }
        timers[idx] -= 1;
        if timers[idx] == 0 {
            debug!("scheduler: rx timeout on pdu {}", idx);
            if let Some(cb) = rx.on_timeout {
                cb();
            }
        }
    }
}

/// Advances every TX I-PDU's cyclic send timer by one tick, handing any PDU
/// whose timer reaches `0` to `pdu_r.transmit` and reloading the timer from
/// `cycle_ticks` on success or `1` (immediate retry) on failure. Transmitted
/// PDUs have their update bits cleared on success.
///
/// Mirrors `Com_MainFunctionTx`: notably, neither it nor this function calls
/// `on_tx_confirm`/`on_tx_error`, those only fire from [`tx_confirmation`],
/// the separate event PduR raises once it actually knows the outcome. The
/// `TxResult` returned by `pdu_r.transmit` here is just the synchronous
/// submission result used for timer bookkeeping, not a stand-in for that
/// later confirmation.
pub fn main_function_tx(
    config: &ComConfig,
    group_status: u32,
    timers: &mut [u32],
    buffers: &mut [impl AsMut<[u8]>],
    pdu_r: &mut impl PduR,
) {
    for (idx, p) in config.pdus.iter().enumerate() {
        let Direction::Tx(tx) = &p.direction else {
            continue;
        };
        if p.group_mask & group_status == 0 {
            continue;
        }
        if timers[idx] == 0 {
            continue;
        }
        timers[idx] -= 1;
        if timers[idx] != 0 {
            continue;
        }

        let buf = buffers[idx].as_mut();
        match pdu_r.transmit(tx.tx_pdu_id, buf) {
            TxResult::Ok => {
                timers[idx] = tx.cycle_ticks;
                clear_update_bits(config, p, buf);
            }
            TxResult::NotOk => {
                warn!("scheduler: tx failed for pdu {}, retrying next tick", idx);
                timers[idx] = 1;
            }
        }
    }
}

/// Runs [`main_function_rx`] then [`main_function_tx`] for one tick.
pub fn main_function(
    config: &ComConfig,
    group_status: u32,
    rx_timers: &mut [u32],
    tx_timers: &mut [u32],
    buffers: &mut [impl AsMut<[u8]>],
    pdu_r: &mut impl PduR,
) {
    main_function_rx(config, group_status, rx_timers);
    main_function_tx(config, group_status, tx_timers, buffers, pdu_r);
}

/// Delivers a freshly received frame for `pdu_index` into its buffer,
/// re-arms its reception timer from `timeout_ticks`, and fires `on_rx`.
///
/// Mirrors `Com_RxIndication`: a `frame` shorter than the PDU's configured
/// length is silently dropped (not an error); the RX timer keeps counting
/// down and will eventually time out. A `frame` at least as long as the PDU
/// (e.g. a padded CAN FD frame) has its first `pdu.length` bytes copied in.
/// Update bits are part of the received frame itself (set by the sender), so
/// this just stores whatever bytes arrived; [`crate::signal::unpack`] reads
/// and clears them per-signal afterwards.
pub fn rx_indication(
    config: &ComConfig,
    pdu_index: usize,
    frame: &[u8],
    group_status: u32,
    buf: &mut [u8],
    timer: &mut u32,
) -> Result<(), ComError> {
    let p = config.pdus.get(pdu_index).ok_or(ComError::InvalidHandle)?;
    let rx = p.rx().ok_or(ComError::UnsupportedSignalType)?;
    if p.group_mask & group_status == 0 {
        return Ok(());
    }
    if frame.len() < p.length {
        return Ok(());
    }

    buf.copy_from_slice(&frame[..p.length]);
    *timer = rx.timeout_ticks;
    if let Some(cb) = rx.on_rx {
        cb();
    }
    Ok(())
}

/// Reports the outcome of a transmission PduR carried out on our behalf for
/// `pdu_index`, mirroring `Com_TxConfirmation`. This is the only place
/// `on_tx_confirm`/`on_tx_error` are invoked; [`main_function_tx`] itself
/// stays silent on the outcome beyond its own timer/update-bit bookkeeping.
/// The timer is not touched here; the cyclic schedule already reloaded it
/// from the synchronous `transmit` result.
///
/// A PDU whose group is not currently enabled is not "known and active" per
/// `spec.md` §4.E/§6, so neither callback fires, matching
/// `Com_TxConfirmation`'s own `GroupStatus & GroupRefMask` guard.
pub fn tx_confirmation(
    config: &ComConfig,
    pdu_index: usize,
    group_status: u32,
    result: TxResult,
) -> Result<(), ComError> {
    let p = config.pdus.get(pdu_index).ok_or(ComError::InvalidHandle)?;
    let tx = p.tx().ok_or(ComError::UnsupportedSignalType)?;
    if p.group_mask & group_status == 0 {
        return Ok(());
    }
    match result {
        TxResult::Ok => {
            if let Some(cb) = tx.on_tx_confirm {
                cb();
            }
        }
        TxResult::NotOk => {
            if let Some(cb) = tx.on_tx_error {
                cb();
            }
        }
    }
    Ok(())
}

/// Copies `pdu_index`'s current buffer contents into `out`, for a lower
/// layer pulling data on demand (e.g. a CAN controller's transmit
/// interrupt) rather than being pushed to via [`PduR::transmit`].
///
/// Mirrors `Com_TriggerTransmit`.
pub fn trigger_transmit(config: &ComConfig, pdu_index: usize, buf: &[u8], out: &mut [u8]) -> Result<(), ComError> {
    let p = config.pdus.get(pdu_index).ok_or(ComError::InvalidHandle)?;
    if p.tx().is_none() {
        return Err(ComError::UnsupportedSignalType);
    }
    if out.len() < p.length || buf.len() != p.length {
        return Err(ComError::BufferTooSmall);
    }
    out[..p.length].copy_from_slice(buf);
    Ok(())
}

/// Sends `pdu_index` immediately, outside its cyclic schedule.
///
/// Mirrors `Com_TriggerIPDUSend`'s transmit/re-arm/retry semantics, including
/// its group-enable guard (`IPduConfig->txConfig && GroupStatus &
/// GroupRefMask`): a PDU whose group is not currently enabled is never
/// handed to `pdu_r`, and this reports `TxResult::NotOk` without side
/// effects, the same way the reference implementation leaves `ret` at its
/// `E_NOT_OK` default when that condition is false. Unlike the reference
/// implementation, a successful send here *does* clear the PDU's update
/// bits, aligned with [`main_function_tx`] per this crate's resolution of
/// that ambiguity (see `DESIGN.md`). `buf` must be mutable so the clear can
/// be applied; callers that only need the read-only transmit semantics can
/// pass a PDU buffer with no update bits configured.
pub fn trigger_ipdu_send(
    config: &ComConfig,
    pdu_index: usize,
    group_status: u32,
    buf: &mut [u8],
    pdu_r: &mut impl PduR,
) -> Result<TxResult, ComError> {
    let p = config.pdus.get(pdu_index).ok_or(ComError::InvalidHandle)?;
    let tx = p.tx().ok_or(ComError::UnsupportedSignalType)?;
    if p.group_mask & group_status == 0 {
        return Ok(TxResult::NotOk);
    }
    let result = pdu_r.transmit(tx.tx_pdu_id, buf);
    if result == TxResult::Ok {
        clear_update_bits(config, p, buf);
    }
    Ok(result)
}

fn clear_update_bits(config: &ComConfig, p: &IPduConfig, buf: &mut [u8]) {
    for &handle_id in p.signals {
        if let Some(signal) = config.signals.get(handle_id) {
            if let Some(bit) = signal.update_bit {
                autocom_wire::clear_bit(buf, bit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endianness, RxConfig, SignalConfig, SignalKind, TxConfig};

    struct Recorder {
        sent: heapless::Vec<(u32, heapless::Vec<u8, 8>), 8>,
        result: TxResult,
    }

    impl PduR for Recorder {
        fn transmit(&mut self, tx_pdu_id: u32, bytes: &[u8]) -> TxResult {
            let _ = self.sent.push((tx_pdu_id, heapless::Vec::from_slice(bytes).unwrap()));
            self.result
        }
    }

    fn tx_pdu(cycle_ticks: u32, first_time_ticks: u32) -> IPduConfig {
        IPduConfig {
            length: 1,
            signals: &[0],
            group_mask: 1,
            direction: Direction::Tx(TxConfig {
                cycle_ticks,
                first_time_ticks,
                tx_pdu_id: 42,
                on_tx_confirm: None,
                on_tx_error: None,
            }),
        }
    }

    const SIGNALS: [SignalConfig; 1] = [SignalConfig {
        handle_id: 0,
        kind: SignalKind::U8,
        endianness: Endianness::Little,
        pdu_index: 0,
        bit_position: 0,
        bit_size: 8,
        update_bit: Some(8),
        init_bytes: &[0],
    }];

    #[test]
    fn cyclic_tx_fires_on_first_time_ticks_then_every_cycle() {
        let pdus = [tx_pdu(5, 2)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timers = [2u32];
        let mut bufs = [[0xAAu8, 0x01]]; // update bit (bit 8) set
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::Ok,
        };

        for _tick in 0..17 {
            main_function_tx(&config, 1, &mut timers, &mut bufs, &mut pdu_r);
        }

        // first_time_ticks=2, then every cycle_ticks=5: fires at ticks 2,7,12,17
        assert_eq!(pdu_r.sent.len(), 4);
        assert!(pdu_r.sent.iter().all(|(id, _)| *id == 42));
    }

    #[test]
    fn successful_cyclic_tx_clears_update_bits() {
        let pdus = [tx_pdu(3, 0)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timers = [3u32];
        let mut bufs = [[0xAAu8, 0x01]];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::Ok,
        };

        main_function_tx(&config, 1, &mut timers, &mut bufs, &mut pdu_r);
        main_function_tx(&config, 1, &mut timers, &mut bufs, &mut pdu_r);
        main_function_tx(&config, 1, &mut timers, &mut bufs, &mut pdu_r);

        assert_eq!(bufs[0][1] & 1, 0);
        assert_eq!(timers[0], 3); // reloaded
    }

    #[test]
    fn failed_cyclic_tx_does_not_clear_update_bits() {
        let pdus = [tx_pdu(1, 0)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timers = [1u32];
        let mut bufs = [[0xAAu8, 0x01]];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::NotOk,
        };

        main_function_tx(&config, 1, &mut timers, &mut bufs, &mut pdu_r);

        assert_eq!(bufs[0][1] & 1, 1);
        assert_eq!(timers[0], 1); // retry next tick, not reloaded to cycle_ticks
    }

    #[test]
    fn ungrouped_pdu_is_not_scheduled() {
        let pdus = [tx_pdu(1, 1)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timers = [1u32];
        let mut bufs = [[0u8, 0u8]];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::Ok,
        };

        main_function_tx(&config, 0 /* group not started */, &mut timers, &mut bufs, &mut pdu_r);

        assert!(pdu_r.sent.is_empty());
    }

    fn rx_pdu(timeout_ticks: u32, first_timeout_ticks: u32) -> IPduConfig {
        IPduConfig {
            length: 2,
            signals: &[],
            group_mask: 1,
            direction: Direction::Rx(RxConfig {
                timeout_ticks,
                first_timeout_ticks,
                on_rx: None,
                on_timeout: None,
            }),
        }
    }

    #[test]
    fn rx_timeout_latches_at_zero_and_does_not_rearm_itself() {
        let pdus = [rx_pdu(4, 1)];
        let config = ComConfig {
            signals: &[],
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timers = [1u32];

        main_function_rx(&config, 1, &mut timers); // fires at tick 1
        assert_eq!(timers[0], 0);

        main_function_rx(&config, 1, &mut timers);
        main_function_rx(&config, 1, &mut timers);
        assert_eq!(timers[0], 0); // stays latched, no self-rearm
    }

    #[test]
    fn rx_indication_stores_frame_and_rearms_timeout() {
        let pdus = [rx_pdu(4, 1)];
        let config = ComConfig {
            signals: &[],
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timer = 0u32;
        let mut buf = [0u8; 2];

        rx_indication(&config, 0, &[0x11, 0x22], 1, &mut buf, &mut timer).unwrap();

        assert_eq!(buf, [0x11, 0x22]);
        assert_eq!(timer, 4);
    }

    #[test]
    fn rx_indication_on_pdu_outside_started_group_is_ignored() {
        let pdus = [rx_pdu(4, 1)];
        let config = ComConfig {
            signals: &[],
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timer = 9u32;
        let mut buf = [0xFFu8; 2];

        rx_indication(&config, 0, &[0x11, 0x22], 0 /* group not started */, &mut buf, &mut timer).unwrap();

        assert_eq!(buf, [0xFF, 0xFF]);
        assert_eq!(timer, 9);
    }

    #[test]
    fn trigger_ipdu_send_clears_update_bits_on_success() {
        let pdus = [tx_pdu(5, 0)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut buf = [0xAAu8, 0x01];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::Ok,
        };

        let result = trigger_ipdu_send(&config, 0, 1, &mut buf, &mut pdu_r).unwrap();

        assert_eq!(result, TxResult::Ok);
        assert_eq!(buf[1] & 1, 0); // aligned with main_function_tx
        assert_eq!(pdu_r.sent[0].1.as_slice(), &[0xAAu8, 0x01]);
    }

    #[test]
    fn trigger_ipdu_send_leaves_update_bits_on_failure() {
        let pdus = [tx_pdu(5, 0)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut buf = [0xAAu8, 0x01];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::NotOk,
        };

        let result = trigger_ipdu_send(&config, 0, 1, &mut buf, &mut pdu_r).unwrap();

        assert_eq!(result, TxResult::NotOk);
        assert_eq!(buf[1] & 1, 1);
    }

    #[test]
    fn trigger_ipdu_send_on_stopped_group_is_not_ok_and_does_not_transmit() {
        let pdus = [tx_pdu(5, 0)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let mut buf = [0xAAu8, 0x01];
        let mut pdu_r = Recorder {
            sent: heapless::Vec::new(),
            result: TxResult::Ok,
        };

        let result = trigger_ipdu_send(&config, 0, 0 /* group not started */, &mut buf, &mut pdu_r).unwrap();

        assert_eq!(result, TxResult::NotOk);
        assert!(pdu_r.sent.is_empty());
        assert_eq!(buf[1] & 1, 1, "update bit must not be cleared when the send never happened");
    }

    fn tx_pdu_with_callbacks(on_tx_confirm: Option<fn()>, on_tx_error: Option<fn()>) -> IPduConfig {
        IPduConfig {
            length: 1,
            signals: &[0],
            group_mask: 1,
            direction: Direction::Tx(TxConfig {
                cycle_ticks: 5,
                first_time_ticks: 0,
                tx_pdu_id: 42,
                on_tx_confirm,
                on_tx_error,
            }),
        }
    }

    static TX_CONFIRM_CALLS: core::sync::atomic::AtomicU32 = core::sync::atomic::AtomicU32::new(0);
    fn record_tx_confirm() {
        TX_CONFIRM_CALLS.fetch_add(1, core::sync::atomic::Ordering::SeqCst);
    }

    #[test]
    fn tx_confirmation_fires_callback_for_active_pdu() {
        let pdus = [tx_pdu_with_callbacks(Some(record_tx_confirm), None)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let before = TX_CONFIRM_CALLS.load(core::sync::atomic::Ordering::SeqCst);

        tx_confirmation(&config, 0, 1 /* group enabled */, TxResult::Ok).unwrap();

        assert_eq!(TX_CONFIRM_CALLS.load(core::sync::atomic::Ordering::SeqCst), before + 1);
    }

    #[test]
    fn tx_confirmation_is_silent_for_pdu_in_stopped_group() {
        let pdus = [tx_pdu_with_callbacks(Some(record_tx_confirm), None)];
        let config = ComConfig {
            signals: &SIGNALS,
            pdus: &pdus,
            num_groups: 1,
        };
        let before = TX_CONFIRM_CALLS.load(core::sync::atomic::Ordering::SeqCst);

        tx_confirmation(&config, 0, 0 /* group not started */, TxResult::Ok).unwrap();

        assert_eq!(TX_CONFIRM_CALLS.load(core::sync::atomic::Ordering::SeqCst), before);
    }

    #[test]
    fn rx_indication_accepts_frame_longer_than_pdu() {
        let pdus = [rx_pdu(4, 1)];
        let config = ComConfig {
            signals: &[],
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timer = 0u32;
        let mut buf = [0u8; 2];

        // a padded 4-byte CAN frame for a 2-byte PDU
        rx_indication(&config, 0, &[0x11, 0x22, 0xAA, 0xAA], 1, &mut buf, &mut timer).unwrap();

        assert_eq!(buf, [0x11, 0x22]);
        assert_eq!(timer, 4);
    }

    #[test]
    fn rx_indication_drops_short_frame_without_error() {
        let pdus = [rx_pdu(4, 1)];
        let config = ComConfig {
            signals: &[],
            pdus: &pdus,
            num_groups: 1,
        };
        let mut timer = 9u32;
        let mut buf = [0xFFu8; 2];

        let result = rx_indication(&config, 0, &[0x11], 1, &mut buf, &mut timer);

        assert_eq!(result, Ok(()));
        assert_eq!(buf, [0xFF, 0xFF]); // untouched
        assert_eq!(timer, 9); // timer keeps counting down elsewhere, not rearmed here
    }
}
