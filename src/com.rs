//! The public entry point: [`Com`], a fixed-capacity COM layer instance.
//!
//! `Com` owns every piece of runtime state (PDU buffers, per-signal scratch
//! bytes, timers and the group-enable bitmap) and is otherwise a thin
//! dispatcher onto [`crate::signal`], [`crate::pdu`], [`crate::group`] and
//! [`crate::scheduler`], which hold the actual logic as free functions over
//! borrowed state. Capacities are const generics, sized by the integrator
//! per target the way `ethercrab`'s `SlaveGroup<MAX_SLAVES>` sizes its own
//! storage, so nothing here allocates.

use heapless::Vec;

use crate::config::{ComConfig, MAX_SIGNAL_BYTES};
use crate::error::ComError;
use crate::group;
use crate::pdu;
use crate::scheduler::{self, PduR, TxResult};
use crate::signal::{self, SignalValue, SignalValueMut};

/// A COM layer instance sized for up to `MAX_PDUS` I-PDUs, `MAX_SIGNALS`
/// signals, each PDU at most `MAX_PDU_LEN` bytes long.
pub struct Com<'cfg, const MAX_PDUS: usize, const MAX_SIGNALS: usize, const MAX_PDU_LEN: usize> {
    config: ComConfig<'cfg>,
    buffers: Vec<Vec<u8, MAX_PDU_LEN>, MAX_PDUS>,
    scratch: Vec<Vec<u8, MAX_SIGNAL_BYTES>, MAX_SIGNALS>,
    timers: Vec<u32, MAX_PDUS>,
    group_status: u32,
}

impl<'cfg, const MAX_PDUS: usize, const MAX_SIGNALS: usize, const MAX_PDU_LEN: usize>
    Com<'cfg, MAX_PDUS, MAX_SIGNALS, MAX_PDU_LEN>
{
    /// Builds a `Com` instance from `config`, seeding every PDU buffer to
    /// zero and every signal's scratch region from its `init_bytes`.
    ///
    /// Fails with [`ComError::CapacityExceeded`] if `config` has more PDUs or
    /// signals than this instance's const-generic capacity, or any PDU is
    /// longer than `MAX_PDU_LEN`, or any signal's `init_bytes` is longer than
    /// [`MAX_SIGNAL_BYTES`].
    pub fn new(config: ComConfig<'cfg>) -> Result<Self, ComError> {
        if config.pdus.len() > MAX_PDUS || config.signals.len() > MAX_SIGNALS {
            return Err(ComError::CapacityExceeded);
        }

        let mut buffers = Vec::new();
        for p in config.pdus {
            let mut b = Vec::new();
            b.resize(p.length, 0u8).map_err(|_| ComError::CapacityExceeded)?;
            buffers.push(b).map_err(|_| ComError::CapacityExceeded)?;
        }

        let mut scratch = Vec::new();
        for s in config.signals {
            let mut b = Vec::new();
            b.extend_from_slice(s.init_bytes).map_err(|_| ComError::CapacityExceeded)?;
            scratch.push(b).map_err(|_| ComError::CapacityExceeded)?;
        }

        let mut timers = Vec::new();
        for _ in config.pdus {
            timers.push(0).map_err(|_| ComError::CapacityExceeded)?;
        }

        debug!("com: initialized with {} pdus, {} signals", config.pdus.len(), config.signals.len());

        Ok(Self {
            config,
            buffers,
            scratch,
            timers,
            group_status: 0,
        })
    }

    /// Enables `group_id`. When `initialize` is set, every member PDU's
    /// buffer is re-derived from its signals' current scratch bytes first
    /// (mirroring `Com_IpduGroupStart`'s `InitialiseAllSignals` argument);
    /// every member PDU's timer is (re)armed either way.
    pub fn start_group(&mut self, group_id: u8, initialize: bool) -> Result<(), ComError> {
        let bit = group::group_bit(&self.config, group_id)?;
        self.group_status |= bit;

        for (idx, p) in self.config.pdus.iter().enumerate() {
            if p.group_mask & bit == 0 {
                continue;
            }
            if initialize {
                let scratch = &self.scratch;
                pdu::group_start_init(&self.config, p, &mut self.buffers[idx], |h| {
                    scratch[h].as_slice()
                })?;
            }
            self.timers[idx] = group::rearm_ticks(p);
        }

        trace!("com: group {} started (initialize={})", group_id, initialize);
        Ok(())
    }

    /// Disables `group_id`. Member PDUs keep their buffers and timers but
    /// stop being scheduled or timeout-supervised until started again.
    pub fn stop_group(&mut self, group_id: u8) -> Result<(), ComError> {
        let bit = group::group_bit(&self.config, group_id)?;
        self.group_status &= !bit;
        trace!("com: group {} stopped", group_id);
        Ok(())
    }

    /// Packs `value` into its owning PDU's buffer, setting the signal's
    /// update bit (if configured). Rejects `GroupSignal`s and raw bulk
    /// signals, which go through [`Com::send_signal_group`] instead.
    pub fn send_signal(&mut self, handle_id: usize, value: SignalValue) -> Result<(), ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        let buf = self.buffers.get_mut(signal.pdu_index).ok_or(ComError::InvalidHandle)?;
        signal::pack(signal, buf, value)
    }

    /// Unpacks `handle_id` out of its owning PDU's buffer into `out`.
    /// Returns [`ComError::NoUpdate`] without modifying `out` if the
    /// signal's update bit is configured and currently clear.
    pub fn receive_signal(&mut self, handle_id: usize, out: &mut SignalValueMut) -> Result<(), ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        let buf = self.buffers.get_mut(signal.pdu_index).ok_or(ComError::InvalidHandle)?;
        signal::unpack(signal, buf, out)
    }

    /// Stages raw bytes for a `GroupSignal` into its own scratch region,
    /// without touching the owning PDU's buffer or any update bit.
    ///
    /// Mirrors `Com_SendSignalGroup`'s staging half: the PDU's buffer only
    /// picks up the change once [`Com::send_signal_group`] (or a group
    /// start with `initialize = true`) actually applies it.
    pub fn stage_group_signal(&mut self, handle_id: usize, bytes: &[u8]) -> Result<(), ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        if !matches!(signal.kind, crate::config::SignalKind::GroupSignal) {
            return Err(ComError::UnsupportedSignalType);
        }
        let scratch = self.scratch.get_mut(handle_id).ok_or(ComError::InvalidHandle)?;
        if bytes.len() > scratch.capacity() {
            return Err(ComError::BufferTooSmall);
        }
        scratch.clear();
        scratch.extend_from_slice(bytes).map_err(|_| ComError::BufferTooSmall)?;
        Ok(())
    }

    /// Applies `handle_id`'s currently staged scratch bytes into its owning
    /// PDU's buffer. Group signals carry no update bit of their own; the
    /// owning PDU's own signals' update bits are unaffected.
    pub fn send_signal_group(&mut self, handle_id: usize) -> Result<(), ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        if !matches!(signal.kind, crate::config::SignalKind::GroupSignal) {
            return Err(ComError::UnsupportedSignalType);
        }
        let bytes = self.scratch.get(handle_id).ok_or(ComError::InvalidHandle)?.clone();
        let buf = self.buffers.get_mut(signal.pdu_index).ok_or(ComError::InvalidHandle)?;
        signal::pack(signal, buf, SignalValue::Bytes(&bytes))
    }

    /// Copies `handle_id`'s bytes out of its owning PDU's buffer into its own
    /// scratch region, unconditionally: group signals carry no update bit to
    /// gate on. Use [`Com::group_signal_bytes`] to read the result.
    ///
    /// Mirrors `Com_ReceiveSignalGroup(SignalGroupId)`, which has no
    /// destination parameter at all and writes straight into
    /// `signal->initPtr`: that scratch/init-value region is the shadow
    /// buffer [`Com::send_signal_group`] reads from, per `spec.md` §9's Open
    /// Question resolution, so a receive must land there too, not in a
    /// caller-supplied buffer that `send_signal_group` would never see
    /// again.
    pub fn receive_signal_group(&mut self, handle_id: usize) -> Result<(), ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        if !matches!(signal.kind, crate::config::SignalKind::GroupSignal) {
            return Err(ComError::UnsupportedSignalType);
        }
        let buf = self.buffers.get_mut(signal.pdu_index).ok_or(ComError::InvalidHandle)?;
        let len = (signal.bit_size / 8) as usize;
        let scratch = self.scratch.get_mut(handle_id).ok_or(ComError::InvalidHandle)?;
        scratch.clear();
        scratch.resize(len, 0u8).map_err(|_| ComError::BufferTooSmall)?;
        signal::unpack(signal, buf, &mut SignalValueMut::Bytes(scratch.as_mut_slice()))
    }

    /// Reads `handle_id`'s currently staged group-signal bytes: whatever was
    /// last passed to [`Com::stage_group_signal`] or landed there via
    /// [`Com::receive_signal_group`].
    pub fn group_signal_bytes(&self, handle_id: usize) -> Result<&[u8], ComError> {
        let signal = self.config.signals.get(handle_id).ok_or(ComError::InvalidHandle)?;
        if !matches!(signal.kind, crate::config::SignalKind::GroupSignal) {
            return Err(ComError::UnsupportedSignalType);
        }
        Ok(self.scratch.get(handle_id).ok_or(ComError::InvalidHandle)?.as_slice())
    }

    /// Ages every RX I-PDU's reception timer by one tick, firing `on_timeout`
    /// for any that reach zero. Exposed separately from [`Com::main_function`]
    /// for integrators that schedule RX and TX supervision from different
    /// periodic tasks.
    pub fn main_function_rx(&mut self) {
        scheduler::main_function_rx(&self.config, self.group_status, &mut self.timers);
    }

    /// Ages every TX I-PDU's cyclic send timer by one tick, handing any PDU
    /// whose timer elapses to `pdu_r`. Exposed separately from
    /// [`Com::main_function`] for integrators that schedule RX and TX
    /// supervision from different periodic tasks.
    pub fn main_function_tx(&mut self, pdu_r: &mut impl PduR) {
        scheduler::main_function_tx(&self.config, self.group_status, &mut self.timers, &mut self.buffers, pdu_r);
    }

    /// Runs one scheduler tick: [`Com::main_function_rx`] then
    /// [`Com::main_function_tx`], matching `spec.md` §5's fixed
    /// rx-before-tx ordering within a tick.
    pub fn main_function(&mut self, pdu_r: &mut impl PduR) {
        self.main_function_rx();
        self.main_function_tx(pdu_r);
    }

    /// Delivers a freshly received frame for `pdu_index`.
    pub fn rx_indication(&mut self, pdu_index: usize, frame: &[u8]) -> Result<(), ComError> {
        let buf = self.buffers.get_mut(pdu_index).ok_or(ComError::InvalidHandle)?;
        let timer = self.timers.get_mut(pdu_index).ok_or(ComError::InvalidHandle)?;
        scheduler::rx_indication(&self.config, pdu_index, frame, self.group_status, buf, timer)
    }

    /// Reports an asynchronous transmit outcome for `pdu_index`. A no-op if
    /// the PDU's group is not currently enabled.
    pub fn tx_confirmation(&mut self, pdu_index: usize, result: TxResult) -> Result<(), ComError> {
        scheduler::tx_confirmation(&self.config, pdu_index, self.group_status, result)
    }

    /// Copies `pdu_index`'s current buffer into `out`, for a lower layer
    /// that pulls data rather than being pushed to.
    pub fn trigger_transmit(&self, pdu_index: usize, out: &mut [u8]) -> Result<(), ComError> {
        let buf = self.buffers.get(pdu_index).ok_or(ComError::InvalidHandle)?;
        scheduler::trigger_transmit(&self.config, pdu_index, buf, out)
    }

    /// Sends `pdu_index` immediately, outside its cyclic schedule, clearing
    /// its signals' update bits on success (aligned with
    /// [`Com::main_function`]'s cyclic TX path). Reports `TxResult::NotOk`
    /// without transmitting if the PDU's group is not currently enabled.
    pub fn trigger_ipdu_send(&mut self, pdu_index: usize, pdu_r: &mut impl PduR) -> Result<TxResult, ComError> {
        let buf = self.buffers.get_mut(pdu_index).ok_or(ComError::InvalidHandle)?;
        scheduler::trigger_ipdu_send(&self.config, pdu_index, self.group_status, buf, pdu_r)
    }
}
