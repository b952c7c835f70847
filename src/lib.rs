//! An AUTOSAR-style signal/I-PDU communication layer.
//!
//! This crate packs and unpacks application-level signals into fixed-layout
//! I-PDU byte buffers, schedules their cyclic transmission and reception
//! timeout supervision, and exchanges buffers with a lower-layer router
//! through the [`scheduler::PduR`] trait. It is a fixed-capacity, `no_std`
//! library: every collection is sized by const generics chosen by the
//! integrator, and nothing here spawns a thread or touches an async
//! executor. [`com::Com::main_function`] is meant to be driven from whatever
//! periodic tick the platform already has.
//!
//! The bit-level field packing itself lives in the separate
//! [`autocom_wire`] crate, kept free of everything above a byte buffer so it
//! can be reused or tested on its own.
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod log;

pub mod com;
pub mod config;
pub mod error;
pub mod group;
pub mod pdu;
pub mod scheduler;
pub mod signal;

pub use com::Com;
pub use error::ComError;
pub use scheduler::{PduR, TxResult};
