//! # rai-state — Session Pipeline State Machine
//!
//! The client-side cursor over a compliance session's seven-stage pipeline.
//! The server-held [`Session`](rai_core::Session) record is authoritative;
//! [`SessionMachine`] is an advisory mirror that answers transition-legality
//! questions locally and is resynced after every server round trip.

pub mod machine;

pub use machine::{SessionMachine, StageTransitionRecord, TransitionError};
