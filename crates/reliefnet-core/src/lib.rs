//! ReliefNet Core — shared abstractions.
//!
//! This crate defines what every bounded context depends on: the retry
//! executor with error classification, the saga wire contracts, and small
//! shared primitives (clock, geography). It contains no infrastructure code.

pub mod clock;
pub mod contract;
pub mod geo;
pub mod retry;
