//! Core types and pricing math for the market-maker simulator.
//!
//! Six market-maker variants are modeled: constant product (AMM), constant
//! sum (CSMM) and proactive (PMM), each either as pairwise pools or as one
//! pool shared by every token (MAMM, MCSMM, MPMM).

pub mod curve;
pub mod enums;
pub mod error;
pub mod math;
pub mod metrics;
pub mod pool;
pub mod swap;
pub mod token;
