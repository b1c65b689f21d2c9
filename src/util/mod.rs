//! Shared utilities (hex formatting and hex dumps).

pub mod hex;
