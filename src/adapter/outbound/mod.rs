//! Outbound adapters (driven side).

pub mod http;
pub mod memory;
pub mod relay;
pub mod sqlite;
pub mod toncenter;
