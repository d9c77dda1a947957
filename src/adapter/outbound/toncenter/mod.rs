//! toncenter v2 transaction source.

mod client;
pub mod dto;
mod settings;

pub use client::ToncenterClient;
pub use settings::ToncenterConfig;
