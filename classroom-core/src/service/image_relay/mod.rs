//! Upstream image-edit relay

pub mod client;
pub mod error;

pub use client::ImageRelayClient;
pub use error::ImageRelayError;
