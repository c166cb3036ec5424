// Module: service

pub mod api_config;
pub mod image_relay;
pub mod session_store;

pub use api_config::{ApiConfig, ApiConfigStore, IMAGE_EDITS_PATH};
pub use image_relay::{ImageRelayClient, ImageRelayError};
pub use session_store::SessionStore;
