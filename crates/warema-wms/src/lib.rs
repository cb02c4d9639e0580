// warema-wms: Async Rust client for Warema WMS WebControl shade gateways

pub mod client;
pub mod config;
mod discovery;
pub mod error;
pub mod model;
pub mod protocol;
pub mod shade;

pub use client::WmsClient;
pub use config::WmsConfig;
pub use error::Error;
pub use model::{Channel, Room, ShadeState};
pub use shade::{Shade, ShadeTuning};
