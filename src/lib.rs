//! # yee_rs
//!
//! An async Rust library for controlling Yeelight smart bulbs over the LAN
//! control protocol.
//!
//! This crate speaks the bulbs' native protocol directly: SSDP-style UDP
//! multicast discovery, then newline-delimited JSON commands over TCP to
//! the control port. LAN Control mode must be enabled on the bulb in the
//! Yeelight app.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use yee_rs::{CommandOptions, SessionConfig, Yeelight};
//!
//! async fn control_bulbs() -> Result<(), yee_rs::Error> {
//!     // Sweep the network for bulbs.
//!     let hub = Yeelight::new();
//!     let devices = hub.discover(Duration::from_secs(3)).await?;
//!
//!     // Open a session against the first one and dim it.
//!     let session = hub
//!         .create_session(&devices[0].id, SessionConfig::default())
//!         .await?;
//!     session.set_bright(30, &CommandOptions::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: Find bulbs via multicast search with [`Yeelight::discover`]
//! - **Full verb set**: Color, temperature, brightness, power, flows,
//!   scenes, timers, and relative adjustments on [`Session`]
//! - **Background lamp**: Every verb can target the ambilight half of a
//!   combo fixture via [`CommandOptions::background`]
//! - **Push updates**: A dedicated listen connection keeps the cached
//!   [`DeviceRecord`] current and fans changes out to [`Session::subscribe`]
//!   callbacks
//! - **Dry run**: Build and inspect exact wire payloads without a device
//!   using [`SessionConfig::dry_run`]
//! - **History**: Per-session ring buffer of wire traffic in
//!   [`MessageHistory`]
//!
//! ## Communication
//!
//! Discovery multicasts to `239.255.255.250:1982`; commands and pushes use
//! TCP to the control port (55443 by default) with CRLF-terminated JSON
//! lines. Commands are fire-and-forget on the write channel; state changes
//! come back asynchronously on the listen channel.

mod config;
mod device;
mod discovery;
mod errors;
mod history;
mod payload;
mod push;
pub mod range;
mod registry;
mod session;
mod types;
mod yeelight;

// Re-export public API
pub use config::{
    DEFAULT_EFFECT_DURATION_MS, DEFAULT_LISTEN_TIMEOUT, DEFAULT_WRITE_TIMEOUT, SessionConfig,
};
pub use device::{CONTROL_PORT, ColorMode, DeviceRecord};
pub use discovery::{DiscoverySearch, MULTICAST_ADDR};
pub use errors::Error;
pub use history::{HistoryEntry, MessageHistory, MessageType};
pub use payload::CommandPayload;
pub use push::{Notification, NotificationCallback};
pub use registry::Registry;
pub use session::{CommandOptions, CommandOutcome, Session};
pub use types::{
    AdjustAction, AdjustProp, CronType, Effect, FlowAction, FlowExpression, FlowMode, FlowStep,
    PowerOnMode, RgbValue, Scene,
};
pub use yeelight::Yeelight;
