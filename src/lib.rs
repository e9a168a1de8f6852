//! Live virtual makeup over a webcam feed, plus the HTTP relay that keeps
//! saved looks in a cloud bucket.

pub mod client;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod makeup;
pub mod model_download;
pub mod pipeline;
pub mod relay;
pub mod types;
#[cfg(feature = "gui")]
pub mod ui;
