#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod aspect;
pub mod card;
pub mod carousel;
pub mod config;
pub mod data;
pub mod debug;
pub mod feed;
pub mod guard;
pub mod media;
pub mod playback;
pub mod post;
pub mod resolve;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
