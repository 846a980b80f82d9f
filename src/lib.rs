pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod web;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command};

pub use config::AppConfig;
pub use core::pipeline::MusicPipeline;
pub use domain::model::{AudioClip, Composition, Image, MusicPrompt};
pub use utils::error::{ErrorKind, Result, SynesthesiaError};
