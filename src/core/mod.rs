pub mod captioner;
pub mod composer;
pub mod http;
pub mod pipeline;

pub use crate::domain::model::{AudioClip, Composition, Image, MusicPrompt};
pub use crate::domain::ports::{Captioner, Composer};
pub use crate::utils::error::Result;
