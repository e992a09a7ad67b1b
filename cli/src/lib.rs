//! # tunecraft
//!
//! Prompt composition and a typed client for a hosted generative-music API.
//!
//! ```ignore
//! use tunecraft::{Attribute, Attributes, ClientConfig, GenerationClient, GenerationRequest, MusicGenerator};
//!
//! let config = ClientConfig::new("https://api.aimlapi.com/".parse()?, Some(api_key));
//! let client = GenerationClient::new(config)?;
//! let mut attributes = Attributes::new().with(Attribute::Genre, "Jazz");
//! attributes.tempo_bpm(96);
//! let request = GenerationRequest::new("A rainy night in the city").with_attributes(attributes);
//! for track in client.generate(&request).await? {
//!     println!("{} -> {:?}", track.title, track.audio_url);
//! }
//! ```

pub mod client;
pub mod composer;
pub mod config;
pub mod download;
pub mod error;
pub mod history;
#[cfg(feature = "playback")]
pub mod playback;
pub mod render;
pub mod retry;
pub mod track;
pub mod transport;
pub mod types;
pub mod watch;

pub use client::{ClientConfig, GenerationClient, MusicGenerator};
pub use composer::{compose, Attribute, Attributes};
pub use error::GenerationError;
pub use track::Track;
pub use types::{GenerationMode, GenerationRequest};

/// Ordered tracks from one call, or the reason the call failed.
pub type GenerationResult = Result<Vec<Track>, GenerationError>;
