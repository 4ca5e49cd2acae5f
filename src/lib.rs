//! Uzhavan - a farming assistant that answers in simple Tamil
//!
//! Questions, typed or spoken, are answered from a local corpus of
//! agricultural text: the question is embedded, the closest corpus chunks are
//! found by cosine similarity, and a hosted language model writes a short
//! answer in simple Tamil from those chunks. Voice mode adds push-to-talk
//! recording, speech recognition and a spoken reply.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `corpus` - The embedded chunk collection and the chunker that builds it
//! - `retrieval` - Cosine similarity and top-k ranking
//! - `embedding` - Query and document embeddings
//! - `generation` - Answer generation
//! - `rag` - Retrieval plus generation for one question
//! - `audio` - Microphone capture and playback
//! - `transcription` - Speech recognition
//! - `speech` - Text-to-speech
//! - `voice` - Push-to-talk session state and capture cycles
//! - `orchestrator` - Component wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use uzhavan::config::Settings;
//! use uzhavan::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let response = orchestrator
//!         .rag_engine()
//!         .answer("தக்காளிக்கு எவ்வளவு தண்ணீர் வேண்டும்?")
//!         .await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod retry;
pub mod speech;
pub mod transcription;
pub mod voice;

pub use error::{Result, UzhavanError};
