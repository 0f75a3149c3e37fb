//! HTTP backend that turns a user utterance into a spoken AI reply.
//!
//! A request runs two hosted services in sequence: a conversational model
//! writes the reply, and a speech provider renders it to an MP3 that is
//! served back from `/audio`.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod tts;
pub mod utils;

pub use config::Config;
pub use routes::create_app;
pub use state::AppState;
