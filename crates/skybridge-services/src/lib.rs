//! Skybridge Services Library
//!
//! Vendor-neutral cognitive operations (text extraction, speech recognition
//! and synthesis, sentiment, translation) on top of the storage facade,
//! the staging manager and the async job driver.
//!
//! # Vendor implementations
//!
//! Implementations plug in through one trait per operation and are looked
//! up in a [`ServiceRegistry`]. Built-in implementations are feature-gated:
//!
//! - `aws-transcribe`: Aws speech recognition through Transcribe

#[cfg(feature = "aws-transcribe")]
pub mod aws;
pub mod combinator;
pub mod providers;
pub mod registry;
pub mod service;

pub use combinator::{Branch, PartialTranscript};
pub use providers::{
    vendor_error, OperationContext, SentimentAnalyzer, SpeechRecognizer, SpeechSynthesizer,
    TextExtractor, Translator,
};
pub use registry::{create_service_registry, ServiceRegistry};
pub use service::CognitiveService;
