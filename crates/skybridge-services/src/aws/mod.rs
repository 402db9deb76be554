//! Aws vendor implementations

pub mod transcribe;

pub use transcribe::AwsTranscribeRecognizer;
