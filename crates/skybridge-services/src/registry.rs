//! Service registry for vendor implementations
//!
//! One dispatch table per operation, keyed by vendor. Registration happens
//! while the service is being assembled; lookups afterwards are read-only,
//! so the tables are plain maps owned by the registry.

use crate::providers::{
    SentimentAnalyzer, SpeechRecognizer, SpeechSynthesizer, TextExtractor, Translator,
};
use skybridge_core::{SkybridgeError, SkybridgeResult, Vendor};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ServiceRegistry {
    extractors: HashMap<Vendor, Arc<dyn TextExtractor>>,
    recognizers: HashMap<Vendor, Arc<dyn SpeechRecognizer>>,
    synthesizers: HashMap<Vendor, Arc<dyn SpeechSynthesizer>>,
    sentiment: HashMap<Vendor, Arc<dyn SentimentAnalyzer>>,
    translators: HashMap<Vendor, Arc<dyn Translator>>,
}

fn insert<T: ?Sized>(
    table: &mut HashMap<Vendor, Arc<T>>,
    vendor: Vendor,
    provider: Arc<T>,
    capability: &'static str,
) {
    if table.insert(vendor, provider).is_some() {
        tracing::warn!(vendor = %vendor, capability, "Replacing registered provider");
    } else {
        tracing::debug!(vendor = %vendor, capability, "Provider registered");
    }
}

fn lookup<T: ?Sized>(
    table: &HashMap<Vendor, Arc<T>>,
    vendor: Vendor,
    capability: &'static str,
) -> SkybridgeResult<Arc<T>> {
    table
        .get(&vendor)
        .cloned()
        .ok_or(SkybridgeError::VendorUnsupported { vendor, capability })
}

fn sorted<T: ?Sized>(table: &HashMap<Vendor, Arc<T>>) -> Vec<Vendor> {
    let mut vendors: Vec<Vendor> = table.keys().copied().collect();
    vendors.sort();
    vendors
}

pub const TEXT_EXTRACTION: &str = "text_extraction";
pub const SPEECH_RECOGNITION: &str = "speech_recognition";
pub const SPEECH_SYNTHESIS: &str = "speech_synthesis";
pub const SENTIMENT: &str = "sentiment";
pub const TRANSLATION: &str = "translation";

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_extractor(&mut self, provider: Arc<dyn TextExtractor>) {
        insert(&mut self.extractors, provider.vendor(), provider, TEXT_EXTRACTION);
    }

    pub fn register_recognizer(&mut self, provider: Arc<dyn SpeechRecognizer>) {
        insert(&mut self.recognizers, provider.vendor(), provider, SPEECH_RECOGNITION);
    }

    pub fn register_synthesizer(&mut self, provider: Arc<dyn SpeechSynthesizer>) {
        insert(&mut self.synthesizers, provider.vendor(), provider, SPEECH_SYNTHESIS);
    }

    pub fn register_sentiment(&mut self, provider: Arc<dyn SentimentAnalyzer>) {
        insert(&mut self.sentiment, provider.vendor(), provider, SENTIMENT);
    }

    pub fn register_translator(&mut self, provider: Arc<dyn Translator>) {
        insert(&mut self.translators, provider.vendor(), provider, TRANSLATION);
    }

    pub fn extractor(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn TextExtractor>> {
        lookup(&self.extractors, vendor, TEXT_EXTRACTION)
    }

    pub fn recognizer(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn SpeechRecognizer>> {
        lookup(&self.recognizers, vendor, SPEECH_RECOGNITION)
    }

    pub fn synthesizer(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn SpeechSynthesizer>> {
        lookup(&self.synthesizers, vendor, SPEECH_SYNTHESIS)
    }

    pub fn sentiment_analyzer(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn SentimentAnalyzer>> {
        lookup(&self.sentiment, vendor, SENTIMENT)
    }

    pub fn translator(&self, vendor: Vendor) -> SkybridgeResult<Arc<dyn Translator>> {
        lookup(&self.translators, vendor, TRANSLATION)
    }

    pub fn extractor_vendors(&self) -> Vec<Vendor> {
        sorted(&self.extractors)
    }

    /// Candidates for feature planning.
    pub fn recognizer_vendors(&self) -> Vec<Vendor> {
        sorted(&self.recognizers)
    }

    pub fn synthesizer_vendors(&self) -> Vec<Vendor> {
        sorted(&self.synthesizers)
    }

    pub fn sentiment_vendors(&self) -> Vec<Vendor> {
        sorted(&self.sentiment)
    }

    pub fn translator_vendors(&self) -> Vec<Vendor> {
        sorted(&self.translators)
    }
}

/// Registry holding every built-in implementation compiled into this build.
pub fn create_service_registry() -> ServiceRegistry {
    #[allow(unused_mut)]
    let mut registry = ServiceRegistry::new();

    #[cfg(feature = "aws-transcribe")]
    registry.register_recognizer(Arc::new(crate::aws::AwsTranscribeRecognizer::new()));

    tracing::info!(
        recognizers = ?registry.recognizer_vendors(),
        "Service registry initialized"
    );
    registry
}
