//! Text-to-speech outbound adapters.

mod http_source;

pub use http_source::HttpTextToSpeechSource;
