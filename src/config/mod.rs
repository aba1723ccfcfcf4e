//! Configuration module for channel-chat.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, NormalizationSettings, SearchSettings,
    Settings, TranscriptionSettings, VectorStoreSettings,
};
