//! Application configuration
//!
//! TOML-backed settings with platform config-directory resolution.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codec::adts::AacProfile;
use crate::constants::*;
use crate::error::{Error, Result};

/// ADTS codec options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// AAC object profile written into frame headers
    pub profile: AacProfile,
    /// Append a CRC-16 to every frame header
    pub crc: bool,
    /// Treat synchronization headers in the stream as recognized markers
    /// rather than lost bytes. Keep enabled for network streams.
    pub recognize_sync_header: bool,
    /// Sampling-frequency index written into frame headers
    pub freq_index: u8,
    /// Channel configuration written into frame headers
    pub channel_config: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            profile: AacProfile::AacLc,
            crc: true,
            recognize_sync_header: true,
            freq_index: DEFAULT_SAMPLE_RATE_INDEX,
            channel_config: DEFAULT_CHANNEL_CONFIG,
        }
    }
}

/// How the scheduler reacts when the sink drains its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackBehavior {
    /// Live stream with no known end: pause early and grow the buffering
    /// margin after every underrun
    Unbounded,
    /// Finite stream: drain fully, pause only on empty
    Bounded,
}

/// Playback scheduler options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub behavior: PlaybackBehavior,
    /// Sealed buffers required before playback starts, at least 1
    pub initial_minimum_buffered: u32,
    /// Capacity of each pooled buffer in bytes
    pub buffer_capacity: usize,
    /// Upper bound on buffers checked out at once
    pub max_buffers: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            behavior: PlaybackBehavior::Unbounded,
            initial_minimum_buffered: DEFAULT_MIN_BUFFERED,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_buffers: DEFAULT_MAX_BUFFERS,
        }
    }
}

/// Network transport options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub port: u16,
    /// Socket read size on the consumer side
    pub read_chunk_size: usize,
    /// Capacity of the chunk fan-out channel per subscriber
    pub broadcast_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            read_chunk_size: READ_CHUNK_SIZE,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub codec: CodecConfig,
    pub playback: PlaybackConfig,
    pub network: NetworkConfig,
}

impl AppConfig {
    /// Platform config file location
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "aac-lan-streamer")
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load from a TOML file, falling back to defaults when it is absent
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Write to a TOML file, creating parent directories as needed
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
