use super::RunState;
use crate::error::RegistryError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

/// Pending runs captured for persistence across background restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub runs: Vec<RunState>,
}

impl RegistrySnapshot {
    /// Saves the snapshot to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), RegistryError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|source| RegistryError::Io {
            path: path.to_string(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| RegistryError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(())
    }

    /// Loads a snapshot from a file.
    pub fn from_file(path: &str) -> Result<Self, RegistryError> {
        let mut file = fs::File::open(path).map_err(|source| RegistryError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| RegistryError::Io {
                path: path.to_string(),
                source,
            })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        encode_to_vec(self, standard())
            .map_err(|e| RegistryError::Serialization(format!("encoding failed: {}", e)))
    }

    /// Deserializes a snapshot from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RegistryError> {
        decode_from_slice(bytes, standard())
            .map(|(snapshot, _)| snapshot) // bincode 2 returns a tuple (data, bytes_read)
            .map_err(|e| RegistryError::Serialization(format!("decoding failed: {}", e)))
    }
}
