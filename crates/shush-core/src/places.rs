// # Place Sources
//
// Implementations of the PlaceSource trait.
//
// - `StaticPlaceSource`: in-memory list, replaceable at runtime
// - `JsonFilePlaceSource`: JSON array of places read on every fetch
//
// ## File Format
//
// ```json
// [
//   { "id": "ChIJ2eUgeAK6j4ARbn5u_wAGqWA", "latitude": 37.422, "longitude": -122.084 }
// ]
// ```
//
// A missing file is an empty list, not an error.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::geofence::Place;
use crate::traits::PlaceSource;
use crate::Error;

/// In-memory place source
#[derive(Debug, Clone, Default)]
pub struct StaticPlaceSource {
    inner: Arc<RwLock<Vec<Place>>>,
}

impl StaticPlaceSource {
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(places)),
        }
    }

    /// Replace the list of places
    pub async fn replace(&self, places: Vec<Place>) {
        *self.inner.write().await = places;
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl PlaceSource for StaticPlaceSource {
    async fn places(&self) -> Result<Vec<Place>, Error> {
        Ok(self.inner.read().await.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Place source backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFilePlaceSource {
    path: PathBuf,
}

impl JsonFilePlaceSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PlaceSource for JsonFilePlaceSource {
    async fn places(&self) -> Result<Vec<Place>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Places file {} not found, no places", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::place_source(format!(
                    "Failed to read places file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let places: Vec<Place> = serde_json::from_str(&content).map_err(|e| {
            Error::place_source(format!(
                "Places file {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!("Loaded {} place(s) from {}", places.len(), self.path.display());
        Ok(places)
    }

    fn source_name(&self) -> &'static str {
        "json-file"
    }
}
