// # Place Source Trait
//
// Supplies the places the user picked. A failing source is never fatal: the
// registry treats it as "no places" and registers nothing.

use crate::geofence::Place;
use async_trait::async_trait;

/// Trait for place source implementations
#[async_trait]
pub trait PlaceSource: Send + Sync {
    /// Fetch the current list of places
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Place>)`: The places, possibly empty
    /// - `Err(Error)`: Lookup failed
    async fn places(&self) -> Result<Vec<Place>, crate::Error>;

    /// Source name (for logging)
    fn source_name(&self) -> &'static str;
}
