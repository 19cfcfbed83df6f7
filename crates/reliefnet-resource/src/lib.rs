//! ReliefNet Resource — the resource bounded context.
//!
//! Second hop of the relief saga: consumes the find-resources command,
//! queries the external amenity directory around the disaster (retried),
//! upserts what it finds into the geospatial store, and republishes the
//! payload for admin notification.

pub mod directory;
pub mod domain;
pub mod error;
pub mod handler;
pub mod store;

pub use directory::ResourceDirectory;
pub use domain::{AmenityKind, Resource};
pub use error::ResourceError;
pub use handler::FindResourcesHandler;
pub use store::ResourceStore;
