/// Keyed laptop record storage.
pub mod laptop;

/// Disk-backed image persistence.
pub mod image;

/// Per-record rating aggregates.
pub mod rating;

pub use image::{DiskImageStore, ImageUpload};
pub use laptop::LaptopStore;
pub use rating::RatingStore;
