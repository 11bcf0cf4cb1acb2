//! Content identity and media processing
//!
//! Everything that derives artifacts from raw file bytes: the canonical
//! SHA-256 content fingerprint, LSB watermark embedding/extraction, and
//! preview thumbnail generation.

pub mod hash;
pub mod thumbnail;
pub mod watermark;

pub use hash::{generate_watermark_id, metadata_hash, sha256_hex};
pub use thumbnail::{Thumbnail, ThumbnailError};
pub use watermark::WatermarkError;
