//! Repository traits for catalog operations.

pub mod file_assets;

pub use file_assets::FileAssetRepo;
