//! Core domain types and shared logic for the depot package registry.
//!
//! This crate defines the data model used across all other crates:
//! - Package types and coordinates
//! - Storage path derivation and request path parsing
//! - Content integrity hashing
//! - Manifest, versions index and alias documents
//! - Hostname to organization mapping
//! - Login tokens and configuration

pub mod alias;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod integrity;
pub mod manifest;
pub mod mime;
pub mod organization;
pub mod path;
pub mod token;
pub mod versions;

pub use alias::Alias;
pub use coordinate::{Coordinate, PackageType};
pub use error::{Error, Result};
pub use integrity::{Integrity, IntegrityHasher};
pub use manifest::{Author, FileEntry, Manifest};
pub use organization::OrganizationTable;
pub use path::{AliasMode, RequestPath, Target};
pub use token::{Claims, TokenSigner};
pub use versions::{VersionSummary, VersionsDocument};
