//! Vault module: encrypted container storage.
//!
//! This module provides:
//! - The persisted JSON document types (`format`)
//! - Individually keyed, authenticated containers (`container`)
//! - The monotonic container id allocator (`ids`)
//! - The high-level `Vault` with aggregate integrity and backups (`store`)

pub mod container;
pub mod format;
pub mod ids;
pub mod store;

/// Identifier of a container inside a vault.
///
/// Non-negative ids are user containers; negative ids are reserved.
pub type ContainerId = i64;

/// Reserved container holding the cloud backup credentials.
pub const CREDENTIALS_ID: ContainerId = -1;

/// Reserved container holding the cloud backup session token.
pub const TOKEN_ID: ContainerId = -2;

// Re-export the most commonly used items.
pub use container::Container;
pub use format::{EncryptedContainer, KeyDescriptor, VaultDocument};
pub use ids::IdAllocator;
pub use store::Vault;
