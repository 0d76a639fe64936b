//! # omnichat-core
//!
//! The deterministic directory engine for Omnichat - THE LOGIC.
//!
//! This crate owns every record the livechat surface serves: user accounts
//! and their roles, the runtime permission grants, livechat role membership
//! (agents/managers), departments and agent assignments, proactive-chat
//! triggers, and video-conference records bridged to the plugin SDK.
//!
//! ## Architectural Constraints
//!
//! - Is the ONLY place where directory state exists (stateful)
//! - Is closed: the HTTP layer consumes this crate, never the reverse
//! - Has NO async, NO network dependencies (pure Rust)
//! - Deterministic: ordered maps and counter-minted ids, no randomness

// =============================================================================
// MODULES
// =============================================================================

pub mod convert;
pub mod directory;
pub mod export;
pub mod permissions;
pub mod primitives;
pub mod registry;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CallId, Department, DepartmentAgent, DepartmentId, OmnichatError, Role, Trigger,
    TriggerAction, TriggerCondition, TriggerId, UserAccount, UserId, UserStatus, UserType,
    VideoConference,
};

// =============================================================================
// RE-EXPORTS: Directory Engine
// =============================================================================

pub use convert::{AppVideoConference, from_app_video_conference, to_app_video_conference};
pub use directory::{DirectorySnapshot, DirectoryStore, MemoryDirectory};
pub use export::{CanonicalHeader, canonical_checksum, export_canonical, import_canonical};
pub use permissions::{Permission, PermissionGrants};
pub use primitives::Page;
pub use registry::{DirectoryMetrics, Registry, StorageBackend, TriggerSpec};
pub use storage::RedbDirectory;
