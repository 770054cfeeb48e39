//! Domain records and the in-memory snapshot tables.

pub mod records;

pub use records::{
    EndpointError, IssueRecord, ProjectRecord, Snapshot, SnapshotMeta, UserRecord, VersionRecord,
    VersionStatus,
};
