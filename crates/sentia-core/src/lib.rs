// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sentia sync service.
//!
//! This crate provides the shared types, the sync error taxonomy, the clock
//! abstraction, and the adapter traits implemented by source clients and
//! persistence backends. Every other crate in the workspace builds on it.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::{ErrorKind, SentiaError, SyncError};
pub use types::{
    AdapterType, EntityType, HealthStatus, SourceDescriptor, SourceName, SourceSummary,
    StoredRecord, SyncOutcome, SyncResult, SyncedRecord,
};

pub use traits::{PluginAdapter, RecordStore, SourceClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentia_error_has_all_variants() {
        let _config = SentiaError::Config("test".into());
        let _storage = SentiaError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _not_configured = SentiaError::NotConfigured {
            source_name: SourceName::Marketplace,
            missing: vec!["API key".into()],
        };
        let _invalid = SentiaError::InvalidArgument("ttl".into());
        let _unknown_source = SentiaError::UnknownSource("crm".into());
        let _unknown_entity = SentiaError::UnknownEntity {
            source_name: SourceName::Accounting,
            entity_type: "widgets".into(),
        };
        let _sync = SentiaError::Sync(SyncError::new(ErrorKind::Timeout, "slow"));
        let _timeout = SentiaError::Timeout {
            duration: std::time::Duration::from_secs(15),
        };
        let _internal = SentiaError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_source_client<T: SourceClient>() {}
        fn _assert_record_store<T: RecordStore>() {}
        fn _assert_clock<T: Clock>() {}
    }
}
