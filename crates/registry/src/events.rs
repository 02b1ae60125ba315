//! Operation callbacks.
//!
//! Every registry operation reports its kind, outcome and duration to an
//! [`OperationObserver`]. The server turns these into Prometheus metrics.

use std::fmt;
use std::time::Duration;

/// The registry operations that are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    PackagePut,
    MapPut,
    PackageGet,
    ManifestGet,
    MapGet,
    VersionsGet,
    AliasCreate,
    AliasUpdate,
    AliasDelete,
    AliasGet,
}

impl OperationKind {
    pub const ALL: [OperationKind; 10] = [
        Self::PackagePut,
        Self::MapPut,
        Self::PackageGet,
        Self::ManifestGet,
        Self::MapGet,
        Self::VersionsGet,
        Self::AliasCreate,
        Self::AliasUpdate,
        Self::AliasDelete,
        Self::AliasGet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackagePut => "package_put",
            Self::MapPut => "map_put",
            Self::PackageGet => "package_get",
            Self::ManifestGet => "manifest_get",
            Self::MapGet => "map_get",
            Self::VersionsGet => "versions_get",
            Self::AliasCreate => "alias_create",
            Self::AliasUpdate => "alias_update",
            Self::AliasDelete => "alias_delete",
            Self::AliasGet => "alias_get",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one callback per completed operation.
pub trait OperationObserver: Send + Sync {
    fn on_operation(&self, kind: OperationKind, success: bool, duration: Duration);
}

/// Observer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl OperationObserver for NoopObserver {
    fn on_operation(&self, _kind: OperationKind, _success: bool, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_operation_names_are_unique() {
        let names: HashSet<_> = OperationKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), OperationKind::ALL.len());
        assert_eq!(OperationKind::AliasGet.to_string(), "alias_get");
    }
}
