//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Dependency error - declared dependencies are missing or out of range
pub const DEPENDENCY_ERROR: i32 = 2;

/// Cluster error - the cluster client rejected an operation
pub const CLUSTER_ERROR: i32 = 3;

/// Chart error - invalid chart structure, Chart.yaml or manifest
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
