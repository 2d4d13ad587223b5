//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Run failed - at least one unit did not install or uninstall
pub const RUN_FAILED: i32 = 2;

/// Template error - manifest rendering failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Descriptor error - malformed or invalid manifest, unreadable values file
pub const DESCRIPTOR_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - no usable kubeconfig, chart backend missing
pub const CLUSTER_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
