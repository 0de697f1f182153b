//! Default values for every tunable duration.

// ==========================================================================
// Notification Defaults
// ==========================================================================

/// How long a notification stays visible before it dismisses itself.
pub const DEFAULT_NOTIFICATION_DURATION_MS: i64 = 5_000;

// ==========================================================================
// Auto-save Defaults
// ==========================================================================

/// Quiet period after the last `trigger_save` before the save runs.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 2_000;
