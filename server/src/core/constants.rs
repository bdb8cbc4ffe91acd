//! Application-wide constants

/// Application display name
pub const APP_NAME: &str = "Hymnal";

/// Lowercase application name (logging targets, folder names)
pub const APP_NAME_LOWER: &str = "hymnal";

/// Dot folder in the user's home directory
pub const APP_DOT_FOLDER: &str = ".hymnal";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_HOST: &str = "HYMNAL_HOST";
pub const ENV_PORT: &str = "HYMNAL_PORT";
pub const ENV_LOG: &str = "HYMNAL_LOG";
pub const ENV_DATA_DIR: &str = "HYMNAL_DATA_DIR";
pub const ENV_JWT_SECRET: &str = "HYMNAL_JWT_SECRET";
pub const ENV_AUTH_ENABLED: &str = "HYMNAL_AUTH_ENABLED";

// =============================================================================
// Server defaults
// =============================================================================

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5360;

/// Session token lifetime
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;

/// Maximum JSON request body size (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Seconds to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// SQLite
// =============================================================================

pub const SQLITE_DB_FILENAME: &str = "hymnal.db";
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;
pub const SQLITE_CACHE_SIZE: &str = "-64000";
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// User roles
// =============================================================================

pub const ROLE_MEMBER: &str = "member";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_ADMIN: &str = "admin";
