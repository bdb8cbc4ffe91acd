//! SQLite schema definitions
//!
//! Initial schema with all tables. Timestamps are epoch seconds; soft-deleted
//! rows keep their data and set `deleted_at`.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE CHECK(length(email) >= 3),
    password_hash TEXT NOT NULL,
    display_name TEXT CHECK(display_name IS NULL OR length(display_name) <= 100),
    role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('member', 'editor', 'admin')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- =============================================================================
-- 2. Categories (must be before hymns due to FK)
-- =============================================================================
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK(length(name) >= 1 AND length(name) <= 100),
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
);

-- =============================================================================
-- 3. Hymns (references categories)
-- =============================================================================
CREATE TABLE IF NOT EXISTS hymns (
    id TEXT PRIMARY KEY,
    number INTEGER NOT NULL,
    title TEXT NOT NULL CHECK(length(title) >= 1 AND length(title) <= 200),
    author TEXT CHECK(author IS NULL OR length(author) <= 200),
    musical_key TEXT CHECK(musical_key IS NULL OR length(musical_key) <= 10),
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_hymns_number ON hymns(number);
CREATE INDEX IF NOT EXISTS idx_hymns_category ON hymns(category_id);
CREATE INDEX IF NOT EXISTS idx_hymns_deleted ON hymns(deleted_at);

-- One live hymn per number; soft-deleted rows release the number
CREATE UNIQUE INDEX IF NOT EXISTS idx_hymns_number_live
    ON hymns(number)
    WHERE deleted_at IS NULL;

-- =============================================================================
-- 4. Verses (references hymns)
-- =============================================================================
CREATE TABLE IF NOT EXISTS verses (
    id TEXT PRIMARY KEY,
    hymn_id TEXT NOT NULL REFERENCES hymns(id) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    content TEXT NOT NULL CHECK(length(content) >= 1),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(hymn_id, number)
);

CREATE INDEX IF NOT EXISTS idx_verses_hymn ON verses(hymn_id);

-- =============================================================================
-- 5. Choruses (standalone refrains)
-- =============================================================================
CREATE TABLE IF NOT EXISTS choruses (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL CHECK(length(title) >= 1 AND length(title) <= 200),
    content TEXT NOT NULL CHECK(length(content) >= 1),
    musical_key TEXT CHECK(musical_key IS NULL OR length(musical_key) <= 10),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_choruses_deleted ON choruses(deleted_at);

-- =============================================================================
-- 6. Audit log (append-only)
-- =============================================================================
CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    actor_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT,
    detail TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_logs_actor ON audit_logs(actor_id);
CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_audit_logs_created ON audit_logs(created_at);
"#;
