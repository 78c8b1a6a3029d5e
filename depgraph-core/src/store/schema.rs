/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for the depgraph `SQLite` database.
///
/// `dependencies` has no foreign keys: edges may name components that are
/// not stored yet, and repair fills those in later.
pub const SCHEMA_SQL: &str = r"
-- Schema version and sync metadata
CREATE TABLE IF NOT EXISTS depgraph_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per remote component
CREATE TABLE IF NOT EXISTS components (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    type TEXT,
    size INTEGER,
    coverage INTEGER CHECK (coverage IS NULL OR coverage BETWEEN 0 AND 100)
);
CREATE INDEX IF NOT EXISTS idx_components_type ON components(type);

-- Directed dependencies, with endpoint names/types as seen at harvest time
CREATE TABLE IF NOT EXISTS dependencies (
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    source_name TEXT,
    source_type TEXT,
    target_name TEXT,
    target_type TEXT,
    PRIMARY KEY (source_id, target_id)
);
CREATE INDEX IF NOT EXISTS idx_dependencies_source ON dependencies(source_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_target ON dependencies(target_id);
";

/// `SQLite` PRAGMAs for performance.
pub const PRAGMAS_SQL: &str = r"
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
";
