//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- 워크스페이스 테이블
CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT,
    cover TEXT,
    description TEXT,
    genre TEXT,
    source_lang TEXT,
    target_lang TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workspaces_updated ON workspaces(updated_at);

-- 챕터 테이블 (id는 로컬 전용, 피어 식별자는 workspace_id + chapter_order)
CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id TEXT NOT NULL,
    title TEXT NOT NULL,
    title_translated TEXT,
    content_original TEXT NOT NULL,
    content_translated TEXT,
    chapter_order INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('draft', 'translated', 'reviewing')),
    updated_at INTEGER NOT NULL,
    is_dirty INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_chapters_workspace_order ON chapters(workspace_id, chapter_order);
CREATE INDEX IF NOT EXISTS idx_chapters_dirty ON chapters(workspace_id, is_dirty);

-- 용어집 테이블
CREATE TABLE IF NOT EXISTS dictionary (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id TEXT NOT NULL,
    original TEXT NOT NULL,
    translated TEXT NOT NULL,
    entry_type TEXT NOT NULL DEFAULT 'term',
    FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_dictionary_workspace ON dictionary(workspace_id, original);

-- 읽기 위치 (워크스페이스당 1행)
CREATE TABLE IF NOT EXISTS reading_progress (
    workspace_id TEXT PRIMARY KEY,
    chapter_order INTEGER NOT NULL,
    ratio REAL NOT NULL DEFAULT 0 CHECK (ratio >= 0 AND ratio <= 1),
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
);

-- 동기화 메타 (namespaced key -> opaque value)
CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- 교정 로그 (append-only)
CREATE TABLE IF NOT EXISTS corrections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workspace_id TEXT NOT NULL,
    old_text TEXT NOT NULL,
    new_text TEXT NOT NULL,
    scope TEXT NOT NULL CHECK (scope IN ('chapter', 'all')),
    from_chapter_order INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    synced_to_pc INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_corrections_workspace ON corrections(workspace_id, synced_to_pc);
CREATE INDEX IF NOT EXISTS idx_corrections_applied ON corrections(applied_at);
"#;
