//! SyncMeta 키-값 저장소
//!
//! 키는 namespaced 문자열이고 값은 소유 컴포넌트만 해석하는 불투명 문자열입니다.

use rusqlite::OptionalExtension;

use super::Database;
use crate::error::RaidenError;
use crate::models::SavedConnection;

/// 마지막으로 성공한 피어 연결 (JSON `{ ip, port }`)
pub const LAST_CONNECTION_KEY: &str = "lastSyncConnection";

const LAST_SYNC_PREFIX: &str = "lastSync_";
const PREV_CHAPTER_COUNT_PREFIX: &str = "prevChapterCount_";
const SYNC_INCOMPLETE_PREFIX: &str = "syncIncomplete_";
const READ_CHAPTERS_PREFIX: &str = "readChapters_";

pub fn last_sync_key(workspace_id: &str) -> String {
    format!("{}{}", LAST_SYNC_PREFIX, workspace_id)
}

pub fn prev_chapter_count_key(workspace_id: &str) -> String {
    format!("{}{}", PREV_CHAPTER_COUNT_PREFIX, workspace_id)
}

pub fn sync_incomplete_key(workspace_id: &str) -> String {
    format!("{}{}", SYNC_INCOMPLETE_PREFIX, workspace_id)
}

pub fn read_chapters_key(workspace_id: &str) -> String {
    format!("{}{}", READ_CHAPTERS_PREFIX, workspace_id)
}

/// 워크스페이스 연쇄 삭제 시 함께 지울 키
pub(crate) fn workspace_meta_keys(workspace_id: &str) -> Vec<String> {
    vec![
        last_sync_key(workspace_id),
        prev_chapter_count_key(workspace_id),
        sync_incomplete_key(workspace_id),
        read_chapters_key(workspace_id),
    ]
}

impl Database {
    pub fn get_meta(&self, key: &str) -> Result<Option<String>, RaidenError> {
        let value = self
            .conn()
            .query_row("SELECT value FROM sync_meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn put_meta(&self, key: &str, value: &str) -> Result<(), RaidenError> {
        self.conn().execute(
            "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    pub fn delete_meta(&self, key: &str) -> Result<(), RaidenError> {
        self.conn().execute("DELETE FROM sync_meta WHERE key = ?1", [key])?;
        Ok(())
    }

    /// 저장된 피어 연결. 값이 깨져 있으면 없는 것으로 취급
    pub fn saved_connection(&self) -> Result<Option<SavedConnection>, RaidenError> {
        let Some(raw) = self.get_meta(LAST_CONNECTION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<SavedConnection>(&raw) {
            Ok(conn) => Ok(Some(conn)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable saved connection");
                Ok(None)
            }
        }
    }

    pub fn save_connection(&self, connection: &SavedConnection) -> Result<(), RaidenError> {
        let raw = serde_json::to_string(connection)?;
        self.put_meta(LAST_CONNECTION_KEY, &raw)
    }

    pub fn last_sync(&self, workspace_id: &str) -> Result<Option<String>, RaidenError> {
        self.get_meta(&last_sync_key(workspace_id))
    }

    pub fn set_last_sync(&self, workspace_id: &str, timestamp: &str) -> Result<(), RaidenError> {
        self.put_meta(&last_sync_key(workspace_id), timestamp)
    }

    pub fn previous_chapter_count(&self, workspace_id: &str) -> Result<Option<i64>, RaidenError> {
        Ok(self
            .get_meta(&prev_chapter_count_key(workspace_id))?
            .and_then(|v| v.parse::<i64>().ok()))
    }

    pub fn set_previous_chapter_count(&self, workspace_id: &str, count: i64) -> Result<(), RaidenError> {
        self.put_meta(&prev_chapter_count_key(workspace_id), &count.to_string())
    }

    /// 챕터 교체가 끝나지 않은 워크스페이스인지 (재시도 필요)
    pub fn is_sync_incomplete(&self, workspace_id: &str) -> Result<bool, RaidenError> {
        Ok(self.get_meta(&sync_incomplete_key(workspace_id))?.is_some())
    }

    pub fn set_sync_incomplete(&self, workspace_id: &str, incomplete: bool) -> Result<(), RaidenError> {
        let key = sync_incomplete_key(workspace_id);
        if incomplete {
            self.put_meta(&key, "1")
        } else {
            self.delete_meta(&key)
        }
    }
}
