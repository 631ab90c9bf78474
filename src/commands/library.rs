//! Library Commands
//!
//! 라이브러리 화면용 명령어 (워크스페이스 목록, 챕터 조회, 삭제)

use serde::Serialize;

use crate::db::DbState;
use crate::error::{CommandError, CommandResult, RaidenError};
use crate::models::{Chapter, DictionaryEntry, Workspace};
use crate::reading;

/// 워크스페이스 카드 하나
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceOverview {
    pub workspace: Workspace,
    pub chapter_count: i64,
    pub pending_corrections: i64,
    /// 읽기 진행률 (%)
    pub progress_percent: u32,
    pub last_sync: Option<String>,
    /// 마지막 pull이 중간에 끊김 (다시 받아야 함)
    pub sync_incomplete: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryTotals {
    pub workspaces: usize,
    pub chapters: i64,
    pub pending_corrections: i64,
}

/// 최근 갱신순 워크스페이스 목록
pub fn list_library(db_state: &DbState) -> CommandResult<Vec<WorkspaceOverview>> {
    let db = db_state.lock()?;

    let mut out = Vec::new();
    for workspace in db.list_workspaces()? {
        let id = workspace.id.as_str();
        out.push(WorkspaceOverview {
            chapter_count: db.count_chapters(id)?,
            pending_corrections: db.pending_corrections_count(Some(id))?,
            progress_percent: reading::progress_percent(&db, id)?,
            last_sync: db.last_sync(id)?,
            sync_incomplete: db.is_sync_incomplete(id)?,
            workspace,
        });
    }
    Ok(out)
}

pub fn library_totals(db_state: &DbState) -> CommandResult<LibraryTotals> {
    let db = db_state.lock()?;
    Ok(LibraryTotals {
        workspaces: db.list_workspaces()?.len(),
        chapters: db.total_chapter_count()?,
        pending_corrections: db.pending_corrections_count(None)?,
    })
}

/// 워크스페이스와 연관 데이터 삭제
pub fn delete_workspace(db_state: &DbState, workspace_id: &str) -> CommandResult<()> {
    let db = db_state.lock()?;
    if !db.delete_workspace_cascade(workspace_id)? {
        return Err(RaidenError::WorkspaceNotFound(workspace_id.to_string()).into());
    }
    tracing::info!(workspace_id = %workspace_id, "workspace deleted");
    Ok(())
}

/// 리더용 챕터 목록 (order 순)
pub fn list_chapters(db_state: &DbState, workspace_id: &str) -> CommandResult<Vec<Chapter>> {
    let db = db_state.lock()?;
    if db.get_workspace(workspace_id)?.is_none() {
        return Err(RaidenError::WorkspaceNotFound(workspace_id.to_string()).into());
    }
    db.list_chapters(workspace_id).map_err(CommandError::from)
}

pub fn get_chapter(db_state: &DbState, workspace_id: &str, order: i64) -> CommandResult<Option<Chapter>> {
    let db = db_state.lock()?;
    db.get_chapter_by_order(workspace_id, order).map_err(CommandError::from)
}

pub fn get_dictionary(db_state: &DbState, workspace_id: &str) -> CommandResult<Vec<DictionaryEntry>> {
    let db = db_state.lock()?;
    db.list_dictionary(workspace_id).map_err(CommandError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::reading::{save_position, ReadingPosition};

    #[test]
    fn overview_reports_counts_and_progress() {
        let db = seeded("ws-1", &["a", "b", "c", "d"]);
        db.put_workspace(&workspace("ws-2")).unwrap();
        save_position(&db, "ws-1", ReadingPosition { chapter_order: 2, ratio: 0.4 }).unwrap();
        db.set_last_sync("ws-1", "2024-05-01T00:00:00.000Z").unwrap();
        let state = DbState::new(db);

        let library = list_library(&state).unwrap();
        let first = library.iter().find(|o| o.workspace.id == "ws-1").unwrap();
        assert_eq!(first.chapter_count, 4);
        assert_eq!(first.progress_percent, 50);
        assert_eq!(first.last_sync.as_deref(), Some("2024-05-01T00:00:00.000Z"));
        assert!(!first.sync_incomplete);

        let totals = library_totals(&state).unwrap();
        assert_eq!(totals, LibraryTotals { workspaces: 2, chapters: 4, pending_corrections: 0 });
    }

    #[test]
    fn deleting_unknown_workspace_is_reported() {
        let state = DbState::new(seeded("ws-1", &["a"]));
        let err = delete_workspace(&state, "nope").unwrap_err();
        assert_eq!(err.code, "WORKSPACE_NOT_FOUND");

        delete_workspace(&state, "ws-1").unwrap();
        assert!(list_library(&state).unwrap().is_empty());
        assert_eq!(list_chapters(&state, "ws-1").unwrap_err().code, "WORKSPACE_NOT_FOUND");
    }
}
