//! Correction Commands
//!
//! 리더에서 텍스트 교정 제출 + 교정 로그 화면

use serde::Deserialize;

use crate::corrections::{apply_correction, CorrectionOutcome, CorrectionRequest};
use crate::db::{CorrectionFilter, CorrectionStats, DbState};
use crate::error::{CommandError, CommandResult, RaidenError};
use crate::models::{Correction, CorrectionScope};
use crate::reading;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCorrectionArgs {
    pub workspace_id: String,
    pub old_text: String,
    pub new_text: String,
    pub scope: CorrectionScope,
    /// 없으면 저장된 읽기 위치의 챕터
    #[serde(default)]
    pub from_chapter_order: Option<i64>,
}

fn validate(args: &SubmitCorrectionArgs) -> Result<(), RaidenError> {
    let old_text = args.old_text.trim();
    let new_text = args.new_text.trim();
    if old_text.is_empty() || new_text.is_empty() {
        return Err(RaidenError::InvalidOperation(
            "Correction text must not be empty".to_string(),
        ));
    }
    if old_text == new_text {
        return Err(RaidenError::InvalidOperation(
            "Replacement is identical to the original text".to_string(),
        ));
    }
    Ok(())
}

/// 교정 제출
pub fn submit_correction(db_state: &DbState, args: SubmitCorrectionArgs) -> CommandResult<CorrectionOutcome> {
    validate(&args)?;

    let db = db_state.lock()?;
    if db.get_workspace(&args.workspace_id)?.is_none() {
        return Err(RaidenError::WorkspaceNotFound(args.workspace_id).into());
    }

    let from_chapter_order = match args.from_chapter_order {
        Some(order) => order,
        None => reading::current_chapter_order(&db, &args.workspace_id)?,
    };

    let request = CorrectionRequest {
        workspace_id: args.workspace_id,
        old_text: args.old_text,
        new_text: args.new_text,
        scope: args.scope,
        from_chapter_order,
    };
    apply_correction(&db, &request).map_err(CommandError::from)
}

pub fn pending_corrections_count(db_state: &DbState, workspace_id: Option<&str>) -> CommandResult<i64> {
    let db = db_state.lock()?;
    db.pending_corrections_count(workspace_id).map_err(CommandError::from)
}

/// 최신순 교정 목록 (all / pending / pushed)
pub fn list_corrections(db_state: &DbState, filter: &CorrectionFilter) -> CommandResult<Vec<Correction>> {
    let db = db_state.lock()?;
    db.list_corrections(filter).map_err(CommandError::from)
}

pub fn correction_stats(db_state: &DbState, workspace_id: Option<&str>) -> CommandResult<CorrectionStats> {
    let db = db_state.lock()?;
    db.correction_stats(workspace_id).map_err(CommandError::from)
}

/// 교정 항목 하나 삭제. 삭제된 행 수를 반환
pub fn delete_correction(db_state: &DbState, id: i64) -> CommandResult<usize> {
    let db = db_state.lock()?;
    let removed = db.delete_correction(id)?;
    tracing::info!(correction_id = id, removed, "correction deleted");
    Ok(removed)
}

/// 이미 보낸 교정 정리
pub fn purge_synced_corrections(db_state: &DbState, workspace_id: Option<&str>) -> CommandResult<usize> {
    let db = db_state.lock()?;
    let removed = db.purge_synced_corrections(workspace_id)?;
    tracing::info!(removed, "synced corrections purged");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::db::CorrectionStatusFilter;
    use crate::reading::{save_position, ReadingPosition};

    fn args(old: &str, new: &str, from: Option<i64>) -> SubmitCorrectionArgs {
        SubmitCorrectionArgs {
            workspace_id: "ws-1".to_string(),
            old_text: old.to_string(),
            new_text: new.to_string(),
            scope: CorrectionScope::All,
            from_chapter_order: from,
        }
    }

    #[test]
    fn rejects_blank_or_identical_text() {
        let state = DbState::new(seeded("ws-1", &["A"]));
        assert_eq!(submit_correction(&state, args("  ", "B", None)).unwrap_err().code, "INVALID_OPERATION");
        assert_eq!(submit_correction(&state, args("A ", " A", None)).unwrap_err().code, "INVALID_OPERATION");
        assert_eq!(pending_corrections_count(&state, None).unwrap(), 0);
    }

    #[test]
    fn defaults_to_current_reading_chapter() {
        let db = seeded("ws-1", &["A1", "A2", "A3"]);
        save_position(&db, "ws-1", ReadingPosition { chapter_order: 2, ratio: 0.1 }).unwrap();
        let state = DbState::new(db);

        let outcome = submit_correction(&state, args("A", "B", None)).unwrap();
        assert_eq!(outcome.modified_orders, vec![2, 3]);
        assert_eq!(outcome.correction.from_chapter_order, 2);
    }

    #[test]
    fn unknown_workspace_is_not_found() {
        let state = DbState::new(memory_db());
        assert_eq!(
            submit_correction(&state, args("A", "B", Some(1))).unwrap_err().code,
            "WORKSPACE_NOT_FOUND"
        );
    }

    #[test]
    fn browse_and_purge() {
        let state = DbState::new(seeded("ws-1", &["A", "A"]));
        let first = submit_correction(&state, args("A", "B", Some(1))).unwrap();
        submit_correction(&state, args("B", "C", Some(1))).unwrap();
        state.lock().unwrap().mark_corrections_synced(&[first.correction.id]).unwrap();

        let pushed = list_corrections(
            &state,
            &CorrectionFilter { status: CorrectionStatusFilter::Pushed, workspace_id: None },
        )
        .unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(correction_stats(&state, Some("ws-1")).unwrap().pending, 1);

        assert_eq!(purge_synced_corrections(&state, None).unwrap(), 1);
        let remaining = list_corrections(&state, &CorrectionFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(delete_correction(&state, remaining[0].id).unwrap(), 1);
        assert_eq!(correction_stats(&state, None).unwrap().total, 0);
    }
}
