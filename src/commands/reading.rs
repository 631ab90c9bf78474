//! Reading Commands
//!
//! 리더 화면의 스크롤 위치 저장/복원과 읽음 표시

use std::collections::BTreeSet;
use std::time::Instant;

use crate::db::DbState;
use crate::error::{CommandError, CommandResult};
use crate::models::ReadingProgress;
use crate::reading::{self, ChapterLayout, PositionThrottle, ReadingPosition, Viewport};

/// 스크롤 이벤트 처리: 현재 위치 계산 -> 시간창 병합 -> 필요할 때만 저장
///
/// 실제로 저장했으면 Some.
pub fn report_scroll(
    db_state: &DbState,
    throttle: &mut PositionThrottle,
    workspace_id: &str,
    layouts: &[ChapterLayout],
    viewport: Viewport,
) -> CommandResult<Option<ReadingProgress>> {
    let Some(position) = reading::locate(layouts, viewport) else {
        return Ok(None);
    };
    let Some(position) = throttle.offer(position, Instant::now()) else {
        return Ok(None);
    };

    let db = db_state.lock()?;
    reading::save_position(&db, workspace_id, position)
        .map(Some)
        .map_err(CommandError::from)
}

/// 화면을 떠날 때 남은 위치 저장
pub fn flush_position(
    db_state: &DbState,
    throttle: &mut PositionThrottle,
    workspace_id: &str,
) -> CommandResult<Option<ReadingProgress>> {
    let Some(position) = throttle.flush(Instant::now()) else {
        return Ok(None);
    };

    let db = db_state.lock()?;
    reading::save_position(&db, workspace_id, position)
        .map(Some)
        .map_err(CommandError::from)
}

pub fn save_position(
    db_state: &DbState,
    workspace_id: &str,
    position: ReadingPosition,
) -> CommandResult<ReadingProgress> {
    let db = db_state.lock()?;
    reading::save_position(&db, workspace_id, position).map_err(CommandError::from)
}

pub fn restore_position(db_state: &DbState, workspace_id: &str) -> CommandResult<Option<ReadingPosition>> {
    let db = db_state.lock()?;
    reading::restore_position(&db, workspace_id).map_err(CommandError::from)
}

pub fn mark_chapter_read(db_state: &DbState, workspace_id: &str, order: i64) -> CommandResult<bool> {
    let db = db_state.lock()?;
    reading::mark_chapter_read(&db, workspace_id, order).map_err(CommandError::from)
}

pub fn read_chapters(db_state: &DbState, workspace_id: &str) -> CommandResult<BTreeSet<i64>> {
    let db = db_state.lock()?;
    reading::read_chapter_orders(&db, workspace_id).map_err(CommandError::from)
}
