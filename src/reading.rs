//! Reading-Position Tracker
//!
//! 현재 보고 있는 챕터(order)와 챕터 내 상대 위치(ratio)를 계산하고 저장합니다.
//! ratio는 "챕터 렌더 높이 중 이미 지나간 비율"이라 글꼴 크기가 바뀌어도 대략 유지됩니다.
//!
//! 스크롤 이벤트마다 쓰지 않도록 하는 시간창 병합(`PositionThrottle`)은 프레젠테이션
//! 경계에서만 사용하고, 교정/동기화 코어는 이에 의존하지 않습니다.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::db::meta::read_chapters_key;
use crate::db::Database;
use crate::error::RaidenError;
use crate::models::ReadingProgress;

/// 기본 저장 간격
pub const DEFAULT_SAVE_WINDOW: Duration = Duration::from_millis(300);

/// 렌더된 챕터 하나의 배치 정보
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterLayout {
    pub order: i64,
    pub offset_top: f64,
    pub height: f64,
}

/// 스크롤 컨테이너 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub scroll_top: f64,
    pub client_height: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    pub chapter_order: i64,
    pub ratio: f64,
}

impl ReadingPosition {
    /// 소수점 3자리 기준 동일성 키
    fn dedupe_key(&self) -> (i64, i64) {
        (self.chapter_order, (self.ratio * 1000.0).round() as i64)
    }
}

fn round_ratio(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 1000.0
}

/// 현재 챕터 계산
///
/// 뷰포트 중앙보다 위에서 시작하는 마지막 챕터가 활성 챕터입니다.
/// 그런 챕터가 없으면 첫 챕터, ratio 0.
pub fn locate(layouts: &[ChapterLayout], viewport: Viewport) -> Option<ReadingPosition> {
    let first = layouts.first()?;
    let center = viewport.scroll_top + viewport.client_height / 2.0;

    let active = layouts.iter().filter(|l| l.offset_top <= center).last();
    let Some(active) = active else {
        return Some(ReadingPosition { chapter_order: first.order, ratio: 0.0 });
    };

    let ratio = if active.height > 0.0 {
        ((viewport.scroll_top - active.offset_top) / active.height).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(ReadingPosition {
        chapter_order: active.order,
        ratio: round_ratio(ratio),
    })
}

/// 시간창 기반 저장 병합
///
/// 창 안의 연속 이벤트는 무시하고, 마지막으로 저장한 위치와 같은 값도 건너뜁니다.
#[derive(Debug)]
pub struct PositionThrottle {
    window: Duration,
    last_write: Option<Instant>,
    last_saved: Option<(i64, i64)>,
    pending: Option<ReadingPosition>,
}

impl PositionThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_write: None,
            last_saved: None,
            pending: None,
        }
    }

    /// 새 위치 제안. 지금 저장해야 하면 Some
    pub fn offer(&mut self, position: ReadingPosition, now: Instant) -> Option<ReadingPosition> {
        self.pending = Some(position);

        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.window {
                return None;
            }
        }
        self.take_pending(now)
    }

    /// 화면을 떠날 때 마지막 위치 저장용
    pub fn flush(&mut self, now: Instant) -> Option<ReadingPosition> {
        self.take_pending(now)
    }

    fn take_pending(&mut self, now: Instant) -> Option<ReadingPosition> {
        let position = self.pending.take()?;
        let key = position.dedupe_key();
        if self.last_saved == Some(key) {
            return None;
        }
        self.last_saved = Some(key);
        self.last_write = Some(now);
        Some(position)
    }
}

impl Default for PositionThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_WINDOW)
    }
}

pub fn save_position(
    db: &Database,
    workspace_id: &str,
    position: ReadingPosition,
) -> Result<ReadingProgress, RaidenError> {
    db.upsert_reading_progress(workspace_id, position.chapter_order, round_ratio(position.ratio))
}

pub fn restore_position(db: &Database, workspace_id: &str) -> Result<Option<ReadingPosition>, RaidenError> {
    Ok(db.get_reading_progress(workspace_id)?.map(|p| ReadingPosition {
        chapter_order: p.chapter_order,
        ratio: p.ratio,
    }))
}

/// 교정 범위 결정용 현재 챕터 order. 저장된 위치가 없으면 0
pub fn current_chapter_order(db: &Database, workspace_id: &str) -> Result<i64, RaidenError> {
    Ok(db
        .get_reading_progress(workspace_id)?
        .map(|p| p.chapter_order)
        .unwrap_or(0))
}

/// 읽기 진행률(%) = 현재 order 이하 챕터 수 / 전체 챕터 수
pub fn progress_percent(db: &Database, workspace_id: &str) -> Result<u32, RaidenError> {
    let Some(progress) = db.get_reading_progress(workspace_id)? else {
        return Ok(0);
    };
    let total = db.count_chapters(workspace_id)?;
    if total == 0 {
        return Ok(0);
    }
    let read = db.count_chapters_up_to(workspace_id, progress.chapter_order)?;
    Ok(((read as f64 / total as f64) * 100.0).round() as u32)
}

/// 목차 표시용 읽은 챕터 집합 (order 기준)
pub fn read_chapter_orders(db: &Database, workspace_id: &str) -> Result<BTreeSet<i64>, RaidenError> {
    let Some(raw) = db.get_meta(&read_chapters_key(workspace_id))? else {
        return Ok(BTreeSet::new());
    };
    match serde_json::from_str(&raw) {
        Ok(orders) => Ok(orders),
        Err(e) => {
            tracing::warn!(workspace_id = %workspace_id, error = %e, "ignoring unreadable read-chapter markers");
            Ok(BTreeSet::new())
        }
    }
}

/// 읽음 표시. 새로 추가되었으면 true
pub fn mark_chapter_read(db: &Database, workspace_id: &str, order: i64) -> Result<bool, RaidenError> {
    let mut orders = read_chapter_orders(db, workspace_id)?;
    if !orders.insert(order) {
        return Ok(false);
    }
    let raw = serde_json::to_string(&orders)?;
    db.put_meta(&read_chapters_key(workspace_id), &raw)?;
    Ok(true)
}
