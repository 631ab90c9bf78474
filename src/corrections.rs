//! Correction Engine
//!
//! 캐시된 챕터 번역문에 텍스트 치환을 적용하고 교정 로그에 의도를 기록합니다.
//!
//! 챕터 갱신과 로그 추가는 하나의 로컬 트랜잭션으로 묶입니다 (all-or-nothing).
//! 중간에 실패하면 챕터 변경과 로그 모두 롤백되고 에러가 호출자에게 전달됩니다.

use serde::{Deserialize, Serialize};

use crate::db::{chapter_by_order, chapters_from_order, insert_correction, update_chapter_translation, Database};
use crate::error::RaidenError;
use crate::models::{Chapter, Correction, CorrectionScope, NewCorrection};

/// 교정 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub workspace_id: String,
    pub old_text: String,
    pub new_text: String,
    pub scope: CorrectionScope,
    pub from_chapter_order: i64,
}

/// 교정 적용 결과
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionOutcome {
    /// 실제로 본문이 바뀐 챕터 수
    pub modified_count: usize,
    /// 바뀐 챕터의 order
    pub modified_orders: Vec<i64>,
    /// 기록된 로그 항목
    pub correction: Correction,
}

/// 치환 결과. old_text가 없으면 None
///
/// 빈 old_text나 old == new 는 매치 없음으로 취급합니다.
/// (`str::replace("")`는 모든 문자 사이에 삽입하므로)
fn substitute(content: &str, old_text: &str, new_text: &str) -> Option<String> {
    if old_text.is_empty() || old_text == new_text || !content.contains(old_text) {
        return None;
    }
    Some(content.replace(old_text, new_text))
}

/// 교정 적용
///
/// - scope = chapter: `from_chapter_order` 챕터 하나 (0 또는 1개)
/// - scope = all: order >= `from_chapter_order` 인 모든 챕터
///
/// 매치 여부와 관계없이 로그 항목은 정확히 1개 추가됩니다.
pub fn apply_correction(db: &Database, request: &CorrectionRequest) -> Result<CorrectionOutcome, RaidenError> {
    let now = chrono::Utc::now().timestamp_millis();

    let outcome = db.in_transaction(|tx| {
        let targets: Vec<Chapter> = match request.scope {
            CorrectionScope::Chapter => {
                chapter_by_order(tx, &request.workspace_id, request.from_chapter_order)?
                    .into_iter()
                    .collect()
            }
            CorrectionScope::All => chapters_from_order(tx, &request.workspace_id, request.from_chapter_order)?,
        };

        let mut modified_orders = Vec::new();
        for chapter in &targets {
            let Some(current) = chapter.content_translated.as_deref() else {
                continue;
            };
            if let Some(replaced) = substitute(current, &request.old_text, &request.new_text) {
                update_chapter_translation(tx, chapter.id, &replaced, now)?;
                modified_orders.push(chapter.order);
            }
        }

        let correction = insert_correction(
            tx,
            &NewCorrection {
                workspace_id: request.workspace_id.clone(),
                old_text: request.old_text.clone(),
                new_text: request.new_text.clone(),
                scope: request.scope,
                from_chapter_order: request.from_chapter_order,
                applied_at: now,
            },
        )?;

        Ok(CorrectionOutcome {
            modified_count: modified_orders.len(),
            modified_orders,
            correction,
        })
    })?;

    tracing::info!(
        workspace_id = %request.workspace_id,
        scope = request.scope.as_str(),
        from_order = request.from_chapter_order,
        modified = outcome.modified_count,
        "correction applied"
    );

    Ok(outcome)
}

/// 아직 피어에 보내지 않은 교정 수
pub fn pending_corrections_count(db: &Database, workspace_id: &str) -> Result<i64, RaidenError> {
    db.pending_corrections_count(Some(workspace_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    fn request(old: &str, new: &str, scope: CorrectionScope, from: i64) -> CorrectionRequest {
        CorrectionRequest {
            workspace_id: "ws-1".to_string(),
            old_text: old.to_string(),
            new_text: new.to_string(),
            scope,
            from_chapter_order: from,
        }
    }

    fn translated(db: &Database, order: i64) -> String {
        db.get_chapter_by_order("ws-1", order)
            .unwrap()
            .unwrap()
            .content_translated
            .unwrap()
    }

    #[test]
    fn replaces_every_occurrence_in_chapter() {
        let db = seeded("ws-1", &["x x x"]);
        let outcome = apply_correction(&db, &request("x", "y", CorrectionScope::Chapter, 1)).unwrap();

        assert_eq!(outcome.modified_count, 1);
        assert_eq!(translated(&db, 1), "y y y");
        assert!(db.get_chapter_by_order("ws-1", 1).unwrap().unwrap().is_dirty);
    }

    #[test]
    fn all_scope_starts_at_from_order() {
        let db = seeded("ws-1", &["x1", "x2", "x3", "x4", "x5"]);
        let outcome = apply_correction(&db, &request("x", "y", CorrectionScope::All, 3)).unwrap();

        assert_eq!(outcome.modified_count, 3);
        assert_eq!(outcome.modified_orders, vec![3, 4, 5]);
        assert_eq!(translated(&db, 1), "x1");
        assert_eq!(translated(&db, 2), "x2");
        assert_eq!(translated(&db, 3), "y3");
        assert_eq!(translated(&db, 5), "y5");

        let dirty: Vec<i64> = db.query_dirty_chapters("ws-1").unwrap().iter().map(|c| c.order).collect();
        assert_eq!(dirty, vec![3, 4, 5]);
    }

    #[test]
    fn chapter_scope_touches_only_that_chapter() {
        let db = seeded("ws-1", &["A", "A", "A"]);
        let outcome = apply_correction(&db, &request("A", "B", CorrectionScope::Chapter, 2)).unwrap();

        assert_eq!(outcome.modified_count, 1);
        assert_eq!(translated(&db, 1), "A");
        assert_eq!(translated(&db, 2), "B");
        assert_eq!(translated(&db, 3), "A");
    }

    #[test]
    fn intent_is_logged_even_when_nothing_matches() {
        let db = seeded("ws-1", &["one", "two", "A here"]);

        let first = apply_correction(&db, &request("A", "B", CorrectionScope::Chapter, 3)).unwrap();
        let second = apply_correction(&db, &request("A", "B", CorrectionScope::Chapter, 3)).unwrap();

        assert_eq!(first.modified_count, 1);
        assert_eq!(second.modified_count, 0);
        assert_eq!(db.query_unsynced_corrections(Some("ws-1")).unwrap().len(), 2);
        assert_eq!(pending_corrections_count(&db, "ws-1").unwrap(), 2);
    }

    #[test]
    fn missing_chapter_is_a_no_op() {
        let db = seeded("ws-1", &["A"]);
        let outcome = apply_correction(&db, &request("A", "B", CorrectionScope::Chapter, 42)).unwrap();
        assert_eq!(outcome.modified_count, 0);
        assert_eq!(translated(&db, 1), "A");
    }

    #[test]
    fn empty_old_text_never_matches() {
        let db = seeded("ws-1", &["abc"]);
        let outcome = apply_correction(&db, &request("", "z", CorrectionScope::All, 1)).unwrap();
        assert_eq!(outcome.modified_count, 0);
        assert_eq!(translated(&db, 1), "abc");
        assert!(db.query_dirty_chapters("ws-1").unwrap().is_empty());
    }

    #[test]
    fn chapters_without_translation_are_skipped() {
        let db = memory_db();
        db.put_workspace(&workspace("ws-1")).unwrap();
        let mut untranslated = chapter(1, "");
        untranslated.content_translated = None;
        untranslated.content_original = "A original".to_string();
        db.replace_chapters("ws-1", &[untranslated, chapter(2, "A")]).unwrap();

        let outcome = apply_correction(&db, &request("A", "B", CorrectionScope::All, 1)).unwrap();
        assert_eq!(outcome.modified_orders, vec![2]);
    }

    #[test]
    fn unknown_workspace_fails_without_partial_writes() {
        let db = seeded("ws-1", &["A"]);
        let mut req = request("A", "B", CorrectionScope::All, 1);
        req.workspace_id = "missing".to_string();

        // FK 제약으로 로그 삽입 실패 -> 전체 롤백
        assert!(apply_correction(&db, &req).is_err());
        assert_eq!(db.pending_corrections_count(None).unwrap(), 0);
        assert_eq!(translated(&db, 1), "A");
    }
}
