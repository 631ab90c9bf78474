//! Sync Engine (pull + push)
//!
//! pull: 선택한 워크스페이스의 스냅샷을 피어에서 받아 로컬 저장소를 교체합니다.
//! push: 로컬 교정 로그와 dirty 챕터를 피어로 보냅니다.
//!
//! 워크스페이스와 챕터 청크는 모두 순차 처리합니다. 저장소 잠금은 `.await` 너머로 유지하지 않습니다.
//!
//! 워크스페이스 경계를 넘는 원자성은 없습니다 (at-least-once). 한 워크스페이스 도중 실패하면
//! 앞서 끝난 워크스페이스는 남고, 진행 중이던 워크스페이스는 `syncIncomplete_{id}` 표시가
//! 남아 재시도 전까지 불완전한 것으로 취급됩니다.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::db::DbState;
use crate::error::RaidenError;
use crate::models::NewChapter;
use crate::peer::types::{CorrectionPayload, DirtyChapterPayload, PushRequest};
use crate::peer::{PeerClient, PeerConnection};

/// 청크 단위 진행 상황
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub loaded: i64,
    pub total: i64,
    pub workspace_title: String,
}

/// 진행 콜백. UI 표시용이며 무시해도 결과에 영향이 없습니다.
pub trait SyncProgressCallback: Send {
    fn progress(&mut self, progress: SyncProgress);
}

impl<F: FnMut(SyncProgress) + Send> SyncProgressCallback for F {
    fn progress(&mut self, progress: SyncProgress) {
        self(progress);
    }
}

impl SyncProgressCallback for () {
    fn progress(&mut self, _progress: SyncProgress) {}
}

/// 워크스페이스 하나의 pull 결과
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSyncResult {
    pub workspace_id: String,
    pub title: String,
    /// 실제로 받은 챕터 수
    pub chapters: i64,
    pub previous_chapters: i64,
    /// max(0, chapters - previous_chapters)
    pub new_chapters: i64,
}

/// pull 전체 결과
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySyncResult {
    pub workspaces: usize,
    pub chapters: i64,
    pub details: Vec<WorkspaceSyncResult>,
}

/// 진행률 누적 상태 (워크스페이스를 넘어 단조 증가)
struct ProgressTracker<'a> {
    loaded: i64,
    total: i64,
    sink: &'a mut dyn SyncProgressCallback,
}

impl ProgressTracker<'_> {
    fn advance(&mut self, received: i64, workspace_title: &str) {
        self.loaded += received;
        self.sink.progress(SyncProgress {
            loaded: self.loaded,
            total: self.total,
            workspace_title: workspace_title.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    client: PeerClient,
}

impl SyncEngine {
    pub fn new(client: PeerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PeerClient {
        &self.client
    }

    /// 피어 도달 가능 여부 (identity 검사 포함). 에러를 내지 않습니다.
    pub async fn check_connection(&self, conn: &PeerConnection) -> bool {
        match self.client.probe(conn).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(base_url = %conn.base_url, error = %e, "connection check failed");
                false
            }
        }
    }

    /// 라이브러리 pull
    ///
    /// `filter`가 None이면 매니페스트의 모든 워크스페이스. 매니페스트에 없는 id는 무시합니다.
    /// 한 워크스페이스라도 실패하면 즉시 중단하고 에러를 반환합니다.
    pub async fn download_library<P: SyncProgressCallback>(
        &self,
        db: &DbState,
        conn: &PeerConnection,
        filter: Option<&[String]>,
        mut progress: P,
    ) -> Result<LibrarySyncResult, RaidenError> {
        let manifest = self.client.library_manifest(conn).await?;

        let selected: Vec<_> = manifest
            .workspaces
            .iter()
            .filter(|ws| filter.map_or(true, |ids| ids.iter().any(|id| id == &ws.id)))
            .collect();
        if let Some(ids) = filter {
            for id in ids.iter().filter(|id| manifest.find(id).is_none()) {
                tracing::warn!(workspace_id = %id, "requested workspace is not in the manifest");
            }
        }

        let mut tracker = ProgressTracker {
            loaded: 0,
            total: selected.iter().map(|ws| ws.chapter_count.max(0)).sum(),
            sink: &mut progress,
        };

        let mut result = LibrarySyncResult::default();
        for ws in selected {
            let outcome = self
                .pull_workspace(db, conn, &ws.id, ws.chapter_count, &mut tracker)
                .await?;
            result.workspaces += 1;
            result.chapters += outcome.chapters;
            result.details.push(outcome);
        }

        tracing::info!(
            workspaces = result.workspaces,
            chapters = result.chapters,
            "library download finished"
        );
        Ok(result)
    }

    /// 워크스페이스 하나만 pull (`total`은 워크스페이스 매니페스트에서)
    pub async fn download_workspace<P: SyncProgressCallback>(
        &self,
        db: &DbState,
        conn: &PeerConnection,
        workspace_id: &str,
        mut progress: P,
    ) -> Result<WorkspaceSyncResult, RaidenError> {
        let manifest = self.client.workspace_manifest(conn, workspace_id).await?;
        let mut tracker = ProgressTracker {
            loaded: 0,
            total: manifest.total_chapters.max(0),
            sink: &mut progress,
        };
        self.pull_workspace(db, conn, workspace_id, manifest.total_chapters, &mut tracker)
            .await
    }

    async fn pull_workspace(
        &self,
        db: &DbState,
        conn: &PeerConnection,
        workspace_id: &str,
        total: i64,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<WorkspaceSyncResult, RaidenError> {
        let now = Utc::now().timestamp_millis();
        let chunk_size = self.client.config().chunk_size;

        // 1. 메타데이터 (피어 id 우선, 없으면 요청 id)
        let workspace = self
            .client
            .workspace(conn, workspace_id)
            .await?
            .into_workspace(workspace_id, now);
        let local_id = workspace.id.clone();
        db.lock()?.put_workspace(&workspace)?;

        // 2. 용어집 교체
        let entries: Vec<_> = self
            .client
            .dictionary(conn, workspace_id)
            .await?
            .into_iter()
            .map(|d| d.into_entry())
            .collect();
        db.lock()?.replace_dictionary(&local_id, &entries)?;

        // 3. 기존 챕터 수 기록 + 불완전 표시
        let previous_chapters = {
            let store = db.lock()?;
            let previous = store.count_chapters(&local_id)?;
            store.set_previous_chapter_count(&local_id, previous)?;
            store.set_sync_incomplete(&local_id, true)?;
            previous
        };

        // 4. 청크 단위 챕터 교체. 첫 청크는 기존 챕터 삭제와 같은 트랜잭션
        let mut offset: i64 = 0;
        let mut synced: i64 = 0;
        let mut replaced = false;
        while offset < total {
            let rows = self
                .client
                .chapters(conn, workspace_id, offset, chunk_size)
                .await?;
            let received = rows.len() as i64;
            let chapters: Vec<NewChapter> = rows.into_iter().map(|c| c.into_new_chapter(now)).collect();

            {
                let store = db.lock()?;
                if replaced {
                    store.append_chapters(&local_id, &chapters)?;
                } else {
                    store.replace_chapters(&local_id, &chapters)?;
                    replaced = true;
                }
            }

            tracing::debug!(workspace_id = %local_id, offset, received, total, "chapter chunk stored");
            offset += received;
            synced += received;
            tracker.advance(received, &workspace.title);

            // 빈 청크는 total과 무관하게 데이터 끝
            if received == 0 {
                break;
            }
        }

        // 5. 마무리 기록
        {
            let store = db.lock()?;
            if !replaced {
                store.replace_chapters(&local_id, &[])?;
            }
            store.set_last_sync(&local_id, &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))?;
            store.set_sync_incomplete(&local_id, false)?;
        }

        tracing::info!(
            workspace_id = %local_id,
            chapters = synced,
            previous = previous_chapters,
            "workspace synced"
        );

        Ok(WorkspaceSyncResult {
            workspace_id: local_id,
            title: workspace.title,
            chapters: synced,
            previous_chapters,
            new_chapters: (synced - previous_chapters).max(0),
        })
    }

    /// 워크스페이스 교정 push. 보낸 교정 수를 반환
    ///
    /// 보낼 교정이 없으면 피어에 요청하지 않고 0을 반환합니다.
    /// 성공 시 호출 전에 읽은 교정/챕터만 synced/clean으로 표시합니다 (한 트랜잭션).
    /// 네트워크 실패 시 로컬 상태는 바뀌지 않습니다.
    pub async fn push_corrections(
        &self,
        db: &DbState,
        conn: &PeerConnection,
        workspace_id: &str,
    ) -> Result<usize, RaidenError> {
        let (corrections, dirty) = {
            let store = db.lock()?;
            (
                store.query_unsynced_corrections(Some(workspace_id))?,
                store.query_dirty_chapters(workspace_id)?,
            )
        };

        if corrections.is_empty() {
            return Ok(0);
        }

        let request = PushRequest {
            workspace_id: workspace_id.to_string(),
            corrections: corrections.iter().map(CorrectionPayload::from).collect(),
            chapters: dirty.iter().map(DirtyChapterPayload::from).collect(),
        };
        self.client.push(conn, &request).await?;

        let correction_ids: Vec<i64> = corrections.iter().map(|c| c.id).collect();
        let chapter_ids: Vec<i64> = dirty.iter().map(|c| c.id).collect();
        let (marked, cleaned) = db.lock()?.complete_push(&correction_ids, &chapter_ids)?;

        tracing::info!(
            workspace_id = %workspace_id,
            corrections = marked,
            chapters = cleaned,
            "corrections pushed"
        );
        Ok(corrections.len())
    }

    /// 모든 워크스페이스 push
    ///
    /// 먼저 연결을 확인하고, 도달할 수 없으면 아무것도 바꾸지 않고 에러를 반환합니다.
    pub async fn push_all(&self, db: &DbState, conn: &PeerConnection) -> Result<usize, RaidenError> {
        if !self.check_connection(conn).await {
            return Err(RaidenError::PeerNotFound {
                tried: vec![conn.base_url.clone()],
            });
        }

        let workspace_ids: Vec<String> = db.lock()?.list_workspaces()?.into_iter().map(|ws| ws.id).collect();

        let mut pushed = 0;
        for workspace_id in &workspace_ids {
            pushed += self.push_corrections(db, conn, workspace_id).await?;
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_accumulates_across_calls() {
        let mut seen = Vec::new();
        let mut sink = |p: SyncProgress| seen.push((p.loaded, p.total, p.workspace_title));
        {
            let mut tracker = ProgressTracker { loaded: 0, total: 80, sink: &mut sink };
            tracker.advance(50, "A");
            tracker.advance(0, "A");
            tracker.advance(30, "B");
        }
        assert_eq!(
            seen,
            vec![
                (50, 80, "A".to_string()),
                (50, 80, "A".to_string()),
                (80, 80, "B".to_string())
            ]
        );
    }

    #[test]
    fn unit_callback_ignores_progress() {
        let mut sink = ();
        sink.progress(SyncProgress::default());
    }
}
