//! Sync Commands
//!
//! 동기화 다이얼로그 오케스트레이션. 탐색/다운로드/보내기의 상태 머신을 소유하고
//! 겹치는 호출을 거절합니다.
//!
//! 상태: idle -> scanning -> found | not_found, found -> syncing -> done | error,
//! error | not_found -> scanning (수동 재시도)

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use url::Url;

use crate::db::DbState;
use crate::discovery::{self, DiscoveryOutcome};
use crate::error::{CommandError, CommandResult, RaidenError};
use crate::peer::types::LibraryManifest;
use crate::peer::PeerConnection;
use crate::sync::{LibrarySyncResult, SyncEngine, SyncProgress};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Scanning,
    Found,
    Syncing,
    Done,
    NotFound,
    Error,
}

/// 화면에 보여줄 세션 상태
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSessionState {
    pub status: SyncStatus,
    pub connection: Option<PeerConnection>,
    pub manifest: Option<LibraryManifest>,
    pub selected: BTreeSet<String>,
    pub progress: SyncProgress,
    pub result: Option<LibrarySyncResult>,
    pub error: Option<CommandError>,
    pub pushing: bool,
}

impl Default for SyncSessionState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            connection: None,
            manifest: None,
            selected: BTreeSet::new(),
            progress: SyncProgress::default(),
            result: None,
            error: None,
            pushing: false,
        }
    }
}

/// 진행 중 작업 표시. 작업 future가 끝나기 전에 drop되면 상태를 되돌립니다.
struct InFlight<'a> {
    state: &'a Mutex<SyncSessionState>,
    phase: Option<SyncStatus>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match self.phase {
            Some(phase) if state.status == phase => {
                state.status = SyncStatus::Error;
                state.error = Some(CommandError {
                    code: "INTERRUPTED".to_string(),
                    message: "Operation was abandoned before it finished".to_string(),
                    details: None,
                });
            }
            Some(_) => {}
            None => state.pushing = false,
        }
    }
}

fn busy(message: &str) -> CommandError {
    RaidenError::InvalidOperation(message.to_string()).into()
}

/// 동기화 세션
pub struct SyncSession {
    engine: SyncEngine,
    origin: Url,
    state: Mutex<SyncSessionState>,
}

impl SyncSession {
    pub fn new(engine: SyncEngine, origin: Url) -> Self {
        Self {
            engine,
            origin,
            state: Mutex::new(SyncSessionState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SyncSessionState>, RaidenError> {
        self.state
            .lock()
            .map_err(|e| RaidenError::Lock(format!("Failed to acquire session lock: {}", e)))
    }

    pub fn snapshot(&self) -> CommandResult<SyncSessionState> {
        Ok(self.state()?.clone())
    }

    /// scanning/syncing 진입. 이미 진행 중이면 거절
    fn begin(&self, phase: SyncStatus) -> CommandResult<InFlight<'_>> {
        let mut state = self.state()?;
        if matches!(state.status, SyncStatus::Scanning | SyncStatus::Syncing) {
            return Err(busy("A discovery or download is already in progress"));
        }
        state.status = phase;
        state.error = None;
        Ok(InFlight {
            state: &self.state,
            phase: Some(phase),
        })
    }

    fn found(&self, connection: PeerConnection, manifest: LibraryManifest) -> CommandResult<SyncStatus> {
        let mut state = self.state()?;
        state.selected = manifest.workspaces.iter().map(|ws| ws.id.clone()).collect();
        state.connection = Some(connection);
        state.manifest = Some(manifest);
        state.result = None;
        state.status = SyncStatus::Found;
        Ok(SyncStatus::Found)
    }

    /// not_found 전이. 이전 탐색의 연결/매니페스트/선택은 버립니다.
    fn not_found(&self, error: CommandError) -> CommandResult<()> {
        let mut state = self.state()?;
        state.status = SyncStatus::NotFound;
        state.connection = None;
        state.manifest = None;
        state.selected.clear();
        state.error = Some(error);
        Ok(())
    }

    fn fail(&self, error: CommandError) -> CommandError {
        if let Ok(mut state) = self.state() {
            state.status = SyncStatus::Error;
            state.error = Some(error.clone());
        }
        error
    }

    /// 피어 탐색 (재시도도 같은 호출)
    pub async fn discover(&self, db: &DbState) -> CommandResult<SyncStatus> {
        let _flight = self.begin(SyncStatus::Scanning)?;

        match discovery::discover(db, self.engine.client(), &self.origin).await {
            Ok(DiscoveryOutcome::Found { connection, manifest }) => self.found(connection, manifest),
            Ok(DiscoveryOutcome::NotFound { tried }) => {
                self.not_found(RaidenError::PeerNotFound { tried }.into())?;
                Ok(SyncStatus::NotFound)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// 페어링 URI(QR)로 직접 연결
    pub async fn pair(&self, db: &DbState, uri: &str) -> CommandResult<SyncStatus> {
        let connection = PeerConnection::from_pairing_uri(uri)?;
        let _flight = self.begin(SyncStatus::Scanning)?;

        match discovery::connect(db, self.engine.client(), &connection).await {
            Ok(manifest) => self.found(connection, manifest),
            Err(e) if e.is_transient() => {
                let error = CommandError::wrap("PEER_NOT_FOUND", "Paired peer is not reachable", e);
                self.not_found(error.clone())?;
                Err(error)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub fn toggle(&self, workspace_id: &str) -> CommandResult<bool> {
        let mut state = self.state()?;
        let known = state
            .manifest
            .as_ref()
            .is_some_and(|m| m.find(workspace_id).is_some());
        if !known {
            return Err(RaidenError::WorkspaceNotFound(workspace_id.to_string()).into());
        }
        if state.selected.remove(workspace_id) {
            Ok(false)
        } else {
            state.selected.insert(workspace_id.to_string());
            Ok(true)
        }
    }

    /// 전부 선택되어 있으면 전부 해제, 아니면 전부 선택
    pub fn toggle_all(&self) -> CommandResult<usize> {
        let mut state = self.state()?;
        let all: BTreeSet<String> = match &state.manifest {
            Some(manifest) => manifest.workspaces.iter().map(|ws| ws.id.clone()).collect(),
            None => return Ok(0),
        };
        state.selected = if state.selected == all { BTreeSet::new() } else { all };
        Ok(state.selected.len())
    }

    /// 선택한 워크스페이스 다운로드
    ///
    /// found/done/error(재시도) 상태에서만 가능합니다.
    /// 선택이 비어 있으면 아무것도 하지 않고 빈 결과를 반환합니다.
    pub async fn pull(&self, db: &DbState) -> CommandResult<LibrarySyncResult> {
        let (connection, filter) = {
            let state = self.state()?;
            if matches!(state.status, SyncStatus::Scanning | SyncStatus::Syncing) {
                return Err(busy("A discovery or download is already in progress"));
            }
            let ready = matches!(state.status, SyncStatus::Found | SyncStatus::Done | SyncStatus::Error);
            let (true, Some(connection), Some(manifest)) = (ready, &state.connection, &state.manifest) else {
                return Err(RaidenError::PeerNotFound { tried: Vec::new() }.into());
            };
            if state.selected.is_empty() {
                return Ok(LibrarySyncResult::default());
            }
            let filter: Option<Vec<String>> = if state.selected.len() < manifest.workspaces.len() {
                Some(state.selected.iter().cloned().collect())
            } else {
                None
            };
            (connection.clone(), filter)
        };

        let _flight = self.begin(SyncStatus::Syncing)?;
        self.state()?.progress = SyncProgress::default();

        let on_progress = |progress: SyncProgress| {
            if let Ok(mut state) = self.state.lock() {
                state.progress = progress;
            }
        };
        let outcome = self
            .engine
            .download_library(db, &connection, filter.as_deref(), on_progress)
            .await;

        match outcome {
            Ok(result) => {
                let mut state = self.state()?;
                state.status = SyncStatus::Done;
                state.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => Err(self.fail(CommandError::wrap("PULL_FAILED", "Download failed", e))),
        }
    }

    /// 교정 보내기. `workspace_id`가 None이면 모든 워크스페이스
    ///
    /// 세션에 연결이 없으면 마지막으로 저장된 연결을 사용합니다.
    pub async fn push(&self, db: &DbState, workspace_id: Option<&str>) -> CommandResult<usize> {
        let connection = {
            let mut state = self.state()?;
            if state.pushing {
                return Err(busy("A push is already in progress"));
            }
            let connection = match &state.connection {
                Some(conn) => conn.clone(),
                None => {
                    let saved = db
                        .lock()?
                        .saved_connection()?
                        .ok_or_else(|| CommandError::from(RaidenError::PeerNotFound { tried: Vec::new() }))?;
                    PeerConnection::new(&saved.base_url(), &self.engine.client().config().token)
                }
            };
            state.pushing = true;
            connection
        };
        let _flight = InFlight {
            state: &self.state,
            phase: None,
        };

        let outcome = match workspace_id {
            Some(id) => self.engine.push_corrections(db, &connection, id).await,
            None => self.engine.push_all(db, &connection).await,
        };

        outcome.map_err(|e| match e {
            RaidenError::PeerNotFound { .. } => CommandError::from(e),
            other => CommandError::wrap("PUSH_FAILED", "Push failed", other),
        })
    }
}
