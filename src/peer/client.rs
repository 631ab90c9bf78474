//! 피어 HTTP 클라이언트
//!
//! 데스크톱 동기화 서버의 JSON 엔드포인트를 호출합니다.
//! 대상 피어는 숨은 전역 상태가 아니라 호출마다 `PeerConnection`으로 넘겨받습니다.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{SyncConfig, DEFAULT_PEER_PORT, LAN_SENTINEL_TOKEN};
use crate::error::RaidenError;
use crate::models::SavedConnection;
use crate::peer::types::*;

const PAIRING_SCHEME: &str = "raiden";

/// 피어 연결 정보 (base URL + 토큰)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnection {
    pub base_url: String,
    pub token: String,
}

impl PeerConnection {
    /// 빈 토큰은 LAN 센티넬 토큰으로 대체
    pub fn new(base_url: &str, token: &str) -> Self {
        let token = if token.trim().is_empty() {
            LAN_SENTINEL_TOKEN.to_string()
        } else {
            token.to_string()
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// 페어링 URI 파싱: `raiden://sync?ip=192.168.1.5&port=8888&token=ABC`
    ///
    /// ip가 없으면 URI의 host, port가 없으면 8888을 사용합니다.
    pub fn from_pairing_uri(uri: &str) -> Result<Self, RaidenError> {
        let parsed = Url::parse(uri.trim())
            .map_err(|e| RaidenError::Protocol(format!("Invalid pairing URI: {}", e)))?;
        if parsed.scheme() != PAIRING_SCHEME {
            return Err(RaidenError::Protocol(format!(
                "Unsupported pairing scheme: {}",
                parsed.scheme()
            )));
        }

        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        let ip = param("ip")
            .or_else(|| parsed.host_str().map(str::to_string))
            .ok_or_else(|| RaidenError::Protocol("Pairing URI has no peer address".to_string()))?;
        let port = match param("port") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| RaidenError::Protocol(format!("Invalid port in pairing URI: {}", raw)))?,
            None => DEFAULT_PEER_PORT,
        };
        let token = param("token").unwrap_or_default();

        let saved = SavedConnection { ip, port };
        Ok(Self::new(&saved.base_url(), &token))
    }

    /// 저장용 `{ ip, port }`. 스킴 기본 포트(https 443 등)를 채워 넣습니다.
    pub fn saved_connection(&self) -> Option<SavedConnection> {
        let url = Url::parse(&self.base_url).ok()?;
        Some(SavedConnection {
            ip: url.host_str()?.to_string(),
            port: url.port_or_known_default()?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// 피어 REST 클라이언트
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    config: SyncConfig,
}

impl PeerClient {
    pub fn new(config: SyncConfig) -> Result<Self, RaidenError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("raiden-reader/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// GET 공통 처리: 상태 코드 확인 후 JSON 파싱
    async fn get_json<T: DeserializeOwned>(
        &self,
        conn: &PeerConnection,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, RaidenError> {
        let response = self
            .http
            .get(conn.endpoint(path))
            .query(query)
            .bearer_auth(&conn.token)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RaidenError::PeerStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| RaidenError::Protocol(format!("Malformed response from {}: {}", path, e)))
    }

    /// `/status` 확인 + identity 태그 검사
    pub async fn probe(&self, conn: &PeerConnection) -> Result<StatusResponse, RaidenError> {
        let status: StatusResponse = self
            .get_json(conn, "/status", &[], self.config.status_timeout)
            .await?;

        match status.app.as_deref() {
            Some(app) if app == self.config.identity_tag => Ok(status),
            other => Err(RaidenError::Protocol(format!(
                "Unexpected identity tag at {}: {:?}",
                conn.base_url, other
            ))),
        }
    }

    pub async fn library_manifest(&self, conn: &PeerConnection) -> Result<LibraryManifest, RaidenError> {
        self.get_json(conn, "/manifest", &[], self.config.manifest_timeout)
            .await
    }

    pub async fn workspace_manifest(
        &self,
        conn: &PeerConnection,
        workspace_id: &str,
    ) -> Result<WorkspaceManifest, RaidenError> {
        self.get_json(
            conn,
            "/manifest",
            &[("workspaceId", workspace_id.to_string())],
            self.config.manifest_timeout,
        )
        .await
    }

    pub async fn workspace(&self, conn: &PeerConnection, workspace_id: &str) -> Result<WorkspaceDto, RaidenError> {
        self.get_json(
            conn,
            "/workspace",
            &[("id", workspace_id.to_string())],
            self.config.payload_timeout,
        )
        .await
    }

    pub async fn dictionary(
        &self,
        conn: &PeerConnection,
        workspace_id: &str,
    ) -> Result<Vec<DictionaryEntryDto>, RaidenError> {
        self.get_json(
            conn,
            "/dictionary",
            &[("workspaceId", workspace_id.to_string())],
            self.config.payload_timeout,
        )
        .await
    }

    /// offset/limit 페이지네이션. 빈 배열은 데이터 끝
    pub async fn chapters(
        &self,
        conn: &PeerConnection,
        workspace_id: &str,
        offset: i64,
        limit: usize,
    ) -> Result<Vec<ChapterDto>, RaidenError> {
        self.get_json(
            conn,
            "/chapters",
            &[
                ("workspaceId", workspace_id.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
            self.config.payload_timeout,
        )
        .await
    }

    /// 교정 + dirty 챕터 전송. 2xx 이외는 실패
    pub async fn push(&self, conn: &PeerConnection, request: &PushRequest) -> Result<(), RaidenError> {
        let path = self.config.push_path.as_str();
        let response = self
            .http
            .post(conn.endpoint(path))
            .bearer_auth(&conn.token)
            .timeout(self.config.payload_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaidenError::PeerStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
