//! Discovery Service
//!
//! 사용자가 주소를 입력하지 않아도 도달 가능한 피어를 찾습니다.
//! 후보 URL 목록을 순서대로 한 번씩만 시도하며, 자동 재시도는 하지 않습니다.

use serde::Serialize;
use url::Url;

use crate::db::DbState;
use crate::error::RaidenError;
use crate::models::SavedConnection;
use crate::peer::types::LibraryManifest;
use crate::peer::{PeerClient, PeerConnection};

/// 탐색 결과
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    Found {
        connection: PeerConnection,
        manifest: LibraryManifest,
    },
    NotFound {
        tried: Vec<String>,
    },
}

/// 클라이언트 origin이 터널/HTTPS 호스트인지
pub fn is_tunnel_origin(origin: &Url) -> bool {
    let host = origin.host_str().unwrap_or_default();
    origin.scheme() == "https" || host.contains("trycloudflare.com") || host.contains("ngrok")
}

/// 후보 base URL 목록 (순서 유지, 중복 제거)
pub fn candidate_urls(origin: &Url, saved: Option<&SavedConnection>, port: u16) -> Vec<String> {
    let mut urls = Vec::new();

    if is_tunnel_origin(origin) {
        urls.push(origin.origin().ascii_serialization());
    } else if let Some(host) = origin.host_str() {
        urls.push(format!("http://{}:{}", host, port));
    }

    if let Some(saved) = saved {
        let saved_url = saved.base_url();
        if !urls.contains(&saved_url) {
            urls.push(saved_url);
        }
    }

    urls
}

/// 지정한 피어에 연결 (identity 확인 -> 매니페스트 -> 연결 정보 저장)
///
/// 페어링 URI로 직접 연결할 때와 탐색 후보 하나를 시도할 때 공통으로 사용합니다.
pub async fn connect(
    db: &DbState,
    client: &PeerClient,
    connection: &PeerConnection,
) -> Result<LibraryManifest, RaidenError> {
    client.probe(connection).await?;
    let manifest = client.library_manifest(connection).await?;

    if let Some(winner) = connection.saved_connection() {
        db.lock()?.save_connection(&winner)?;
    }
    Ok(manifest)
}

/// 피어 탐색
///
/// 네트워크/프로토콜 실패는 해당 후보만 제외합니다. 저장소 에러만 `Err`로 반환합니다.
pub async fn discover(db: &DbState, client: &PeerClient, origin: &Url) -> Result<DiscoveryOutcome, RaidenError> {
    let saved = db.lock()?.saved_connection()?;
    let config = client.config();
    let candidates = candidate_urls(origin, saved.as_ref(), config.peer_port);

    tracing::info!(candidates = ?candidates, "discovering peer");

    for base_url in &candidates {
        let connection = PeerConnection::new(base_url, &config.token);
        let manifest = match connect(db, client, &connection).await {
            Ok(manifest) => manifest,
            Err(e) if e.is_transient() => {
                tracing::debug!(base_url = %base_url, error = %e, "candidate rejected");
                continue;
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            base_url = %base_url,
            workspaces = manifest.workspaces.len(),
            total_chapters = manifest.total_chapters,
            "peer found"
        );
        return Ok(DiscoveryOutcome::Found { connection, manifest });
    }

    tracing::info!(tried = candidates.len(), "no peer found");
    Ok(DiscoveryOutcome::NotFound { tried: candidates })
}
