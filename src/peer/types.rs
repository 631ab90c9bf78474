//! 피어 와이어 포맷 (DTO)
//!
//! 피어 응답은 필드가 빠지거나 남는 경우가 많아서, 여기서 한 번만 기본값을 채우고
//! 내부 엔티티(`crate::models`)로 변환합니다. 알 수 없는 필드는 무시합니다.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Chapter, ChapterStatus, Correction, CorrectionScope, DictionaryEntry, DictionaryEntryType, NewChapter,
    Workspace,
};

/// `GET /status` 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// 라이브러리 매니페스트의 워크스페이스 항목
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestWorkspace {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "chapterCount", default)]
    pub chapter_count: i64,
}

/// `GET /manifest` 응답
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryManifest {
    #[serde(default)]
    pub workspaces: Vec<ManifestWorkspace>,
    #[serde(rename = "totalChapters", default)]
    pub total_chapters: i64,
}

impl LibraryManifest {
    pub fn find(&self, workspace_id: &str) -> Option<&ManifestWorkspace> {
        self.workspaces.iter().find(|ws| ws.id == workspace_id)
    }
}

/// `GET /manifest?workspaceId=X` 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    #[serde(rename = "totalChapters", default)]
    pub total_chapters: i64,
}

/// 피어 타임스탬프: epoch millis 또는 RFC 3339 문자열
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PeerTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl PeerTimestamp {
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            PeerTimestamp::Millis(ms) => Some(*ms),
            PeerTimestamp::Float(ms) if ms.is_finite() => Some(*ms as i64),
            PeerTimestamp::Float(_) => None,
            PeerTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis())
                .ok()
                .or_else(|| text.trim().parse::<i64>().ok()),
        }
    }
}

fn millis_or(ts: Option<&PeerTimestamp>, fallback: i64) -> i64 {
    ts.and_then(PeerTimestamp::to_millis).unwrap_or(fallback)
}

/// `GET /workspace?id=X` 응답 (id가 빠질 수 있음)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(rename = "sourceLang", default)]
    pub source_lang: Option<String>,
    #[serde(rename = "targetLang", default)]
    pub target_lang: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<PeerTimestamp>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<PeerTimestamp>,
}

impl WorkspaceDto {
    /// 피어 id가 없거나 비어 있으면 요청한 id 사용
    pub fn into_workspace(self, requested_id: &str, now: i64) -> Workspace {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| requested_id.to_string());
        let created_at = millis_or(self.created_at.as_ref(), now);
        let updated_at = millis_or(self.updated_at.as_ref(), created_at);

        Workspace {
            title: self.title.unwrap_or_else(|| id.clone()),
            id,
            author: self.author,
            cover: self.cover,
            description: self.description,
            genre: self.genre,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            created_at,
            updated_at,
        }
    }
}

/// `GET /dictionary?workspaceId=X` 배열 항목
///
/// 항목의 `workspaceId`는 읽지 않습니다. 저장 위치는 요청한 워크스페이스입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntryDto {
    pub original: String,
    #[serde(default)]
    pub translated: String,
    #[serde(rename = "type", default)]
    pub entry_type: Option<String>,
}

impl DictionaryEntryDto {
    pub fn into_entry(self) -> DictionaryEntry {
        DictionaryEntry {
            original: self.original,
            translated: self.translated,
            entry_type: self
                .entry_type
                .as_deref()
                .map(DictionaryEntryType::parse_lossy)
                .unwrap_or_default(),
        }
    }
}

/// `GET /chapters` 배열 항목
///
/// 피어가 보내는 `id`와 `workspaceId`는 선언하지 않으므로 역직렬화 단계에서 버려집니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_original: String,
    #[serde(default)]
    pub content_translated: Option<String>,
    #[serde(default)]
    pub title_translated: Option<String>,
    pub order: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<PeerTimestamp>,
}

impl ChapterDto {
    pub fn into_new_chapter(self, now: i64) -> NewChapter {
        NewChapter {
            title: self.title,
            title_translated: self.title_translated,
            content_original: self.content_original,
            content_translated: self.content_translated,
            order: self.order,
            status: self
                .status
                .as_deref()
                .map(ChapterStatus::parse_lossy)
                .unwrap_or_default(),
            updated_at: millis_or(self.updated_at.as_ref(), now),
        }
    }
}

/// push 본문의 교정 항목. 로컬 id는 보내지 않음
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionPayload {
    pub workspace_id: String,
    pub old_text: String,
    pub new_text: String,
    pub scope: CorrectionScope,
    pub from_chapter_order: i64,
    /// RFC 3339
    pub applied_at: String,
}

impl From<&Correction> for CorrectionPayload {
    fn from(c: &Correction) -> Self {
        let applied_at = DateTime::<Utc>::from_timestamp_millis(c.applied_at)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        CorrectionPayload {
            workspace_id: c.workspace_id.clone(),
            old_text: c.old_text.clone(),
            new_text: c.new_text.clone(),
            scope: c.scope,
            from_chapter_order: c.from_chapter_order,
            applied_at,
        }
    }
}

/// push 본문의 dirty 챕터 (order + 번역문만)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirtyChapterPayload {
    pub order: i64,
    pub content_translated: Option<String>,
}

impl From<&Chapter> for DirtyChapterPayload {
    fn from(c: &Chapter) -> Self {
        DirtyChapterPayload {
            order: c.order,
            content_translated: c.content_translated.clone(),
        }
    }
}

/// `POST /update` 본문
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub workspace_id: String,
    pub corrections: Vec<CorrectionPayload>,
    pub chapters: Vec<DirtyChapterPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workspace_id_falls_back_to_request() {
        let dto: WorkspaceDto = serde_json::from_value(json!({
            "title": "Tiên Nghịch",
            "sourceLang": "zh",
            "updatedAt": "2024-05-01T00:00:00Z"
        }))
        .unwrap();
        let ws = dto.into_workspace("ws-42", 1);
        assert_eq!(ws.id, "ws-42");
        assert_eq!(ws.source_lang.as_deref(), Some("zh"));
        assert_eq!(ws.created_at, 1);
        assert_eq!(ws.updated_at, 1_714_521_600_000);

        let dto: WorkspaceDto = serde_json::from_value(json!({ "id": "", "title": "x" })).unwrap();
        assert_eq!(dto.into_workspace("ws-42", 0).id, "ws-42");
    }

    #[test]
    fn chapter_dto_drops_peer_id_and_defaults() {
        let dto: ChapterDto = serde_json::from_value(json!({
            "id": 991,
            "workspaceId": "someone-else",
            "title": "Ch 1",
            "content_original": "原文",
            "order": 1,
            "status": "published",
            "updatedAt": 1_700_000_000_123_i64,
            "extra": { "ignored": true }
        }))
        .unwrap();
        let chapter = dto.into_new_chapter(5);
        assert_eq!(chapter.order, 1);
        assert_eq!(chapter.status, ChapterStatus::Draft);
        assert_eq!(chapter.content_translated, None);
        assert_eq!(chapter.updated_at, 1_700_000_000_123);
    }

    #[test]
    fn chapter_without_order_is_rejected() {
        let result = serde_json::from_value::<ChapterDto>(json!({ "title": "no order" }));
        assert!(result.is_err());
    }

    #[test]
    fn dictionary_type_defaults_to_term() {
        let dto: DictionaryEntryDto = serde_json::from_value(
            json!({ "workspaceId": "someone-else", "original": "林动", "translated": "Lâm Động" }),
        )
        .unwrap();
        assert_eq!(dto.into_entry().entry_type, DictionaryEntryType::Term);
    }

    #[test]
    fn push_payload_uses_wire_names() {
        let correction = Correction {
            id: 77,
            workspace_id: "ws-1".to_string(),
            old_text: "A".to_string(),
            new_text: "B".to_string(),
            scope: CorrectionScope::All,
            from_chapter_order: 3,
            applied_at: 1_700_000_000_000,
            synced_to_pc: false,
        };
        let request = PushRequest {
            workspace_id: "ws-1".to_string(),
            corrections: vec![CorrectionPayload::from(&correction)],
            chapters: vec![DirtyChapterPayload { order: 3, content_translated: Some("B".to_string()) }],
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["workspaceId"], "ws-1");
        assert_eq!(value["corrections"][0]["oldText"], "A");
        assert_eq!(value["corrections"][0]["scope"], "all");
        assert_eq!(value["corrections"][0]["appliedAt"], "2023-11-14T22:13:20.000Z");
        assert!(value["corrections"][0].get("id").is_none());
        assert_eq!(value["chapters"][0]["content_translated"], "B");
    }
}
