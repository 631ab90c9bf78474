//! Raiden Data Models
//!
//! 로컬 캐시 엔티티. 피어 와이어 포맷(DTO)은 `peer::types`에 따로 있고,
//! 변환은 그 경계에서 한 번만 일어납니다.

use serde::{Deserialize, Serialize};

/// 캐시된 워크스페이스 (책/번역 프로젝트 하나)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    /// 피어가 발급한 ID
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "sourceLang")]
    pub source_lang: Option<String>,
    #[serde(rename = "targetLang")]
    pub target_lang: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

/// 챕터 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Translated,
    Reviewing,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Draft => "draft",
            ChapterStatus::Translated => "translated",
            ChapterStatus::Reviewing => "reviewing",
        }
    }

    /// 알 수 없는 값은 draft로 취급
    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "translated" => ChapterStatus::Translated,
            "reviewing" => ChapterStatus::Reviewing,
            _ => ChapterStatus::Draft,
        }
    }
}

/// 캐시된 챕터
///
/// `id`는 로컬 저장소 전용 키이며 피어에 절대 전송하지 않습니다.
/// 피어와 공유되는 식별자는 `(workspace_id, order)` 입니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: i64,
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub title: String,
    #[serde(rename = "titleTranslated")]
    pub title_translated: Option<String>,
    #[serde(rename = "contentOriginal")]
    pub content_original: String,
    #[serde(rename = "contentTranslated")]
    pub content_translated: Option<String>,
    pub order: i64,
    pub status: ChapterStatus,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
    /// 마지막 push 이후 로컬에서 수정됨
    #[serde(rename = "isDirty")]
    pub is_dirty: bool,
}

/// 삽입 전 챕터 (로컬 ID 미할당)
#[derive(Debug, Clone, PartialEq)]
pub struct NewChapter {
    pub title: String,
    pub title_translated: Option<String>,
    pub content_original: String,
    pub content_translated: Option<String>,
    pub order: i64,
    pub status: ChapterStatus,
    pub updated_at: i64,
}

/// 용어집 항목 종류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryEntryType {
    Name,
    Character,
    #[default]
    Term,
    Phrase,
    Correction,
    Other,
}

impl DictionaryEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryEntryType::Name => "name",
            DictionaryEntryType::Character => "character",
            DictionaryEntryType::Term => "term",
            DictionaryEntryType::Phrase => "phrase",
            DictionaryEntryType::Correction => "correction",
            DictionaryEntryType::Other => "other",
        }
    }

    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "name" => DictionaryEntryType::Name,
            "character" => DictionaryEntryType::Character,
            "term" => DictionaryEntryType::Term,
            "phrase" => DictionaryEntryType::Phrase,
            "correction" => DictionaryEntryType::Correction,
            _ => DictionaryEntryType::Other,
        }
    }
}

/// 워크스페이스 범위 용어집 항목
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DictionaryEntry {
    pub original: String,
    pub translated: String,
    #[serde(rename = "type")]
    pub entry_type: DictionaryEntryType,
}

/// 워크스페이스별 마지막 읽기 위치
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingProgress {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    /// 로컬 ID가 아닌 order로 참조 (재동기화 후에도 유효)
    #[serde(rename = "chapterOrder")]
    pub chapter_order: i64,
    /// 챕터 렌더 높이 대비 스크롤 비율 [0, 1]
    pub ratio: f64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

/// 교정 범위
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionScope {
    /// 편집 시점의 챕터 하나
    Chapter,
    /// 해당 챕터와 그 이후 모든 챕터
    All,
}

impl CorrectionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionScope::Chapter => "chapter",
            CorrectionScope::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chapter" => Some(CorrectionScope::Chapter),
            "all" => Some(CorrectionScope::All),
            _ => None,
        }
    }
}

/// 교정 로그 항목 (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Correction {
    pub id: i64,
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "oldText")]
    pub old_text: String,
    #[serde(rename = "newText")]
    pub new_text: String,
    pub scope: CorrectionScope,
    #[serde(rename = "fromChapterOrder")]
    pub from_chapter_order: i64,
    #[serde(rename = "appliedAt")]
    pub applied_at: i64,
    #[serde(rename = "syncedToPC")]
    pub synced_to_pc: bool,
}

/// 삽입 전 교정 항목
#[derive(Debug, Clone, PartialEq)]
pub struct NewCorrection {
    pub workspace_id: String,
    pub old_text: String,
    pub new_text: String,
    pub scope: CorrectionScope,
    pub from_chapter_order: i64,
    pub applied_at: i64,
}

/// 마지막으로 성공한 피어 연결 (SyncMeta `lastSyncConnection`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedConnection {
    pub ip: String,
    pub port: u16,
}

impl SavedConnection {
    /// 저장된 연결에서 base URL 유도 (443이면 https)
    pub fn base_url(&self) -> String {
        if self.port == 443 {
            format!("https://{}", self.ip)
        } else {
            format!("http://{}:{}", self.ip, self.port)
        }
    }
}
