use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct StubWorkspace {
    pub id: String,
    pub title: String,
    pub chapters: Vec<Value>,
    pub dictionary: Vec<Value>,
}

impl StubWorkspace {
    pub fn new(id: &str, chapter_count: usize) -> Self {
        Self {
            id: id.to_owned(),
            title: format!("Book {id}"),
            chapters: chapters(id, chapter_count),
            dictionary: vec![
                json!({ "id": 9, "workspaceId": id, "original": "林动", "translated": "Lâm Động", "type": "character" }),
                json!({ "original": "元力", "translated": "nguyên lực" }),
            ],
        }
    }
}

/// order 1..=count 챕터 JSON (피어 id 포함)
pub fn chapters(workspace_id: &str, count: usize) -> Vec<Value> {
    (1..=count)
        .map(|order| {
            json!({
                "id": 10_000 + order,
                "workspaceId": workspace_id,
                "title": format!("Chapter {order}"),
                "content_original": format!("原文 {order}"),
                "content_translated": format!("ban dich {order}"),
                "order": order,
                "status": "translated",
                "updatedAt": "2024-05-01T00:00:00Z"
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PeerStubConfig {
    pub app: String,
    pub workspaces: Vec<StubWorkspace>,
    /// `/workspace` 응답에서 id 생략
    pub omit_workspace_id: bool,
    /// offset이 이 값 이상이면 빈 배열
    pub stop_after: Option<usize>,
    /// 이 offset의 챕터 요청은 500
    pub fail_chunk_at: Option<usize>,
    pub push_status: u16,
    /// 모든 응답 전 지연
    pub delay: Duration,
}

impl Default for PeerStubConfig {
    fn default() -> Self {
        Self {
            app: "raiden".to_owned(),
            workspaces: Vec::new(),
            omit_workspace_id: false,
            stop_after: None,
            fail_chunk_at: None,
            push_status: 200,
            delay: Duration::ZERO,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    #[allow(dead_code)]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct PeerStub {
    pub base_url: String,
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl PeerStub {
    pub fn spawn(config: PeerStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start peer stub server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("stub listens on an ip address")
            .port();
        let base_url = format!("http://127.0.0.1:{port}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let mut request = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = url::Url::parse(&format!("http://stub{}", request.url())).expect("parse request url");
            let query: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_owned());
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);

            let recorded_request = RecordedRequest {
                method: request.method().to_string(),
                path: url.path().to_owned(),
                query,
                authorization,
                body,
            };
            let (status, payload) = route(&config, &recorded_request);
            recorded.lock().expect("record request").push(recorded_request);

            if !config.delay.is_zero() {
                thread::sleep(config.delay);
            }

            let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("build header");
            let response = tiny_http::Response::from_string(payload)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        });

        Self {
            base_url,
            port,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("read requests").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for PeerStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn find<'a>(config: &'a PeerStubConfig, id: Option<&str>) -> Option<&'a StubWorkspace> {
    let id = id?;
    config.workspaces.iter().find(|ws| ws.id == id)
}

fn not_found() -> (u16, String) {
    (404, json!({ "error": "not found" }).to_string())
}

fn route(config: &PeerStubConfig, req: &RecordedRequest) -> (u16, String) {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/status") => (200, json!({ "app": config.app, "version": "stub" }).to_string()),
        ("GET", "/manifest") => match req.param("workspaceId") {
            Some(id) => match find(config, Some(id)) {
                Some(ws) => (200, json!({ "totalChapters": ws.chapters.len() }).to_string()),
                None => not_found(),
            },
            None => {
                let workspaces: Vec<Value> = config
                    .workspaces
                    .iter()
                    .map(|ws| json!({ "id": ws.id, "title": ws.title, "chapterCount": ws.chapters.len() }))
                    .collect();
                let total: usize = config.workspaces.iter().map(|ws| ws.chapters.len()).sum();
                (200, json!({ "workspaces": workspaces, "totalChapters": total }).to_string())
            }
        },
        ("GET", "/workspace") => match find(config, req.param("id")) {
            Some(ws) => {
                let mut body = json!({
                    "title": ws.title,
                    "author": "Stub Author",
                    "sourceLang": "zh",
                    "targetLang": "vi",
                    "createdAt": 1_700_000_000_000_i64,
                    "updatedAt": "2024-05-01T00:00:00Z"
                });
                if !config.omit_workspace_id {
                    body["id"] = json!(ws.id);
                }
                (200, body.to_string())
            }
            None => not_found(),
        },
        ("GET", "/dictionary") => match find(config, req.param("workspaceId")) {
            Some(ws) => (200, Value::Array(ws.dictionary.clone()).to_string()),
            None => not_found(),
        },
        ("GET", "/chapters") => {
            let Some(ws) = find(config, req.param("workspaceId")) else {
                return not_found();
            };
            let offset: usize = req.param("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let limit: usize = req.param("limit").and_then(|v| v.parse().ok()).unwrap_or(50);

            if config.fail_chunk_at == Some(offset) {
                return (500, json!({ "error": "chunk exploded" }).to_string());
            }
            if config.stop_after.is_some_and(|n| offset >= n) {
                return (200, "[]".to_owned());
            }
            let rows: Vec<Value> = ws.chapters.iter().skip(offset).take(limit).cloned().collect();
            (200, Value::Array(rows).to_string())
        }
        ("POST", "/update") => {
            let status = config.push_status;
            if (200..300).contains(&status) {
                (status, json!({ "ok": true }).to_string())
            } else {
                (status, json!({ "error": "rejected" }).to_string())
            }
        }
        _ => not_found(),
    }
}
