use std::path::PathBuf;
use std::sync::Arc;

use notes_portal::api::create_router;
use notes_portal::auth::SessionAuthority;
use notes_portal::config::{AdminCredentials, AuthConfig, Config, ServerConfig, StorageConfig};
use notes_portal::storage::AssetStore;
use notes_portal::AppState;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;

const USERNAME: &str = "admin";
const PASSWORD: &str = "pa55word";

struct TestApp {
    base: String,
    root: PathBuf,
    http: reqwest::Client,
    _dir: tempfile::TempDir,
}

async fn spawn_app(require_auth: bool, max_upload_size: u64) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("public");

    let config = Config {
        auth: AuthConfig {
            credentials: Some(AdminCredentials {
                username: USERNAME.to_string(),
                password: PASSWORD.to_string(),
            }),
            require_auth,
            session_secret: Some("api-test-secret-0123456789abcdefgh".to_string()),
            session_ttl_seconds: 600,
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        storage: StorageConfig {
            public_dir: root.to_string_lossy().to_string(),
        },
        max_upload_size,
    };

    let state = Arc::new(AppState {
        assets: AssetStore::open(&root),
        sessions: SessionAuthority::from_config(&config.auth).unwrap(),
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        root,
        http: reqwest::Client::new(),
        _dir: dir,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self) -> String {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": USERNAME, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: Option<&str>, form: Form) -> reqwest::Response {
        let mut req = self.http.post(self.url("/api/files/upload")).multipart(form);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    async fn delete(&self, token: &str, id: &str) -> reqwest::Response {
        let mut url = reqwest::Url::parse(&self.base).unwrap();
        url.path_segments_mut().unwrap().extend(["api", "files", id]);
        self.http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn list(&self) -> Vec<Value> {
        let resp = self.http.get(self.url("/api/files")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    fn file_count(&self) -> usize {
        ["uploads", "metadata"]
            .iter()
            .map(|d| match std::fs::read_dir(self.root.join(d)) {
                Ok(rd) => rd.filter(|e| e.as_ref().unwrap().path().is_file()).count(),
                Err(_) => 0,
            })
            .sum()
    }
}

fn notes_form(file_name: &str, data: Vec<u8>) -> Form {
    Form::new()
        .text("filename", "Notes1")
        .text("description", "Algebra basics")
        .text("category", "Άλγεβρα")
        .part("file", Part::bytes(data).file_name(file_name.to_string()))
}

#[tokio::test]
async fn test_upload_and_fetch_scenario() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    let payload = b"0123456789".to_vec();
    let resp = app.upload(Some(&token), notes_form("notes.pdf", payload.clone())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["category"], "Άλγεβρα");
    assert_eq!(record["filename"], "Notes1");
    assert_eq!(record["description"], "Algebra basics");
    assert_eq!(record["originalFilename"], "notes.pdf");
    assert!(record["uploadDate"].as_str().is_some());

    let id = record["id"].as_str().unwrap();
    let path = record["path"].as_str().unwrap();
    assert_eq!(path, format!("/uploads/{id}"));

    let blob = app.http.get(app.url(path)).send().await.unwrap();
    assert_eq!(blob.status(), StatusCode::OK);
    assert_eq!(
        blob.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(blob.bytes().await.unwrap().as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_concurrent_same_name_uploads() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    let (a, b) = tokio::join!(
        app.upload(Some(&token), notes_form("same.pdf", b"first".to_vec())),
        app.upload(Some(&token), notes_form("same.pdf", b"second".to_vec()))
    );
    assert_eq!(a.status(), StatusCode::CREATED);
    assert_eq!(b.status(), StatusCode::CREATED);

    let a: Value = a.json().await.unwrap();
    let b: Value = b.json().await.unwrap();
    assert_ne!(a["id"], b["id"]);

    for record in [&a, &b] {
        let id = record["id"].as_str().unwrap();
        assert!(app.root.join("uploads").join(id).is_file());
    }
    assert_eq!(app.list().await.len(), 2);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected_without_writes() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    let form = Form::new()
        .text("filename", "Notes1")
        .text("description", "Algebra basics")
        .text("category", "Άλγεβρα");
    let resp = app.upload(Some(&token), form).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No file uploaded");
    assert!(!app.root.join("uploads").exists());
    assert!(!app.root.join("metadata").exists());
}

#[tokio::test]
async fn test_blank_file_input_counts_as_missing() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    let resp = app.upload(Some(&token), notes_form("", Vec::new())).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.file_count(), 0);
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = spawn_app(true, 16).await;
    let token = app.login().await;

    let resp = app
        .upload(Some(&token), notes_form("big.pdf", vec![0u8; 17]))
        .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.file_count(), 0);
}

#[tokio::test]
async fn test_list_empty() {
    let app = spawn_app(true, 1024).await;
    assert!(app.list().await.is_empty());
}

#[tokio::test]
async fn test_list_filters_by_category() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    app.upload(Some(&token), notes_form("a.pdf", b"a".to_vec())).await;
    let form = Form::new()
        .text("category", "Δίκτυα")
        .part("file", Part::bytes(b"b".to_vec()).file_name("b.pdf"));
    app.upload(Some(&token), form).await;

    let resp = app
        .http
        .get(app.url("/api/files"))
        .query(&[("category", "Δίκτυα")])
        .send()
        .await
        .unwrap();
    let records: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["originalFilename"], "b.pdf");
    // Fields left out of the form are stored as empty strings
    assert_eq!(records[0]["filename"], "");

    // An empty filter means no filter
    let resp = app
        .http
        .get(app.url("/api/files?category="))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let records: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_delete_then_list_and_delete_again() {
    let app = spawn_app(true, 1024 * 1024).await;
    let token = app.login().await;

    let resp = app.upload(Some(&token), notes_form("Σημειώσεις 1.pdf", b"x".to_vec())).await;
    let record: Value = resp.json().await.unwrap();
    let id = record["id"].as_str().unwrap().to_string();

    let resp = app.delete(&token, &id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "File deleted successfully");

    assert!(app.list().await.iter().all(|r| r["id"] != id.as_str()));
    assert_eq!(app.file_count(), 0);

    let resp = app.delete(&token, &id).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Failed to delete file");

    let blob = app.http.get(app.url(&format!("/uploads/{id}"))).send().await.unwrap();
    assert_eq!(blob.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_without_id() {
    let app = spawn_app(true, 1024).await;
    let token = app.login().await;

    let resp = app
        .http
        .delete(app.url("/api/files/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "File ID is required");
}

#[tokio::test]
async fn test_delete_rejects_internal_keys() {
    let app = spawn_app(true, 1024).await;
    let token = app.login().await;

    for id in [".trash", ".staging"] {
        let resp = app.delete(&token, id).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "id {id:?}");
    }
}

#[tokio::test]
async fn test_mutations_require_session() {
    let app = spawn_app(true, 1024).await;

    let resp = app.upload(None, notes_form("a.pdf", b"a".to_vec())).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.upload(Some("forged.token"), notes_form("a.pdf", b"a".to_vec())).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.delete("forged.token", "abc_a.pdf").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(app.file_count(), 0);
}

#[tokio::test]
async fn test_reserved_characters_fetch_through_path() {
    let app = spawn_app(false, 1024).await;

    for name in ["notes#1.pdf", "what?.pdf", "100%.pdf", "ok 1.pdf"] {
        let payload = name.as_bytes().to_vec();
        let resp = app.upload(None, notes_form(name, payload.clone())).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let record: Value = resp.json().await.unwrap();
        assert_eq!(record["originalFilename"], name);
        assert!(record["id"].as_str().unwrap().ends_with(name));

        let blob = app
            .http
            .get(app.url(record["path"].as_str().unwrap()))
            .send()
            .await
            .unwrap();
        assert_eq!(blob.status(), StatusCode::OK, "fetching {name}");
        assert_eq!(blob.bytes().await.unwrap().as_ref(), payload.as_slice());
    }
}

#[tokio::test]
async fn test_open_mode_accepts_anonymous_uploads() {
    let app = spawn_app(false, 1024).await;

    let resp = app.upload(None, notes_form("a.pdf", b"a".to_vec())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_login_and_session() {
    let app = spawn_app(true, 1024).await;

    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": USERNAME, "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let token = app.login().await;
    let resp = app
        .http
        .get(app.url("/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Value = resp.json().await.unwrap();
    assert_eq!(session["username"], USERNAME);
    assert!(session["expiresAt"].as_str().is_some());

    let resp = app.http.get(app.url("/api/auth/session")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = spawn_app(true, 1024).await;

    let resp = app
        .http
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{ nope")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_categories_and_health() {
    let app = spawn_app(true, 1024).await;

    let categories: Vec<Value> = app
        .http
        .get(app.url("/api/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let labels: Vec<&str> = categories
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Άλγεβρα",
            "Προγραμματισμός",
            "Δίκτυα",
            "Νέα Ελληνικά",
            "Πληροφοριακά Συστήματα"
        ]
    );

    let health: Value = app
        .http
        .get(app.url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}
