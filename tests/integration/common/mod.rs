use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use filedepot::config::{AppConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageConfig};
use filedepot::database::init_db;
use filedepot::state::AppState;

pub mod routes {
    pub const FILES: &str = "/api/v1/files";
    pub const FILE_SYSTEM: &str = "/api/v1/files/file-system";
    pub const DATABASE: &str = "/api/v1/files/database";

    pub fn file_system_file(id: i64) -> String {
        format!("{FILE_SYSTEM}/{id}")
    }

    pub fn database_file(id: i64) -> String {
        format!("{DATABASE}/{id}")
    }
}

/// A running test server backed by a SQLite database and a blob directory
/// inside a per-test temporary directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub files_dir: PathBuf,
    _workdir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

/// Raw download response for byte-level assertions.
pub struct BinaryResponse {
    pub status: u16,
    pub content_type: String,
    pub content_disposition: String,
    pub bytes: Vec<u8>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let workdir = tempfile::tempdir().expect("Failed to create temp dir");
        let files_dir = workdir.path().join("files");
        let db_url = format!("sqlite://{}?mode=rwc", workdir.path().join("test.db").display());

        let db = init_db(&db_url)
            .await
            .expect("Failed to initialize test database");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            storage: StorageConfig {
                files_dir: files_dir.clone(),
            },
        };

        let state = AppState {
            db,
            config: app_config,
        };

        let app = filedepot::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            files_dir,
            _workdir: workdir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Sends a DELETE request. The 303 redirect to the listing is followed,
    /// so the returned response is the listing that carries the message.
    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Uploads files as `(filename, bytes, mime)` triples plus a shared
    /// description. The file parts precede the description field, matching
    /// browser form ordering. The redirect to the listing is followed.
    pub async fn upload(
        &self,
        path: &str,
        files: Vec<(&str, Vec<u8>, &str)>,
        description: &str,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (filename, bytes, mime) in files {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(filename.to_string())
                .mime_str(mime)
                .expect("Failed to set MIME type");
            form = form.part("files", part);
        }
        form = form.text("description", description.to_string());

        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn download(&self, path: &str) -> BinaryResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send download request");

        let status = res.status().as_u16();
        let header = |name: &str| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let content_type = header("content-type");
        let content_disposition = header("content-disposition");
        let bytes = res
            .bytes()
            .await
            .expect("Failed to read download body")
            .to_vec();

        BinaryResponse {
            status,
            content_type,
            content_disposition,
            bytes,
        }
    }
}
