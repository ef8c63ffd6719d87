use super::{require_unique_name, DataProvider, ProviderError};
use crate::model::{Comment, Criterion, Judge, Project, Rating};
use anyhow::Context;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

const REST_PREFIX: &str = "rest/v1";
const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// Client for a hosted PostgREST-style backend.
///
/// Tables: `projects`, `criteria`, `judges`, `ratings`, `comments`, with
/// snake_case columns. Ratings and comments carry unique constraints on
/// (project_id, judge_id, criterion_id) and (project_id, judge_id) so that
/// upserts replace the previous row in one request. Catalog names are checked
/// against the current table, ignoring case, before an insert; a unique index
/// on `lower(name)` turns a concurrent duplicate into a 409.
#[derive(Clone, Debug)]
pub struct RestProvider {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct NewNamed<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct NewJudge<'a> {
    name: &'a str,
    password_hash: &'a str,
}

impl RestProvider {
    /// Create a client authenticated with the backend's API key
    pub fn new(url: &str, api_key: &str) -> anyhow::Result<Self> {
        Self::with_builder(url, api_key, reqwest::Client::builder())
    }

    fn with_builder(url: &str, api_key: &str, builder: reqwest::ClientBuilder) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(url).with_context(|| format!("Invalid backend URL: {}", url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).context("API key contains invalid characters")?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .context("API key contains invalid characters")?;
        headers.insert(HeaderName::from_static("apikey"), key);
        headers.insert(AUTHORIZATION, bearer);

        let client = builder
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join(&format!("{}/{}", REST_PREFIX, table))
            .map_err(|e| ProviderError::Invalid(format!("bad table URL: {}", e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET every row of a table, retrying transient failures
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        order_by_name: bool,
    ) -> Result<Vec<T>, ProviderError> {
        let mut query = vec![("select", "*")];
        if order_by_name {
            query.push(("order", "name.asc"));
        }
        let url = self.table_url(table, &query)?;

        // Retry strategy: exponential backoff with 3 attempts
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(3);

        RetryIf::start(
            retry_strategy,
            || async {
                let response = self.client.get(url.clone()).send().await?;
                let response = check_status(table, response).await?;
                Ok::<_, ProviderError>(response.json::<Vec<T>>().await?)
            },
            |e: &ProviderError| is_transient(e),
        )
        .await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, &str)],
        prefer: &str,
        body: Option<&B>,
    ) -> Result<Response, ProviderError> {
        let url = self.table_url(table, query)?;
        let mut request = self
            .client
            .request(method, url)
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        check_status(table, response).await
    }

    async fn insert<B: Serialize>(&self, table: &str, row: &B) -> Result<(), ProviderError> {
        self.send_json(Method::POST, table, &[], PREFER_MINIMAL, Some(&[row]))
            .await?;
        Ok(())
    }

    async fn delete_where(&self, table: &str, column: &str, filter: &str) -> Result<(), ProviderError> {
        self.send_json::<()>(Method::DELETE, table, &[(column, filter)], PREFER_MINIMAL, None)
            .await?;
        Ok(())
    }

    /// Delete one catalog row. PostgREST answers 2xx even when the filter
    /// matched nothing, so the deleted rows are echoed back and counted.
    async fn delete_record(&self, table: &str, kind: &'static str, id: &str) -> Result<(), ProviderError> {
        let filter = format!("eq.{}", id);
        let response = self
            .send_json::<()>(Method::DELETE, table, &[("id", filter.as_str())], PREFER_REPRESENTATION, None)
            .await?;
        let deleted: Vec<serde_json::Value> = response.json().await?;
        if deleted.is_empty() {
            return Err(ProviderError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn upsert<B: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &B,
    ) -> Result<(), ProviderError> {
        self.send_json(
            Method::POST,
            table,
            &[("on_conflict", on_conflict)],
            PREFER_UPSERT,
            Some(&[row]),
        )
        .await?;
        Ok(())
    }
}

/// Turn non-success responses into typed errors
async fn check_status(table: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized(format!("HTTP {}", status.as_u16())));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        table: table.to_string(),
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// PostgREST errors are JSON objects with a `message` field
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn is_transient(error: &ProviderError) -> bool {
    match error {
        ProviderError::Network(_) => true,
        ProviderError::Status { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

fn duplicate_on_conflict(kind: &'static str, name: &str, error: ProviderError) -> ProviderError {
    match error {
        ProviderError::Status { status: 409, .. } => ProviderError::Duplicate {
            kind,
            name: name.to_string(),
        },
        other => other,
    }
}

impl DataProvider for RestProvider {
    async fn list_projects(&self) -> Result<Vec<Project>, ProviderError> {
        self.select("projects", true).await
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, ProviderError> {
        self.select("criteria", true).await
    }

    async fn list_judges(&self) -> Result<Vec<Judge>, ProviderError> {
        self.select("judges", true).await
    }

    async fn list_ratings(&self) -> Result<Vec<Rating>, ProviderError> {
        self.select("ratings", false).await
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, ProviderError> {
        self.select("comments", false).await
    }

    async fn add_project(&self, name: &str) -> Result<(), ProviderError> {
        let existing: Vec<Project> = self.select("projects", false).await?;
        let name = require_unique_name("project", name, existing.iter().map(|p| p.name.as_str()))?;
        self.insert("projects", &NewNamed { name: &name })
            .await
            .map_err(|e| duplicate_on_conflict("project", &name, e))
    }

    async fn add_criterion(&self, name: &str) -> Result<(), ProviderError> {
        let existing: Vec<Criterion> = self.select("criteria", false).await?;
        let name = require_unique_name("criterion", name, existing.iter().map(|c| c.name.as_str()))?;
        self.insert("criteria", &NewNamed { name: &name })
            .await
            .map_err(|e| duplicate_on_conflict("criterion", &name, e))
    }

    async fn add_judge(&self, name: &str, password: &str) -> Result<(), ProviderError> {
        if password.is_empty() {
            return Err(ProviderError::Invalid("judge password cannot be empty".to_string()));
        }
        let existing: Vec<Judge> = self.select("judges", false).await?;
        let name = require_unique_name("judge", name, existing.iter().map(|j| j.name.as_str()))?;
        self.insert(
            "judges",
            &NewJudge {
                name: &name,
                password_hash: password,
            },
        )
        .await
        .map_err(|e| duplicate_on_conflict("judge", &name, e))
    }

    async fn delete_project(&self, id: &str) -> Result<(), ProviderError> {
        let filter = format!("eq.{}", id);
        self.delete_where("ratings", "project_id", &filter).await?;
        self.delete_where("comments", "project_id", &filter).await?;
        self.delete_record("projects", "project", id).await
    }

    async fn delete_criterion(&self, id: &str) -> Result<(), ProviderError> {
        let filter = format!("eq.{}", id);
        self.delete_where("ratings", "criterion_id", &filter).await?;
        self.delete_record("criteria", "criterion", id).await
    }

    async fn delete_judge(&self, id: &str) -> Result<(), ProviderError> {
        let filter = format!("eq.{}", id);
        self.delete_where("ratings", "judge_id", &filter).await?;
        self.delete_where("comments", "judge_id", &filter).await?;
        self.delete_record("judges", "judge", id).await
    }

    async fn upsert_rating(&self, rating: &Rating) -> Result<(), ProviderError> {
        self.upsert("ratings", "project_id,judge_id,criterion_id", rating)
            .await
    }

    async fn upsert_comment(&self, comment: &Comment) -> Result<(), ProviderError> {
        self.upsert("comments", "project_id,judge_id", comment).await
    }

    async fn reset_evaluations(&self) -> Result<(), ProviderError> {
        // PostgREST refuses unfiltered deletes
        self.delete_where("ratings", "project_id", "not.is.null").await?;
        self.delete_where("comments", "project_id", "not.is.null").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_appends_rest_prefix_and_query() {
        let provider = RestProvider::new("https://xyz.example.co", "anon-key").unwrap();
        let url = provider
            .table_url("projects", &[("select", "*"), ("order", "name.asc")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://xyz.example.co/rest/v1/projects?select=*&order=name.asc"
        );
    }

    #[test]
    fn test_table_url_keeps_base_path() {
        let provider = RestProvider::new("https://host.example/api", "k").unwrap();
        let url = provider.table_url("ratings", &[]).unwrap();
        assert_eq!(url.as_str(), "https://host.example/api/rest/v1/ratings");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RestProvider::new("not a url", "k").is_err());
    }

    #[test]
    fn test_error_message_extracts_postgrest_message() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            error_message(body),
            "duplicate key value violates unique constraint"
        );
        assert_eq!(error_message(" plain failure \n"), "plain failure");
    }

    #[test]
    fn test_conflict_maps_to_duplicate() {
        let err = duplicate_on_conflict(
            "project",
            "IA para Reciclaje",
            ProviderError::Status {
                table: "projects".to_string(),
                status: 409,
                message: "conflict".to_string(),
            },
        );
        assert!(matches!(err, ProviderError::Duplicate { kind: "project", .. }));
    }

    #[test]
    fn test_transient_classification() {
        let server = ProviderError::Status {
            table: "ratings".to_string(),
            status: 503,
            message: String::new(),
        };
        let client = ProviderError::Status {
            table: "ratings".to_string(),
            status: 400,
            message: String::new(),
        };
        assert!(is_transient(&server));
        assert!(!is_transient(&client));
        assert!(!is_transient(&ProviderError::Unauthorized("HTTP 401".to_string())));
    }

    /// Minimal HTTP/1.1 server that records each request and answers from
    /// a routing function
    mod stub {
        use std::sync::{Arc, Mutex};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        #[derive(Debug, Clone)]
        pub struct Received {
            pub request_line: String,
            pub headers: Vec<(String, String)>,
            pub body: String,
        }

        impl Received {
            pub fn header(&self, name: &str) -> Option<&str> {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.as_str())
            }
        }

        pub struct StubServer {
            pub url: String,
            received: Arc<Mutex<Vec<Received>>>,
            task: JoinHandle<()>,
        }

        impl StubServer {
            pub async fn start(respond: fn(&Received) -> (u16, &'static str)) -> Self {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let url = format!("http://{}/", listener.local_addr().unwrap());
                let received = Arc::new(Mutex::new(Vec::new()));
                let log = received.clone();

                let task = tokio::spawn(async move {
                    while let Ok((mut socket, _)) = listener.accept().await {
                        let log = log.clone();
                        tokio::spawn(async move {
                            let Some(request) = read_request(&mut socket).await else {
                                return;
                            };
                            let (status, body) = respond(&request);
                            log.lock().unwrap().push(request);
                            let response = format!(
                                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status,
                                body.len(),
                                body
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        });
                    }
                });

                Self { url, received, task }
            }

            pub fn received(&self) -> Vec<Received> {
                self.received.lock().unwrap().clone()
            }
        }

        impl Drop for StubServer {
            fn drop(&mut self) {
                self.task.abort();
            }
        }

        async fn read_request(socket: &mut TcpStream) -> Option<Received> {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let head_end = loop {
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos;
                }
                let n = socket.read(&mut chunk).await.ok()?;
                if n == 0 {
                    return None;
                }
                buf.extend_from_slice(&chunk[..n]);
            };

            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let mut lines = head.split("\r\n");
            let request_line = lines.next()?.to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                .collect();
            let content_length = headers
                .iter()
                .find(|(k, _)| k == "content-length")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);

            let mut body = buf[head_end + 4..].to_vec();
            while body.len() < content_length {
                let n = socket.read(&mut chunk).await.ok()?;
                if n == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..n]);
            }

            Some(Received {
                request_line,
                headers,
                body: String::from_utf8_lossy(&body).to_string(),
            })
        }
    }

    use stub::StubServer;

    fn provider_for(server: &StubServer) -> RestProvider {
        RestProvider::with_builder(&server.url, "anon-key", reqwest::Client::builder().no_proxy()).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_rating_posts_on_conflict_merge() {
        let server = StubServer::start(|_| (201, "")).await;
        let provider = provider_for(&server);

        provider
            .upsert_rating(&Rating {
                project_id: "p-1".to_string(),
                judge_id: "j-1".to_string(),
                criterion_id: "c-1".to_string(),
                score: 7.5,
            })
            .await
            .unwrap();

        let received = server.received();
        assert_eq!(received.len(), 1);
        let request = &received[0];
        assert!(request
            .request_line
            .starts_with("POST /rest/v1/ratings?on_conflict=project_id%2Cjudge_id%2Ccriterion_id "));
        assert_eq!(
            request.header("prefer"),
            Some("resolution=merge-duplicates,return=minimal")
        );
        assert_eq!(request.header("apikey"), Some("anon-key"));
        assert_eq!(request.header("authorization"), Some("Bearer anon-key"));

        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body[0]["criterion_id"], "c-1");
        assert_eq!(body[0]["score"], 7.5);
    }

    #[tokio::test]
    async fn test_rejected_key_maps_to_unauthorized() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("GET /rest/v1/projects") {
                (401, r#"{"message":"Invalid API key"}"#)
            } else {
                (403, r#"{"message":"permission denied"}"#)
            }
        })
        .await;
        let provider = provider_for(&server);

        let err = provider.list_projects().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(ref m) if m == "HTTP 401"));
        let err = provider.list_criteria().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(ref m) if m == "HTTP 403"));

        // Not retried
        assert_eq!(server.received().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_project_cascades_before_record() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("DELETE /rest/v1/projects") {
                (200, r#"[{"id":"p-1","name":"Solar Dryer"}]"#)
            } else {
                (204, "")
            }
        })
        .await;
        let provider = provider_for(&server);

        provider.delete_project("p-1").await.unwrap();

        let received = server.received();
        let lines: Vec<&str> = received.iter().map(|r| r.request_line.as_str()).collect();
        assert_eq!(
            lines,
            vec![
                "DELETE /rest/v1/ratings?project_id=eq.p-1 HTTP/1.1",
                "DELETE /rest/v1/comments?project_id=eq.p-1 HTTP/1.1",
                "DELETE /rest/v1/projects?id=eq.p-1 HTTP/1.1",
            ]
        );
        assert_eq!(received[0].header("prefer"), Some("return=minimal"));
        assert_eq!(received[2].header("prefer"), Some("return=representation"));
    }

    #[tokio::test]
    async fn test_delete_unknown_record_is_not_found() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("DELETE /rest/v1/judges") {
                (200, "[]")
            } else {
                (204, "")
            }
        })
        .await;
        let provider = provider_for(&server);

        let err = provider.delete_judge("does-not-exist").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::NotFound { kind: "judge", ref id } if id == "does-not-exist"
        ));
        assert_eq!(server.received().len(), 3);
    }

    #[tokio::test]
    async fn test_add_project_checks_names_ignoring_case() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("GET /rest/v1/projects") {
                (200, r#"[{"id":"p-1","name":"Solar Dryer"}]"#)
            } else {
                (201, "")
            }
        })
        .await;
        let provider = provider_for(&server);

        let err = provider.add_project("  solar DRYER ").await.unwrap_err();
        assert!(matches!(err, ProviderError::Duplicate { kind: "project", ref name } if name == "solar DRYER"));
        // Only the lookup went out
        assert_eq!(server.received().len(), 1);

        provider.add_project(" Wind Tunnel ").await.unwrap();
        let received = server.received();
        assert_eq!(received.len(), 3);
        assert!(received[2].request_line.starts_with("POST /rest/v1/projects "));
        assert_eq!(received[2].header("prefer"), Some("return=minimal"));
        let body: serde_json::Value = serde_json::from_str(&received[2].body).unwrap();
        assert_eq!(body, serde_json::json!([{"name": "Wind Tunnel"}]));
    }

    #[tokio::test]
    async fn test_insert_conflict_maps_to_duplicate() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("GET ") {
                (200, "[]")
            } else {
                (409, r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#)
            }
        })
        .await;
        let provider = provider_for(&server);

        let err = provider.add_criterion("Creativity").await.unwrap_err();
        assert!(matches!(err, ProviderError::Duplicate { kind: "criterion", .. }));
    }

    #[tokio::test]
    async fn test_one_failing_table_fails_the_snapshot() {
        let server = StubServer::start(|r| {
            if r.request_line.starts_with("GET /rest/v1/ratings") {
                (400, r#"{"message":"column ratings.score does not exist"}"#)
            } else {
                (200, "[]")
            }
        })
        .await;
        let provider = provider_for(&server);

        let err = crate::fetch::fetch_snapshot(&provider).await.unwrap_err();
        match err {
            ProviderError::Status { table, status, message } => {
                assert_eq!(table, "ratings");
                assert_eq!(status, 400);
                assert_eq!(message, "column ratings.score does not exist");
            }
            other => panic!("expected a status error, got {:?}", other),
        }
    }
}
