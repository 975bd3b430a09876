use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// One canned answer, picked by method and path prefix.
#[derive(Debug, Clone)]
pub struct StubRoute {
    pub method: &'static str,
    pub path_prefix: &'static str,
    pub status: u16,
    pub body: String,
    pub headers: Vec<(&'static str, String)>,
}

impl StubRoute {
    pub fn json(method: &'static str, path_prefix: &'static str, body: serde_json::Value) -> Self {
        Self {
            method,
            path_prefix,
            status: 200,
            body: body.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decoded query pairs in request order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let url = url::Url::parse(&format!("http://stub{}", self.url)).expect("parse request url");
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

pub struct BackendStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BackendStub {
    pub fn spawn(routes: Vec<StubRoute>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start backend stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                let entry = RecordedRequest {
                    method: request.method().as_str().to_owned(),
                    url: request.url().to_owned(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.as_str().as_str().to_owned(), h.value.as_str().to_owned()))
                        .collect(),
                    body,
                };

                let route = routes.iter().find(|route| {
                    route.method == entry.method && entry.path().starts_with(route.path_prefix)
                });
                recorded.lock().expect("lock requests").push(entry);

                let Some(route) = route else {
                    let _ = request.respond(
                        tiny_http::Response::from_string(r#"{"message":"not found"}"#)
                            .with_status_code(404),
                    );
                    continue;
                };

                let mut response =
                    tiny_http::Response::from_string(route.body.clone()).with_status_code(route.status);
                let content_type =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                response = response.with_header(content_type);
                for (name, value) in &route.headers {
                    let header = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes())
                        .expect("build header");
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Drop for BackendStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn book_row(idx: usize, title: &str, category: &str) -> serde_json::Value {
    serde_json::json!({
        "id": format!("00000000-0000-0000-0000-{idx:012}"),
        "title": title,
        "author": "Omraam Mikhaël Aïvanhov",
        "description": "",
        "category": category,
        "cover_url": null,
        "pdf_url": null,
        "year": 1970,
        "pages": 200,
        "language": "English",
        "is_featured": false,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    })
}
