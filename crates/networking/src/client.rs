//! HTTP client
//!
//! The single point of transport access. Every request goes to
//! `{base_url}/{route}`, every failure comes back as a
//! [`NetworkError`](crate::NetworkError), and [`HttpClient::dispose`]
//! cancels whatever is still in flight.

use std::future::Future;

use futures::StreamExt;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::download::{self, DownloadedFile};
use crate::error::{NetworkError, NetworkErrorCause, Result};
use crate::multipart::{self, FormFile};
use crate::progress::{self, report, Progress, ProgressCallback};

enum PostBody {
    Json(Vec<u8>),
    Form(Form),
}

/// HTTP client with normalized errors
///
/// # Examples
/// ```no_run
/// use networking::{ClientConfig, HttpClient};
///
/// async fn example() -> Result<(), networking::NetworkError> {
///     let client = HttpClient::new(ClientConfig::new("https://api.example.com"))?;
///     let post = client.get_http("/posts/1").await?;
///     println!("{}", post["title"]);
///     client.dispose();
///     Ok(())
/// }
/// ```
pub struct HttpClient {
    config: ClientConfig,
    transport: RwLock<Option<reqwest::Client>>,
    disposed: watch::Sender<bool>,
}

impl HttpClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = build_transport(&config)?;
        let (disposed, _) = watch::channel(false);

        Ok(Self { config, transport: RwLock::new(Some(transport)), disposed })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check if the client has been disposed
    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// GET a route and parse the JSON response
    pub async fn get_http(&self, route: &str) -> Result<Value> {
        let result = self
            .guarded(async {
                let transport = self.transport()?;
                let url = self.config.url_for(route);
                debug!("GET {}", url);

                let response = transport.get(&url).send().await?;
                read_json(response, None).await
            })
            .await;

        log_failure("GET", route, result)
    }

    /// POST a JSON body and parse the JSON response
    ///
    /// `progress` receives samples for both the upload and the response.
    pub async fn post_http<B>(
        &self,
        route: &str,
        body: &B,
        progress: Option<ProgressCallback>,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = match serde_json::to_vec(body) {
            Ok(body) => body,
            Err(e) => {
                return log_failure("POST", route, Err(NetworkErrorCause::Encode(e.to_string()).into()))
            }
        };

        self.post(route, PostBody::Json(body), progress).await
    }

    /// POST a multipart form
    ///
    /// Files become parts `file0`, `file1`, … in input order. With no
    /// files this is a plain multipart post of `fields`. `progress` sees
    /// the file bytes go out, then the response come in.
    pub async fn post_http_form<I, K, V>(
        &self,
        route: &str,
        fields: I,
        files: Vec<FormFile>,
        progress: Option<ProgressCallback>,
    ) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.is_disposed() {
            return log_failure("POST", route, Err(NetworkErrorCause::Disposed.into()));
        }

        let form = match multipart::build_form(fields, files, progress.clone()).await {
            Ok(form) => form,
            Err(e) => return log_failure("POST", route, Err(e)),
        };

        self.post(route, PostBody::Form(form), progress).await
    }

    async fn post(
        &self,
        route: &str,
        body: PostBody,
        progress: Option<ProgressCallback>,
    ) -> Result<Value> {
        let result = self
            .guarded(async {
                let transport = self.transport()?;
                let url = self.config.url_for(route);
                debug!("POST {}", url);

                let request = match body {
                    PostBody::Json(bytes) => transport
                        .post(&url)
                        .header(CONTENT_TYPE, "application/json")
                        .header(CONTENT_LENGTH, bytes.len() as u64)
                        .body(progress::upload_body(bytes, progress.clone())),
                    // File parts already carry the send counter
                    PostBody::Form(form) => transport.post(&url).multipart(form),
                };

                let response = request.send().await?;
                read_json(response, progress.as_ref()).await
            })
            .await;

        log_failure("POST", route, result)
    }

    /// Local path `file_url` downloads to
    ///
    /// Pure and deterministic: the same URL always yields the same path.
    pub fn resolve_download_path(&self, file_url: &str) -> Result<std::path::PathBuf> {
        let url = download::resolve_url(&self.config.base_url, file_url)?;
        Ok(download::download_path(&self.config.resolve_download_dir(), &url))
    }

    /// Stream a remote file to its local path
    ///
    /// Each call writes its own `.part` file and renames it into place once
    /// complete, so concurrent downloads of the same URL do not interfere.
    /// On any failure, including disposal mid-transfer, the partial file is
    /// deleted and an existing file at the destination is left untouched.
    pub async fn download_file(
        &self,
        file_url: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadedFile> {
        let url = match download::resolve_url(&self.config.base_url, file_url) {
            Ok(url) => url,
            Err(e) => return log_failure("DOWNLOAD", file_url, Err(e)),
        };
        let destination = download::download_path(&self.config.resolve_download_dir(), &url);

        // The partial file lives inside the guarded future and is removed
        // when it is dropped unpersisted
        let result = self
            .guarded(async {
                let transport = self.transport()?;
                debug!("DOWNLOAD {} -> {}", url, destination.display());

                let response = transport
                    .get(url.clone())
                    .header(ACCEPT, "*/*")
                    .timeout(self.config.download_timeout)
                    .send()
                    .await?;
                let (temp_path, bytes) =
                    download::write_body(response, &destination, progress.as_ref()).await?;
                download::persist(temp_path, &destination)?;
                Ok(DownloadedFile { path: destination.clone(), bytes })
            })
            .await;

        if result.is_ok() {
            info!("Downloaded {} to {}", file_url, destination.display());
        }

        log_failure("DOWNLOAD", file_url, result)
    }

    /// Release the connection pool and cancel in-flight requests
    ///
    /// Requests still running resolve with a [`NetworkError`]; later calls
    /// fail immediately.
    pub fn dispose(&self) {
        if self.transport.write().take().is_some() {
            info!("HTTP client for {} disposed", self.config.base_url);
        }
        self.disposed.send_replace(true);
    }

    fn transport(&self) -> Result<reqwest::Client> {
        self.transport
            .read()
            .clone()
            .ok_or_else(|| NetworkErrorCause::Disposed.into())
    }

    /// Run a request, abandoning it as soon as the client is disposed
    async fn guarded<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        let disposed = self.disposed.subscribe();
        if *disposed.borrow() {
            return Err(NetworkErrorCause::Disposed.into());
        }

        tokio::select! {
            result = request => result,
            () = wait_disposed(disposed) => Err(NetworkErrorCause::Disposed.into()),
        }
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn wait_disposed(mut disposed: watch::Receiver<bool>) {
    loop {
        if *disposed.borrow_and_update() {
            return;
        }
        if disposed.changed().await.is_err() {
            return;
        }
    }
}

fn build_transport(config: &ClientConfig) -> Result<reqwest::Client> {
    let invalid = |e: &dyn std::fmt::Display| NetworkError::from(NetworkErrorCause::Config(e.to_string()));

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (key, value) in &config.default_headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid(&e))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
        headers.insert(name, value);
    }

    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| invalid(&e))
}

/// Read a response body as JSON, reporting receive progress
///
/// An empty successful body reads as `null`.
async fn read_json(response: reqwest::Response, progress: Option<&ProgressCallback>) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkErrorCause::Status(status.as_u16()).into());
    }

    let total = response.content_length();
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        body.extend_from_slice(&chunk);
        report(progress, Progress::receive(body.len() as u64, total));
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&body).map_err(|e| NetworkErrorCause::Decode(e.to_string()).into())
}

fn log_failure<T>(method: &str, route: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!("{} {} failed: {}", method, route, e.cause());
    }
    result
}
