//! HTTP and `file:` access to repositories.
//!
//! A GET answers `Ok(None)` when the repository does not serve the file:
//! HTTP 404, a missing local file, or a connection failure or timeout. Any
//! other non-2xx status is a hard [`MavenError::HttpStatus`].

use bytes::Bytes;
use mvn_model::{Credentials, MavenError, Repository, Result};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

const FILE_CHUNK_SIZE: usize = 64 * 1024;
const USER_AGENT: &str = concat!("mvn-resolver/", env!("CARGO_PKG_VERSION"));

/// Response body read chunk by chunk.
pub enum RemoteBody {
    Http(reqwest::Response),
    File(tokio::fs::File),
}

impl RemoteBody {
    pub async fn next_chunk(&mut self, url: &str) -> Result<Option<Bytes>> {
        match self {
            Self::Http(response) => response.chunk().await.map_err(|e| MavenError::RegistryError {
                url: url.to_string(),
                source: Box::new(e),
            }),
            Self::File(file) => {
                let mut buf = vec![0u8; FILE_CHUNK_SIZE];
                let read = file.read(&mut buf).await?;
                if read == 0 {
                    return Ok(None);
                }
                buf.truncate(read);
                Ok(Some(Bytes::from(buf)))
            }
        }
    }

    /// Reads the remaining body into memory.
    pub async fn bytes(mut self, url: &str) -> Result<Bytes> {
        let mut data = Vec::new();
        while let Some(chunk) = self.next_chunk(url).await? {
            data.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(data))
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| MavenError::RegistryError {
                url: String::new(),
                source: Box::new(e),
            })?;
        Ok(Self { client })
    }

    pub async fn get(&self, repository: &Repository, url: &str) -> Result<Option<RemoteBody>> {
        tracing::debug!(url, "GET");
        if repository.is_file() {
            let path = file_path(url)?;
            return match tokio::fs::File::open(&path).await {
                Ok(file) => Ok(Some(RemoteBody::File(file))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            };
        }

        let request = authorize(self.client.get(url), repository.credentials.as_ref());
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::warn!(url, error = %e, "repository unreachable");
                return Ok(None);
            }
            Err(e) => {
                return Err(MavenError::RegistryError {
                    url: url.to_string(),
                    source: Box::new(e),
                });
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(url, "not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(MavenError::HttpStatus {
                method: "GET",
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(RemoteBody::Http(response)))
    }

    pub async fn get_bytes(&self, repository: &Repository, url: &str) -> Result<Option<Bytes>> {
        match self.get(repository, url).await? {
            Some(body) => body.bytes(url).await.map(Some),
            None => Ok(None),
        }
    }

    /// Uploads `body`; any 2xx answer is success.
    pub async fn put(&self, repository: &Repository, url: &str, body: Bytes) -> Result<()> {
        tracing::debug!(url, size = body.len(), "PUT");
        if repository.is_file() {
            let path = file_path(url)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &body).await?;
            return Ok(());
        }

        let request = authorize(self.client.put(url), repository.credentials.as_ref());
        let response = request.body(body).send().await.map_err(|e| MavenError::RegistryError {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(MavenError::HttpStatus {
                method: "PUT",
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

fn authorize(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    match credentials {
        Some(Credentials::Basic { username, password }) => request.basic_auth(username(), Some(password())),
        Some(Credentials::Bearer { token }) => request.bearer_auth(token()),
        None => request,
    }
}

fn file_path(url: &str) -> Result<PathBuf> {
    let invalid = |message: &str| MavenError::InvalidRepositoryUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    parsed.to_file_path().map_err(|()| invalid("not a local file URL"))
}
