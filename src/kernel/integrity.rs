use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha512_224};
use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::IntegrityError;

const READ_CHUNK: usize = 64 * 1024;
const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Locates the executable the child command will run.
///
/// Names containing a `/` are taken as paths; bare names are searched in
/// `PATH` the same way the shell would.
pub fn resolve_program(command: &str) -> Result<PathBuf, IntegrityError> {
    if command.contains('/') {
        return Ok(PathBuf::from(command));
    }

    let search = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&search)
        .map(|dir| dir.join(command))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| IntegrityError::NotFound(command.to_string()))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// SHA-512/224 of the file contents, lower-case hex.
pub async fn compute_digest(path: &Path) -> Result<String, IntegrityError> {
    let read_err = |source| IntegrityError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(read_err)?;
    let mut hasher = Sha512_224::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await.map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = format!("{:x}", hasher.finalize());
    debug!(path = %path.display(), %digest, "checksum");
    Ok(digest)
}

/// Client of the release authority.
#[derive(Clone)]
pub struct IntegrityGate {
    client: Client,
    base_url: String,
}

impl IntegrityGate {
    pub fn new(base_url: &str) -> Result<Self, IntegrityError> {
        let client = Client::builder().timeout(CHECK_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET <base_url>/check_releases/<digest>`.
    ///
    /// 200 means recognized and 404 means unknown. Anything else, including
    /// a failed request, is an error.
    pub async fn is_recognized(&self, digest: &str) -> Result<bool, IntegrityError> {
        let url = format!("{}/check_releases/{}", self.base_url, digest);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::OK => {
                info!(%digest, "release recognized");
                Ok(true)
            }
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(IntegrityError::UnexpectedStatus(other)),
        }
    }
}
