//! File download seam and the default HTTP implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("got status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("could not write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Basic-auth credentials for a protected download root.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub trait FileDownloader {
    /// Downloads `url` to `dest_path`, creating parent directories as
    /// needed. The installer only calls this when `dest_path` is missing.
    fn download(
        &self,
        url: &str,
        dest_path: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<(), DownloadError>;
}

/// Blocking HTTP downloader with a progress bar.
#[derive(Debug, Default)]
pub struct HttpFileDownloader;

impl FileDownloader for HttpFileDownloader {
    fn download(
        &self,
        url: &str,
        dest_path: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<(), DownloadError> {
        let client = Client::new();
        let mut request = client.get(url);
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let resp = request.send().map_err(|source| DownloadError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|source| DownloadError::Io {
                path: dest_path.to_path_buf(),
                source,
            })?;
        }

        let total_size = resp.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"));

        let mut file = fs::File::create(dest_path).map_err(|source| DownloadError::Io {
            path: dest_path.to_path_buf(),
            source,
        })?;
        let mut reader = pb.wrap_read(resp);
        let bytes = io::copy(&mut reader, &mut file).map_err(|source| DownloadError::Io {
            path: dest_path.to_path_buf(),
            source,
        })?;
        pb.finish_and_clear();

        debug!(url, bytes, dest = %dest_path.display(), "download complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_writes_the_destination_file() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/dist/v1.0.0/node-v1.0.0-linux-x64.tar.gz")
            .with_status(200)
            .with_body(b"archive bytes")
            .create();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cache/node/archive.tar.gz");
        let url = format!("{}/dist/v1.0.0/node-v1.0.0-linux-x64.tar.gz", server.url());

        HttpFileDownloader.download(&url, &dest, None).unwrap();

        mock.assert();
        assert_eq!(fs::read(&dest).unwrap(), b"archive bytes");
    }

    #[test]
    fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/missing.tar.gz")
            .with_status(404)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("archive.tar.gz");
        let url = format!("{}/missing.tar.gz", server.url());

        let result = HttpFileDownloader.download(&url, &dest, None);
        assert!(matches!(
            result,
            Err(DownloadError::Status { status: 404, .. })
        ));
        assert!(!dest.exists());
    }

    #[test]
    fn credentials_are_sent_as_basic_auth() {
        let mut server = mockito::Server::new();
        // "user:secret" base64-encoded
        let mock = server
            .mock("GET", "/private.tar.gz")
            .match_header("authorization", "Basic dXNlcjpzZWNyZXQ=")
            .with_status(200)
            .with_body(b"ok")
            .create();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("private.tar.gz");
        let url = format!("{}/private.tar.gz", server.url());
        let credentials = Credentials {
            username: "user".to_string(),
            password: "secret".to_string(),
        };

        HttpFileDownloader
            .download(&url, &dest, Some(&credentials))
            .unwrap();
        mock.assert();
    }
}
