//! Backups stored under an HTTP endpoint with PUT / GET / DELETE.
//!
//! Any WebDAV share or object store with a plain HTTP interface works.
//! The session token, when present, is sent as `Authorization: Bearer`.

use std::fs;
use std::path::Path;

use crate::errors::{Result, SecureBoxError};

use super::CloudBackup;

/// HTTP transport, compiled in with the `http-backup` feature.
#[derive(Debug, Clone)]
pub struct HttpBackup {
    endpoint: String,
    token: Option<String>,
}

impl HttpBackup {
    /// Build a transport for `endpoint` (must be `http://` or `https://`).
    pub fn new(endpoint: &str, token: Option<&str>) -> Result<Self> {
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(SecureBoxError::Cloud(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    fn url(&self, remote: &str) -> String {
        format!("{}/{remote}", self.endpoint)
    }

    fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

impl CloudBackup for HttpBackup {
    fn upload(&self, local: &Path, remote: &str) -> bool {
        let body = match fs::read(local) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read file to upload");
                return false;
            }
        };

        let mut request = ureq::put(&self.url(remote));
        if let Some(auth) = self.bearer() {
            request = request.header("Authorization", &auth);
        }

        match request.send(&body[..]) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, remote, "HTTP upload failed");
                false
            }
        }
    }

    fn download(&self, remote: &str, local: &Path) -> bool {
        let mut request = ureq::get(&self.url(remote));
        if let Some(auth) = self.bearer() {
            request = request.header("Authorization", &auth);
        }

        let body = request
            .call()
            .and_then(|mut response| response.body_mut().read_to_vec());
        match body {
            Ok(bytes) if !bytes.is_empty() => fs::write(local, bytes).is_ok(),
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(error = %e, remote, "HTTP download failed");
                false
            }
        }
    }

    fn delete(&self, remote: &str) -> bool {
        let mut request = ureq::delete(&self.url(remote));
        if let Some(auth) = self.bearer() {
            request = request.header("Authorization", &auth);
        }
        request.call().is_ok()
    }

    fn session_token(&self) -> Option<String> {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(HttpBackup::new("ftp://example.com", None).is_err());
    }

    #[test]
    fn joins_urls_without_double_slash() {
        let backup = HttpBackup::new("https://example.com/backups/", None).unwrap();
        assert_eq!(
            backup.url("securebox.json.BAK"),
            "https://example.com/backups/securebox.json.BAK"
        );
    }

    #[test]
    fn bearer_header_uses_token() {
        let backup = HttpBackup::new("https://example.com", Some("abc")).unwrap();
        assert_eq!(backup.bearer().as_deref(), Some("Bearer abc"));
        assert_eq!(backup.session_token().as_deref(), Some("abc"));
    }
}
