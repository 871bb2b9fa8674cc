//! Read-only credential providers consulted once per attempt.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure while looking up a token.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("reading token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential provider failed: {0}")]
    Provider(String),
}

/// Supplies the bearer token for the `Authorization` header.
///
/// `Ok(None)` means "no token", and the header is omitted.
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    fn token(&self) -> Result<Option<String>, CredentialError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(None)
    }
}

#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(Some(self.0.clone()))
    }
}

/// Token read from an environment variable on every call; empty means none.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvToken {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// Token stored in a file (e.g. written by a login command).
///
/// A missing file means no token; other IO errors are reported.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFile {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
