//! Mutual-TLS material shared by the server and the client.
//!
//! Both ends load the same four files at startup: the root CA, the
//! intermediate CA, and their own leaf certificate with its private key.
//! The two CA certificates form the trust pool used to verify the peer; the
//! leaf pair is presented as this process's identity.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

use crate::{GreeterError, Result};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Paths to the PEM files making up one side's TLS material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    /// Root CA certificate.
    pub ca_cert: PathBuf,
    /// Intermediate CA certificate.
    pub int_cert: PathBuf,
    /// Leaf certificate presented to the peer.
    pub cert: PathBuf,
    /// Private key of the leaf certificate.
    pub key: PathBuf,
}

/// Set of CA certificates trusted to sign the peer's certificate.
#[derive(Debug, Clone, Default)]
pub struct TrustPool {
    certs: Vec<pem::Pem>,
}

impl TrustPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every certificate found in `pem_text`, returning how many were added.
    ///
    /// Non-certificate blocks are skipped. Text containing no certificate at
    /// all is rejected, so a truncated or mislabelled CA file fails loudly
    /// instead of producing a pool that trusts nothing.
    pub fn append_pem(&mut self, pem_text: &[u8], source: &Path) -> Result<usize> {
        let blocks = pem::parse_many(pem_text)
            .map_err(|e| GreeterError::certificate(source, format!("invalid PEM: {e}")))?;
        let before = self.certs.len();
        self.certs
            .extend(blocks.into_iter().filter(|b| b.tag() == CERTIFICATE_TAG));
        let added = self.certs.len() - before;
        if added == 0 {
            return Err(GreeterError::certificate(
                source,
                "failed to append to trust pool: no certificates found",
            ));
        }
        Ok(added)
    }

    /// Read a CA file from disk and add its certificates.
    pub fn append_file(&mut self, path: &Path) -> Result<usize> {
        let contents = read(path)?;
        self.append_pem(&contents, path)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    fn to_certificate(&self) -> Certificate {
        Certificate::from_pem(pem::encode_many(&self.certs))
    }
}

/// Loaded TLS material: trust pool plus this side's certificate and key.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct TlsMaterial {
    pool: TrustPool,
    cert_pem: String,
    key_pem: String,
}

impl TlsMaterial {
    /// Load and validate all four files.
    pub fn load(files: &TlsFiles) -> Result<Self> {
        let mut pool = TrustPool::new();
        pool.append_file(&files.ca_cert)?;
        pool.append_file(&files.int_cert)?;

        let cert_pem = read_pem_text(&files.cert)?;
        require_block(&cert_pem, &files.cert, |tag| tag == CERTIFICATE_TAG, "certificate")?;

        let key_pem = read_pem_text(&files.key)?;
        require_block(&key_pem, &files.key, |tag| tag.ends_with("PRIVATE KEY"), "private key")?;

        tracing::debug!(
            trusted = pool.len(),
            cert = %files.cert.display(),
            "loaded TLS material"
        );

        Ok(Self {
            pool,
            cert_pem,
            key_pem,
        })
    }

    pub fn trust_pool(&self) -> &TrustPool {
        &self.pool
    }

    fn identity(&self) -> Identity {
        Identity::from_pem(&self.cert_pem, &self.key_pem)
    }

    /// Server side: present our identity and require a client certificate
    /// chaining to the trust pool.
    pub fn server_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new()
            .identity(self.identity())
            .client_ca_root(self.pool.to_certificate())
    }

    /// Client side: verify the server against the trust pool and present
    /// our identity. `server_name` overrides the name checked against the
    /// server certificate; by default the host of the dialled URI is used.
    pub fn client_config(&self, server_name: Option<&str>) -> ClientTlsConfig {
        let config = ClientTlsConfig::new()
            .ca_certificate(self.pool.to_certificate())
            .identity(self.identity());
        match server_name {
            Some(name) => config.domain_name(name),
            None => config,
        }
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("trusted", &self.pool.len())
            .field("key_pem", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| GreeterError::certificate(path, format!("cannot read file: {e}")))
}

fn read_pem_text(path: &Path) -> Result<String> {
    String::from_utf8(read(path)?)
        .map_err(|_| GreeterError::certificate(path, "file is not valid UTF-8 PEM"))
}

fn require_block(
    pem_text: &str,
    path: &Path,
    accept: impl Fn(&str) -> bool,
    what: &str,
) -> Result<()> {
    let blocks = pem::parse_many(pem_text)
        .map_err(|e| GreeterError::certificate(path, format!("invalid PEM: {e}")))?;
    if blocks.iter().any(|b| accept(b.tag())) {
        Ok(())
    } else {
        Err(GreeterError::certificate(path, format!("no {what} found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};
    use tempfile::TempDir;

    fn self_signed() -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        (cert.pem(), key.serialize_pem())
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn valid_files(dir: &TempDir) -> TlsFiles {
        let (ca, _) = self_signed();
        let (int, _) = self_signed();
        let (cert, key) = self_signed();
        TlsFiles {
            ca_cert: write(dir, "ca.pem", &ca),
            int_cert: write(dir, "support.pem", &int),
            cert: write(dir, "leaf.pem", &cert),
            key: write(dir, "leaf-key.pem", &key),
        }
    }

    #[test]
    fn loads_valid_material() {
        let dir = TempDir::new().unwrap();
        let material = TlsMaterial::load(&valid_files(&dir)).unwrap();
        assert_eq!(material.trust_pool().len(), 2);
    }

    #[test]
    fn pool_counts_every_certificate_in_a_bundle() {
        let (a, _) = self_signed();
        let (b, _) = self_signed();
        let mut pool = TrustPool::new();
        let added = pool
            .append_pem(format!("{a}{b}").as_bytes(), Path::new("bundle.pem"))
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn pool_rejects_pem_without_certificates() {
        let (_, key) = self_signed();
        let mut pool = TrustPool::new();
        let err = pool
            .append_pem(key.as_bytes(), Path::new("ca.pem"))
            .unwrap_err();
        assert!(err.to_string().contains("no certificates found"));
        assert!(pool.is_empty());
    }

    #[test]
    fn missing_ca_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let mut files = valid_files(&dir);
        files.ca_cert = dir.path().join("absent.pem");
        let err = TlsMaterial::load(&files).unwrap_err();
        assert!(matches!(err, GreeterError::Certificate { .. }));
        assert!(err.to_string().contains("absent.pem"));
    }

    #[test]
    fn key_file_must_hold_a_private_key() {
        let dir = TempDir::new().unwrap();
        let mut files = valid_files(&dir);
        files.key = files.cert.clone();
        let err = TlsMaterial::load(&files).unwrap_err();
        assert!(err.to_string().contains("no private key found"));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let dir = TempDir::new().unwrap();
        let material = TlsMaterial::load(&valid_files(&dir)).unwrap();
        let rendered = format!("{material:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("PRIVATE KEY"));
    }
}
