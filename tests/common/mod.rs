//! Shared fixtures: an on-disk test PKI and an in-process server.
//!
//! The PKI mirrors a real deployment: a root CA signs an intermediate CA,
//! which signs the server and client leaves. A second, unrelated root signs
//! a "rogue" client certificate that the server must reject.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use greeter::server::config::Config;
use greeter::server::{Daemon, IdentitySource};
use greeter::tls::{TlsFiles, TlsMaterial};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, DnValue, ExtendedKeyUsagePurpose, IsCa, Issuer,
    KeyPair, KeyUsagePurpose,
};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A certificate authority able to sign further certificates.
struct Authority {
    cert_pem: String,
    key: KeyPair,
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}

impl Authority {
    fn root(common_name: &str) -> Self {
        let key = KeyPair::generate().expect("root key");
        let cert = ca_params(common_name)
            .self_signed(&key)
            .expect("self-signed root");
        Self {
            cert_pem: cert.pem(),
            key,
        }
    }

    fn intermediate(&self, common_name: &str) -> Self {
        let key = KeyPair::generate().expect("intermediate key");
        let issuer = Issuer::from_ca_cert_pem(&self.cert_pem, &self.key).expect("issuer");
        let cert = ca_params(common_name)
            .signed_by(&key, &issuer)
            .expect("intermediate cert");
        Self {
            cert_pem: cert.pem(),
            key,
        }
    }

    /// Issue a leaf valid for localhost and 127.0.0.1. Returns (cert, key) PEM.
    fn leaf(&self, common_name: &str, usage: ExtendedKeyUsagePurpose) -> (String, String) {
        let key = KeyPair::generate().expect("leaf key");
        let mut params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .expect("leaf params");
        params.distinguished_name.push(
            DnType::CommonName,
            DnValue::Utf8String(common_name.to_string()),
        );
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![usage];
        let issuer = Issuer::from_ca_cert_pem(&self.cert_pem, &self.key).expect("issuer");
        let cert = params.signed_by(&key, &issuer).expect("leaf cert");
        (cert.pem(), key.serialize_pem())
    }
}

/// PEM files for a complete deployment, written to a temporary directory.
pub struct TestPki {
    dir: TempDir,
}

impl TestPki {
    pub fn generate() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let write = |name: &str, contents: &str| {
            fs::write(dir.path().join(name), contents).expect("write pki file");
        };

        let root = Authority::root("Greeter Test Root CA");
        let support = root.intermediate("Greeter Test Intermediate CA");
        let (server_cert, server_key) =
            support.leaf("greeter-server", ExtendedKeyUsagePurpose::ServerAuth);
        let (client_cert, client_key) =
            support.leaf("greeter-client", ExtendedKeyUsagePurpose::ClientAuth);

        let rogue_root = Authority::root("Rogue Root CA");
        let (rogue_cert, rogue_key) =
            rogue_root.leaf("rogue-client", ExtendedKeyUsagePurpose::ClientAuth);

        write("ca.pem", &root.cert_pem);
        write("support.pem", &support.cert_pem);
        write("server.pem", &server_cert);
        write("server-key.pem", &server_key);
        write("client.pem", &client_cert);
        write("client-key.pem", &client_key);
        write("rogue-ca.pem", &rogue_root.cert_pem);
        write("rogue.pem", &rogue_cert);
        write("rogue-key.pem", &rogue_key);

        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn files(&self, ca: &str, int: &str, cert: &str, key: &str) -> TlsFiles {
        TlsFiles {
            ca_cert: self.path(ca),
            int_cert: self.path(int),
            cert: self.path(cert),
            key: self.path(key),
        }
    }

    pub fn server_files(&self) -> TlsFiles {
        self.files("ca.pem", "support.pem", "server.pem", "server-key.pem")
    }

    pub fn client_material(&self) -> TlsMaterial {
        TlsMaterial::load(&self.files("ca.pem", "support.pem", "client.pem", "client-key.pem"))
            .expect("client material")
    }

    /// Trusts the real CAs but presents a certificate from the rogue root.
    pub fn rogue_client_material(&self) -> TlsMaterial {
        TlsMaterial::load(&self.files("ca.pem", "support.pem", "rogue.pem", "rogue-key.pem"))
            .expect("rogue material")
    }

    /// Valid client certificate, but trusts only the rogue root for the server.
    pub fn misconfigured_trust_material(&self) -> TlsMaterial {
        TlsMaterial::load(&self.files(
            "rogue-ca.pem",
            "rogue-ca.pem",
            "client.pem",
            "client-key.pem",
        ))
        .expect("misconfigured material")
    }
}

/// Server configuration on an ephemeral loopback port.
pub fn config(pki: Option<&TestPki>) -> Config {
    let mut config = Config::default();
    config.server.address = "127.0.0.1:0".to_string();
    config.server.grace_period_secs = 5;
    match pki {
        Some(pki) => {
            let files = pki.server_files();
            config.tls.enabled = true;
            config.tls.ca_cert_file = files.ca_cert;
            config.tls.int_cert_file = files.int_cert;
            config.tls.cert_file = files.cert;
            config.tls.key_file = files.key;
        }
        None => config.tls.enabled = false,
    }
    config
}

/// A server running on a background task.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<greeter::Result<()>>,
}

impl RunningServer {
    pub async fn start<I: IdentitySource>(config: &Config, identity: I) -> Self {
        let daemon = Daemon::bind_with_identity(config, identity)
            .await
            .expect("bind test server");
        let addr = daemon.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(daemon.serve_with_shutdown(async {
            let _ = rx.await;
        }));
        // Give the server a moment to start accepting.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    /// `host:port` as the CLI would be given it.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Signal shutdown without waiting for the drain to finish.
    pub fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Signal shutdown and wait for the server task to exit.
    pub async fn stop(mut self) -> greeter::Result<()> {
        self.signal();
        self.handle.await.expect("server task panicked")
    }
}
