//! Minimal WHOIS client (RFC 3912): send one line over TCP, read until the
//! server closes the connection.

use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use crate::config::WhoisConfig;

/// A query ready to send to a WHOIS data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisQuery {
    /// Text written on the wire, without the trailing CRLF
    pub text: String,
    /// Selects the domain server rather than the address server
    pub host_lookup: bool,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to {server}: {source}")]
    Io {
        server: String,
        #[source]
        source: std::io::Error,
        partial: String,
    },

    #[error("lookup against {server} timed out after {timeout:?}")]
    Timeout {
        server: String,
        timeout: Duration,
        partial: String,
    },
}

impl LookupError {
    /// Whatever the server sent before the failure
    pub fn partial(&self) -> &str {
        match self {
            LookupError::Connect { .. } => "",
            LookupError::Io { partial, .. } | LookupError::Timeout { partial, .. } => partial,
        }
    }
}

/// External WHOIS data source
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, query: &WhoisQuery) -> Result<String, LookupError>;
}

pub struct WhoisClient {
    domain_server: String,
    address_server: String,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(config: &WhoisConfig) -> Self {
        Self {
            domain_server: config.domain_server.clone(),
            address_server: config.address_server.clone(),
            port: config.port,
            timeout: config.timeout(),
        }
    }

    fn server_for(&self, query: &WhoisQuery) -> &str {
        if query.host_lookup {
            &self.domain_server
        } else {
            &self.address_server
        }
    }

    fn timed_out(&self, server: &str, partial: &[u8]) -> LookupError {
        LookupError::Timeout {
            server: server.to_string(),
            timeout: self.timeout,
            partial: String::from_utf8_lossy(partial).into_owned(),
        }
    }
}

#[async_trait]
impl Lookup for WhoisClient {
    async fn lookup(&self, query: &WhoisQuery) -> Result<String, LookupError> {
        let server = self.server_for(query);
        let deadline = Instant::now() + self.timeout;
        let mut stream = match timeout_at(deadline, TcpStream::connect((server, self.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(LookupError::Connect { server: server.to_string(), source });
            }
            Err(_) => return Err(self.timed_out(server, &[])),
        };

        tracing::debug!("Querying {}:{} for {:?}", server, self.port, query.text);

        let line = format!("{}\r\n", query.text);
        match timeout_at(deadline, stream.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(LookupError::Io {
                    server: server.to_string(),
                    source,
                    partial: String::new(),
                });
            }
            Err(_) => return Err(self.timed_out(server, &[])),
        }

        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match timeout_at(deadline, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => data.extend_from_slice(&buf[..n]),
                Ok(Err(source)) => {
                    return Err(LookupError::Io {
                        server: server.to_string(),
                        source,
                        partial: String::from_utf8_lossy(&data).into_owned(),
                    });
                }
                Err(_) => return Err(self.timed_out(server, &data)),
            }
        }

        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn client_for(port: u16, timeout: Duration) -> WhoisClient {
        WhoisClient {
            domain_server: "127.0.0.1".to_string(),
            address_server: "127.0.0.1".to_string(),
            port,
            timeout,
        }
    }

    /// One-shot WHOIS server: reports the request line, sends `reply`, then
    /// closes unless `hold` is set.
    async fn spawn_server(reply: &'static str, hold: bool) -> (u16, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let _ = tx.send(line);

            let mut socket = reader.into_inner();
            socket.write_all(reply.as_bytes()).await.unwrap();
            if hold {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        });

        (port, rx)
    }

    #[tokio::test]
    async fn test_lookup_reads_until_close() {
        let (port, request) = spawn_server("Domain Name: EXAMPLE.COM\r\n", false).await;
        let client = client_for(port, Duration::from_secs(5));

        let query = WhoisQuery { text: "domain example.com".to_string(), host_lookup: true };
        let data = client.lookup(&query).await.unwrap();

        assert_eq!(request.await.unwrap(), "domain example.com\r\n");
        assert_eq!(data, "Domain Name: EXAMPLE.COM\r\n");
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_data() {
        let (port, _request) = spawn_server("NetRange: 192.0.2.0", true).await;
        let client = client_for(port, Duration::from_millis(200));

        let query = WhoisQuery { text: "192.0.2.1".to_string(), host_lookup: false };
        let err = client.lookup(&query).await.unwrap_err();

        assert!(matches!(err, LookupError::Timeout { .. }));
        assert_eq!(err.partial(), "NetRange: 192.0.2.0");
    }

    #[tokio::test]
    async fn test_connect_failure() {
        // Grab a free port, then close it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = client_for(port, Duration::from_secs(5));

        let query = WhoisQuery { text: "192.0.2.1".to_string(), host_lookup: false };
        let err = client.lookup(&query).await.unwrap_err();

        assert!(matches!(err, LookupError::Connect { .. }));
        assert_eq!(err.partial(), "");
    }

    #[test]
    fn test_server_selection() {
        let client = WhoisClient::new(&WhoisConfig::default());
        let host = WhoisQuery { text: "domain example.com".to_string(), host_lookup: true };
        let addr = WhoisQuery { text: "192.0.2.1".to_string(), host_lookup: false };
        assert_eq!(client.server_for(&host), "whois.verisign-grs.com");
        assert_eq!(client.server_for(&addr), "whois.arin.net");
    }
}
