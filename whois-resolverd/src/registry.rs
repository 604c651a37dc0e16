use std::time::Duration;
use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use shared::protocol::{REGISTRY_REGISTER_PATH, REGISTRY_SERVICE_PATH, SERVICE_TAGS};
use shared::types::{Registration, RegistrationAck};
use crate::config::RegistryConfig;

/// Where this instance stands with the dispatch registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered(String),
    Deregistered,
}

/// HTTP calls against the dispatch registry
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn service_url(&self, instance_id: &str) -> String {
        format!("{}{}/{}", self.base_url, REGISTRY_SERVICE_PATH, instance_id)
    }

    /// `PUT /register`; returns the registry-issued instance id
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        let url = format!("{}{}", self.base_url, REGISTRY_REGISTER_PATH);
        let ack: RegistrationAck = self
            .http
            .put(&url)
            .json(registration)
            .send()
            .await
            .with_context(|| format!("Failed to reach registry at {}", url))?
            .error_for_status()
            .context("Registry rejected registration")?
            .json()
            .await
            .context("Failed to parse registration response")?;

        Ok(ack.uuid)
    }

    /// `PATCH /service/uuid/{id}/heartbeat`
    pub async fn heartbeat(&self, instance_id: &str) -> Result<()> {
        let url = format!("{}/heartbeat", self.service_url(instance_id));
        self.http
            .patch(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach registry at {}", url))?
            .error_for_status()
            .context("Registry rejected heartbeat")?;
        Ok(())
    }

    /// `DELETE /service/uuid/{id}/`
    pub async fn deregister(&self, instance_id: &str) -> Result<()> {
        let url = format!("{}/", self.service_url(instance_id));
        self.http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach registry at {}", url))?
            .error_for_status()
            .context("Registry rejected deregistration")?;
        Ok(())
    }
}

/// Drives the registration lifecycle. Registry failures are logged and
/// never retried.
pub struct Registrar {
    client: RegistryClient,
    state: RegistrationState,
    heartbeat: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Registrar {
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            state: RegistrationState::Unregistered,
            heartbeat: None,
        }
    }

    /// Register and start heartbeats. A registration body that could not be
    /// built is logged like any other registry failure and leaves the
    /// registrar unregistered.
    pub async fn start(
        client: RegistryClient,
        registration: Result<Registration>,
        heartbeat_interval: Duration,
        cancel: &CancellationToken,
    ) -> Self {
        let mut registrar = Self::new(client);

        match registration {
            Ok(registration) => {
                registrar.register(&registration).await;
                registrar.spawn_heartbeat(heartbeat_interval, cancel);
            }
            Err(e) => tracing::warn!("Cannot build service registration: {:#}", e),
        }

        if registrar.state == RegistrationState::Unregistered {
            tracing::warn!("Continuing without registry membership");
        }
        registrar
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// Register once. On failure the registrar stays unregistered for good.
    pub async fn register(&mut self, registration: &Registration) -> &RegistrationState {
        if self.state != RegistrationState::Unregistered {
            return &self.state;
        }

        match self.client.register(registration).await {
            Ok(instance_id) => {
                tracing::info!(
                    "Registered {} at {} as {}",
                    registration.service,
                    registration.endpoint,
                    instance_id
                );
                self.state = RegistrationState::Registered(instance_id);
            }
            Err(e) => {
                tracing::warn!("Service registration failed: {:#}", e);
            }
        }

        &self.state
    }

    /// Spawn the heartbeat task if registered. It stops when `cancel` fires
    /// or when the registrar deregisters.
    pub fn spawn_heartbeat(&mut self, interval: Duration, cancel: &CancellationToken) -> bool {
        let RegistrationState::Registered(instance_id) = &self.state else {
            return false;
        };

        let client = self.client.clone();
        let instance_id = instance_id.clone();
        let token = cancel.child_token();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            run_heartbeat(client, instance_id, interval, task_token).await;
        });

        self.heartbeat = Some((token, handle));
        true
    }

    /// Best-effort deregistration. The heartbeat task is stopped and awaited
    /// first so no keep-alive lands after the DELETE; each step waits at most
    /// `timeout`. Skips the call entirely if registration never succeeded.
    pub async fn deregister(&mut self, timeout: Duration) {
        if let Some((token, mut handle)) = self.heartbeat.take() {
            token.cancel();
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                tracing::warn!("Heartbeat did not stop within {:?}, aborting it", timeout);
                handle.abort();
            }
        }

        let RegistrationState::Registered(instance_id) = &self.state else {
            tracing::debug!("Not registered, skipping deregistration");
            return;
        };

        match tokio::time::timeout(timeout, self.client.deregister(instance_id)).await {
            Ok(Ok(())) => tracing::info!("Deregistered {}", instance_id),
            Ok(Err(e)) => tracing::warn!("Deregistration failed: {:#}", e),
            Err(_) => tracing::warn!("Deregistration timed out after {:?}", timeout),
        }

        self.state = RegistrationState::Deregistered;
    }
}

/// Keep-alive loop. Failures are logged and the next tick proceeds as usual.
pub async fn run_heartbeat(
    client: RegistryClient,
    instance_id: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; registration just happened
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Heartbeat shutting down");
                break;
            }
            _ = ticker.tick() => {
                match client.heartbeat(&instance_id).await {
                    Ok(()) => tracing::debug!("Heartbeat sent for {}", instance_id),
                    Err(e) => tracing::warn!("Heartbeat failed: {:#}", e),
                }
            }
        }
    }
}

/// Registration body for this instance
pub fn registration_for(config: &RegistryConfig, listen_port: u16) -> Result<Registration> {
    let endpoint = match &config.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => {
            let hostname = hostname::get()
                .context("Failed to get system hostname")?
                .to_string_lossy()
                .to_string();
            format!("http://{}:{}", hostname, listen_port)
        }
    };

    Ok(Registration {
        service: config.service_name.clone(),
        endpoint,
        tags: SERVICE_TAGS.iter().map(|t| t.to_string()).collect(),
    })
}
