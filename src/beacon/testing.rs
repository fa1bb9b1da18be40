//! Scripted in-memory transport for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use url::Url;

use crate::beacon::transport::Transport;
use crate::beacon::types::{BeaconError, BeaconResult};

/// What a host answers.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Body(&'static str),
    Status(u16),
    Refuse,
    /// Hang until notified, then answer with the body.
    Hold(Arc<Notify>, &'static str),
}

/// Answers per host and counts calls; unknown hosts refuse connections.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    behaviours: Mutex<HashMap<String, Behaviour>>,
    calls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn set(&self, host: &str, behaviour: Behaviour) {
        self.behaviours.lock().unwrap().insert(host.to_string(), behaviour);
    }

    pub fn calls(&self, host: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.host_str() == Some(host))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|url| url.path().to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> BeaconResult<Bytes> {
        self.calls.lock().unwrap().push(url.clone());
        let host = url.host_str().unwrap_or_default().to_string();
        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .get(&host)
            .cloned()
            .unwrap_or(Behaviour::Refuse);

        match behaviour {
            Behaviour::Body(body) => Ok(Bytes::from_static(body.as_bytes())),
            Behaviour::Status(status) => Err(BeaconError::Status {
                url: url.to_string(),
                status,
                body: String::new(),
            }),
            Behaviour::Refuse => Err(BeaconError::Connect(format!("{url}: connection refused"))),
            Behaviour::Hold(release, body) => {
                release.notified().await;
                Ok(Bytes::from_static(body.as_bytes()))
            }
        }
    }
}
