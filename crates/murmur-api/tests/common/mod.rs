#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use murmur_api::auth::{AppState, AppStateInner};
use murmur_api::config::Config;
use murmur_api::notifier::{Notifier, NotifyError};
use murmur_api::suggestions::StaticSuggestions;
use murmur_db::Database;

pub const JWT_SECRET: &str = "integration-test-secret";

/// Keeps every code it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        _username: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Mail API that is always down.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_verification_code(
        &self,
        _email: &str,
        _username: &str,
        _code: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Status(503))
    }
}

/// Mail API that never answers within any sensible timeout.
pub struct SlowNotifier;

#[async_trait]
impl Notifier for SlowNotifier {
    async fn send_verification_code(
        &self,
        _email: &str,
        _username: &str,
        _code: &str,
    ) -> Result<(), NotifyError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

pub fn config() -> Config {
    Config {
        jwt_secret: JWT_SECRET.into(),
        ..Config::default()
    }
}

pub fn state_with(notifier: Arc<dyn Notifier>) -> AppState {
    state_with_config(notifier, config())
}

pub fn state_with_config(notifier: Arc<dyn Notifier>, config: Config) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        config,
        notifier,
        suggestions: Arc::new(StaticSuggestions),
    })
}

pub fn recording_state() -> (AppState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (state_with(notifier.clone()), notifier)
}
