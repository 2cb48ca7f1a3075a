//! Shared fake auth backend for session manager tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use phishguard_auth::{
    AuthBackend, AuthError, Credentials, Session, SessionEvent, SessionListener, Subscription,
};
use phishguard_core::Identity;
use tokio::sync::Notify;

/// Creates a deterministic identity fixture.
#[allow(dead_code)]
pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

/// In-memory backend that records calls and lets tests push session events.
#[derive(Default)]
pub struct FakeAuthBackend {
    pub calls: Mutex<Vec<String>>,
    pub initial_session: Mutex<Option<Session>>,
    pub fail_with: Mutex<Option<String>>,
    pub listener: Mutex<Option<SessionListener>>,
    pub subscribe_count: AtomicUsize,
    pub unsubscribe_count: Arc<AtomicUsize>,
    pub hold_initial_lookup: Option<Arc<Notify>>,
    pub last_redirect: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FakeAuthBackend {
    pub fn with_initial(identity: Option<Identity>) -> Self {
        Self {
            initial_session: Mutex::new(identity.map(|identity| Session {
                identity,
                access_token: "token".to_string(),
            })),
            ..Self::default()
        }
    }

    pub fn emit(&self, event: SessionEvent) {
        let listener = self.listener.lock().expect("listener lock").clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: &str) -> Result<(), AuthError> {
        self.calls.lock().expect("calls lock").push(call.to_string());
        match self.fail_with.lock().expect("fail lock").clone() {
            Some(message) => Err(AuthError::backend(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(gate) = &self.hold_initial_lookup {
            gate.notified().await;
        }
        self.record("current_session")?;
        Ok(self.initial_session.lock().expect("session lock").clone())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.record("sign_in")?;
        Ok(Session {
            identity: Identity {
                id: format!("id-{}", credentials.email),
                email: credentials.email.clone(),
            },
            access_token: "token".to_string(),
        })
    }

    async fn sign_up_with_password(
        &self,
        _credentials: &Credentials,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        self.record("sign_up")?;
        *self.last_redirect.lock().expect("redirect lock") = Some(redirect_to.to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record("sign_out")
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().expect("listener lock") = Some(listener);
        let unsubscribed = Arc::clone(&self.unsubscribe_count);
        Subscription::new(move || {
            unsubscribed.fetch_add(1, Ordering::SeqCst);
        })
    }
}
