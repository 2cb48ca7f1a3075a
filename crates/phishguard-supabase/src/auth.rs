//! GoTrue binding for [`AuthBackend`].

use async_trait::async_trait;
use phishguard_auth::{
    AuthBackend, AuthError, Credentials, Session, SessionEvent, SessionListener, Subscription,
};
use phishguard_core::Identity;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{SupabaseClient, error_message};

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

impl SupabaseClient {
    async fn rejection(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "auth request rejected");
        AuthError::backend(error_message(&body).unwrap_or_default())
    }
}

fn transport(error: impl std::fmt::Display) -> AuthError {
    AuthError::Transport(error.to_string())
}

#[async_trait]
impl AuthBackend for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(access_token) = self.access_token() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.endpoint("auth/v1/user").map_err(transport)?)
            .header("apikey", &self.anon_key)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!("stored session expired");
            self.set_access_token(None);
            self.broadcast(SessionEvent::Expired);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let user: UserResponse = response.json().await.map_err(transport)?;
        Ok(Some(Session {
            identity: user.into(),
            access_token,
        }))
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let mut endpoint = self.endpoint("auth/v1/token").map_err(transport)?;
        endpoint.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http
            .post(endpoint)
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let token: TokenResponse = response.json().await.map_err(transport)?;
        let session = Session {
            identity: token.user.into(),
            access_token: token.access_token,
        };
        self.set_access_token(Some(session.access_token.clone()));
        self.broadcast(SessionEvent::SignedIn(session.identity.clone()));
        Ok(session)
    }

    async fn sign_up_with_password(
        &self,
        credentials: &Credentials,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let mut endpoint = self.endpoint("auth/v1/signup").map_err(transport)?;
        endpoint.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let response = self
            .http
            .post(endpoint)
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(access_token) = self.access_token() {
            let response = self
                .http
                .post(self.endpoint("auth/v1/logout").map_err(transport)?)
                .header("apikey", &self.anon_key)
                .bearer_auth(&access_token)
                .send()
                .await
                .map_err(transport)?;

            // An already-invalid token still counts as signed out.
            if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
                return Err(Self::rejection(response).await);
            }
        }

        self.set_access_token(None);
        self.broadcast(SessionEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.register(listener)
    }
}
