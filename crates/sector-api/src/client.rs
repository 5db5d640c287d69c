// Authenticated API client
//
// Pairs the transport with the session. Every call obtains a fresh token
// from `AuthSession`; a 401 drops that token and re-issues the call exactly
// once after logging in again. Endpoint methods live in `panel.rs` and
// `actions.rs` as inherent impls on this type.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthSession;
use crate::error::{Error, TransportError};
use crate::transport::{ApiRequest, Transport};

/// Authenticated client for the Sector API.
#[derive(Clone)]
pub struct SectorClient {
    transport: Arc<Transport>,
    auth: Arc<AuthSession>,
}

impl SectorClient {
    pub fn new(transport: Arc<Transport>, auth: Arc<AuthSession>) -> Self {
        Self { transport, auth }
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Send with the current token. A 401 means the request never took
    /// effect, so it is re-sent once under a new session.
    pub(crate) async fn authorized(&self, request: &ApiRequest) -> Result<Value, Error> {
        let session = self.auth.session().await?;
        match self.transport.send(request, Some(session.token())).await {
            Err(e) if e.is_unauthorized() => {
                debug!(path = request.path(), "token rejected, re-authenticating");
                self.auth.invalidate_if_current(&session);
                let session = self.auth.session().await?;
                Ok(self.transport.send(request, Some(session.token())).await?)
            }
            other => Ok(other?),
        }
    }

    /// Authorized call decoded into `T`.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, Error> {
        let value = self.authorized(request).await?;
        decode(&value)
    }

    /// Authorized call returning a list the service may send as `null`.
    pub(crate) async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<Vec<T>, Error> {
        let list: Option<Vec<T>> = self.fetch(request).await?;
        Ok(list.unwrap_or_default())
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    T::deserialize(value).map_err(|e| {
        Error::Transport(TransportError::Decode {
            message: e.to_string(),
            body: value.to_string().chars().take(200).collect(),
        })
    })
}
