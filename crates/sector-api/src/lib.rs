// sector-api: async client for the Sector Alarm cloud API
//
// - `transport`: reqwest client, vendor headers, retry with backoff
// - `auth`: credentials, single-flight session management, lockout guard
// - `client`: authenticated calls with one re-login on 401
// - `panel` / `actions`: read and command endpoints
// - `models`: raw wire types

pub mod actions;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod panel;
pub mod transport;

pub use actions::{ArmAction, LockAction};
pub use auth::{AuthPolicy, AuthSession, Credentials, SessionInfo};
pub use client::SectorClient;
pub use panel::HousecheckCategory;
pub use error::{AuthError, Error, TransportError};
pub use transport::{ApiRequest, DEFAULT_BASE_URL, RetryPolicy, Transport, TransportConfig};
