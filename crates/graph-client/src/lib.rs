//! `graph-client`: Microsoft Graph implementation of the admin server's
//! remote boundary.
//!
//! # Architecture
//!
//! ```text
//! Settings
//!     │
//!     ▼
//! Credential      ← client secret, certificate, device code, or a preset token
//!     │
//!     ▼
//! TokenProvider   ← Azure AD token endpoint, cached until 60 s before expiry
//!     │
//!     ▼
//! GraphClient     ← bearer-authenticated JSON over reqwest
//!     │              implements m365_core::ResourceClient
//!     ▼
//! Graph v1.0      ← /teams, /groups, /users, /organization
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use graph_client::GraphClient;
//! use m365_core::{config::Settings, ResourceClient};
//! use std::sync::Arc;
//!
//! let settings = Settings::load(None)?;
//! settings.validate()?;
//! let client: Arc<dyn ResourceClient> = Arc::new(GraphClient::from_settings(&settings)?);
//! println!("{:?}", client.organization_name().await?);
//! ```

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod types;

pub use auth::{AppCertificate, Credential, TokenProvider};
pub use client::GraphClient;
pub use error::GraphError;
