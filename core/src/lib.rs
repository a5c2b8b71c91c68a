//! Async client for the Etherpad HTTP API.
//!
//! # Overview
//! Validates connection settings, builds authenticated `GET` requests against
//! the versioned API root (`{url}/api/{version}/{method}`), refuses methods
//! newer than the configured protocol version, and turns Etherpad's
//! `{code, message, data}` envelope and transport failures into one
//! [`ApiError`] carrying an HTTP-style status code.
//!
//! # Design
//! - `EtherpadClient` is immutable after construction and cheap to clone.
//! - Request building and response parsing are pure functions in
//!   [`dispatch`], so hosts with their own HTTP stack can drive them directly;
//!   the client runs them through a [`Transport`] (reqwest by default).
//! - The callable surface is the closed [`Method`] catalog.
//!
//! ```no_run
//! use etherpad_core::{Configuration, EtherpadClient, OnRemoteError};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Configuration::builder("6b95f6d270f4f719f1b70e8ad2f742deef94c5bccee7d495250c0fbb8cecefc7")
//!     .url("http://localhost:9001")
//!     .build()?;
//! let etherpad = EtherpadClient::new(config)?;
//! let pads = etherpad.list_all_pads(&(), OnRemoteError::Propagate).await?;
//! let exists = etherpad
//!     .get_revisions_count(&json!({"padID": "notes"}), OnRemoteError::SuppressToData)
//!     .await?
//!     .is_object();
//! # let _ = (pads, exists);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod methods;
pub mod transport;
pub mod version;

pub use client::EtherpadClient;
pub use config::{build_api_root, is_api_key, validate, Configuration, ConfigurationBuilder};
pub use dispatch::{build_request, parse_response, Dispatcher, Envelope, OnRemoteError};
pub use error::{ApiError, ConfigError, RemoteCode};
pub use http::{HttpRequest, HttpResponse};
pub use methods::{Method, MethodDescriptor, Param, METHODS};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use version::{ensure_supported, ApiVersion};
