//! Client-side OAuth 2.0 authorization-code token manager with PKCE and RFC 9449 DPoP
//! proof-of-possession.
//!
//! The crate revolves around [`manager::TokenManager`]: callers ask it for a header-ready
//! credential and the manager decides whether to serve the cached access token, refresh it,
//! or drive a full authorization-code handshake through an external
//! [`prompt::AuthorizationPrompter`]. Concurrent callers are coalesced into a single
//! in-flight acquisition. When DPoP binding is configured, every token request carries a
//! freshly signed proof and the `use_dpop_nonce` challenge protocol is handled transparently.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod dpop;
pub mod error;
pub mod http;
pub mod jose;
pub mod manager;
pub mod obs;
pub mod pkce;
pub mod prompt;
pub mod token;

mod request;

mod _prelude {
	pub use std::{
		collections::BTreeSet,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")] pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
