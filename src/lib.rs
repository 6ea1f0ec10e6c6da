//! bilibili QR login relay
//!
//! Lets a web page obtain a logged-in bilibili cookie by showing a login QR
//! code. The server generates the challenge, polls the provider's status
//! endpoint and streams every state change to the page over Server-Sent
//! Events. Once the login is confirmed the credential is assembled from the
//! response cookies, a device fingerprint and (for the TV flow) exchanged
//! tokens, probed once for validity, and handed to the page, which passes it
//! on to its opener or parent window under a trusted-origin policy.
//!
//! # Architecture
//!
//! - [`session`]: signing, credential assembly, the web and TV login flows,
//!   the poll state machine and the session registry
//! - [`server`]: axum router, admission control and the SSE controller
//! - [`broadcast`]: the cross-window delivery policy and the stream consumer
//! - [`origin`]: the trusted-origin policy shared by both sides
//!
//! # Usage
//!
//! ```bash
//! bili-qr-login --port 3000 --trust-origin https://app.example.com
//! ```
//!
//! # Examples
//!
//! ```rust
//! use bili_qr_login::session::{Credential, sign};
//!
//! let mut credential = Credential::from_raw(["SESSDATA=abc; Path=/", "i-wanna-go-back=-1"]);
//! credential.delete("i-wanna-go-back");
//! assert_eq!(credential.to_string(), "SESSDATA=abc");
//!
//! let signed = sign::Signer::tv().sign_request_at(sign::params([("local_id", "0")]), 1_700_000_000);
//! assert!(signed.contains_key("sign"));
//! ```

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod origin;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, Result};
pub use session::{LoginProvider, ProviderSet, QrPoller, SessionRegistry};
pub use types::{ErrorResponse, GenerateResult, PingResponse, PollOutcome, ValidationResult};
