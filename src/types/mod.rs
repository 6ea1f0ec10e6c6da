//! Type definitions for the QR login service
//!
//! This module contains the request, response and provider wire types.

pub mod internal;
pub mod request;
pub mod response;
pub mod serde_helpers;

pub use internal::ApiEnvelope;
pub use request::{ClientKind, ConvertCookieRequest, CookieEntry, CookieInput, QrQuery};
pub use response::{
    ConvertCookieResponse, ConvertedCookie, CookieStoreEntry, ErrorResponse, GenerateResult, PingResponse, PollOutcome, PollStatus,
    ValidationOutcome, ValidationResult,
};
