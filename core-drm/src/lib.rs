//! # DRM Module
//!
//! Gates audiobook playback behind the publisher's license terms.
//!
//! ## Overview
//!
//! Two gates run in sequence:
//!
//! 1. **Rights gate** (synchronous): the manifest's Feedbooks rights window
//!    must contain the current time. The first license-status link is
//!    recorded for the next step.
//! 2. **License gate** (asynchronous): one GET against the license-status
//!    URL, optionally carrying an HS256 token signed with the profile's
//!    secret. Only an explicit, unaccepted `status` fails the book; network
//!    errors and inconclusive responses fail open.
//!
//! The outcome lands in the book's [`DrmStatusCell`], which playback waits
//! on before it is allowed to start.

pub mod error;
pub mod license;
pub mod manifest;
pub mod processor;
pub mod rights;
pub mod secret;
pub mod status;
pub mod token;
pub mod types;

pub use error::{DrmError, Result};
pub use license::LicenseStatusChecker;
pub use manifest::{Manifest, ManifestLink, ManifestMetadata, RightsWindow};
pub use processor::DrmProcessor;
pub use rights::RightsValidator;
pub use secret::{profile_secret_key, SecretResolver};
pub use status::DrmStatusCell;
pub use token::{LicenseTokenSigner, SignedToken};
pub use types::{DrmData, DrmStatus};
