//! Storefront data model module.
//!
//! # Purpose
//! Re-exports the attraction, storefront settings, and domain binding models
//! shared by the API and store layers.
mod attraction;
mod domain;

pub use attraction::{Attraction, StorefrontSettings};
pub use domain::{DomainBinding, DomainStatus, DomainType, SslStatus, VerificationMethod};
