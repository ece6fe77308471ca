//! Identity guard rails: the single-tenant email domain policy.

mod domain_policy;

pub use domain_policy::{DEFAULT_ALLOWED_DOMAIN, DomainPolicy};
