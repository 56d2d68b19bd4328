//! DNS-based proof-of-ownership checks.
//!
//! # Purpose
//! Defines the [`DnsVerifier`] capability consumed by the domain lifecycle
//! manager, plus three implementations:
//! - [`PublicDnsVerifier`]: queries explicitly configured public resolvers
//!   via `hickory-resolver`. Resolvers independent of the local network keep
//!   a spoofed local DNS view from passing verification.
//! - [`AcceptAllVerifier`]: explicit test/development gate that approves
//!   everything. Selected only through configuration and warns at startup.
//! - [`StaticDnsVerifier`]: deterministic fixture for tests, no sockets.
//!
//! # Failure semantics
//! "No such record" answers are a verification outcome (`Ok(false)`), not an
//! error. Transport failures and timeouts surface as [`DnsLookupError`] so
//! callers can distinguish "proof absent" from "could not look".
use crate::model::VerificationMethod;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::{ResolveError, ResolveErrorKind, Resolver, TokioResolver};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Label under which TXT proofs are published: `_haunt-verify.<domain>`.
pub const VERIFY_LABEL: &str = "_haunt-verify";

/// Record name an operator must create for a TXT proof.
pub fn txt_record_name(domain: &str) -> String {
    format!("{VERIFY_LABEL}.{domain}")
}

/// Infrastructure failure during a lookup, distinct from a negative answer.
/// Retryable by calling verification again.
#[derive(Debug, Error)]
pub enum DnsLookupError {
    #[error("dns lookup timed out")]
    Timeout,
    #[error("resolver failure: {0}")]
    Resolver(String),
}

#[async_trait]
pub trait DnsVerifier: Send + Sync {
    /// Whether DNS currently carries the ownership proof for `domain`.
    ///
    /// # Errors
    /// Only for infrastructure failures; an absent record is `Ok(false)`.
    async fn verify(
        &self,
        domain: &str,
        method: VerificationMethod,
        token: &str,
    ) -> Result<bool, DnsLookupError>;
}

/// Verifier backed by public recursive resolvers.
pub struct PublicDnsVerifier {
    resolver: TokioResolver,
    cname_target: String,
    timeout: Duration,
}

impl PublicDnsVerifier {
    /// Build a verifier querying `resolvers` (UDP/TCP port 53) with a
    /// per-lookup time bound.
    pub fn new(resolvers: &[IpAddr], cname_target: &str, timeout: Duration) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(resolvers, 53, true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let mut builder =
            Resolver::builder_with_config(config, TokioConnectionProvider::default());
        builder.options_mut().timeout = timeout;
        builder.options_mut().attempts = 2;
        Self {
            resolver: builder.build(),
            cname_target: normalize_target(cname_target),
            timeout,
        }
    }

    async fn verify_txt(&self, domain: &str, token: &str) -> Result<bool, DnsLookupError> {
        // Trailing dot: query the absolute name so search suffixes never
        // apply.
        let name = format!("{}.", txt_record_name(domain));
        let lookup = tokio::time::timeout(self.timeout, self.resolver.txt_lookup(name)).await;
        match lookup {
            Ok(Ok(records)) => {
                // Long TXT values arrive as multiple character-strings that
                // concatenate back into one record.
                let found = records.iter().any(|txt| {
                    let flattened: String = txt
                        .txt_data()
                        .iter()
                        .map(|chunk| String::from_utf8_lossy(chunk))
                        .collect();
                    flattened == token
                });
                Ok(found)
            }
            Ok(Err(err)) => classify(err),
            Err(_) => Err(DnsLookupError::Timeout),
        }
    }

    async fn verify_cname(&self, domain: &str) -> Result<bool, DnsLookupError> {
        let name = format!("{domain}.");
        let lookup = tokio::time::timeout(
            self.timeout,
            self.resolver.lookup(name, RecordType::CNAME),
        )
        .await;
        match lookup {
            Ok(Ok(records)) => {
                let found = records.iter().any(|rdata| match rdata {
                    RData::CNAME(target) => normalize_target(&target.0.to_ascii()) == self.cname_target,
                    _ => false,
                });
                Ok(found)
            }
            Ok(Err(err)) => classify(err),
            Err(_) => Err(DnsLookupError::Timeout),
        }
    }
}

#[async_trait]
impl DnsVerifier for PublicDnsVerifier {
    async fn verify(
        &self,
        domain: &str,
        method: VerificationMethod,
        token: &str,
    ) -> Result<bool, DnsLookupError> {
        match method {
            VerificationMethod::DnsTxt => self.verify_txt(domain, token).await,
            VerificationMethod::DnsCname => self.verify_cname(domain).await,
        }
    }
}

/// Map a resolver error to either a negative answer or an infrastructure
/// failure. NXDOMAIN and empty answers both count as "proof absent".
fn classify(err: ResolveError) -> Result<bool, DnsLookupError> {
    match err.kind() {
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::NoRecordsFound { .. } => Ok(false),
            ProtoErrorKind::Timeout => Err(DnsLookupError::Timeout),
            _ => Err(DnsLookupError::Resolver(err.to_string())),
        },
        _ => Err(DnsLookupError::Resolver(err.to_string())),
    }
}

fn normalize_target(target: &str) -> String {
    target.trim_end_matches('.').to_ascii_lowercase()
}

/// Verifier that approves every domain. Only reachable through the explicit
/// `accept-all` DNS mode; never a silent default.
pub struct AcceptAllVerifier;

impl AcceptAllVerifier {
    pub fn new() -> Self {
        tracing::warn!(
            "DNS verification is in accept-all mode; every domain verifies unconditionally"
        );
        Self
    }
}

impl Default for AcceptAllVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsVerifier for AcceptAllVerifier {
    async fn verify(
        &self,
        _domain: &str,
        _method: VerificationMethod,
        _token: &str,
    ) -> Result<bool, DnsLookupError> {
        Ok(true)
    }
}

/// Deterministic verifier for tests: fixed TXT/CNAME answers keyed by record
/// name, with an optional simulated outage.
#[derive(Default)]
pub struct StaticDnsVerifier {
    txt: HashMap<String, Vec<String>>,
    cname: HashMap<String, Vec<String>>,
    cname_target: String,
    outage: bool,
}

impl StaticDnsVerifier {
    pub fn new(cname_target: &str) -> Self {
        Self {
            cname_target: normalize_target(cname_target),
            ..Self::default()
        }
    }

    pub fn with_txt(mut self, record_name: &str, value: &str) -> Self {
        self.txt
            .entry(record_name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    pub fn with_cname(mut self, record_name: &str, target: &str) -> Self {
        self.cname
            .entry(record_name.to_string())
            .or_default()
            .push(target.to_string());
        self
    }

    /// All lookups fail with a resolver error until further notice.
    pub fn with_outage(mut self) -> Self {
        self.outage = true;
        self
    }
}

#[async_trait]
impl DnsVerifier for StaticDnsVerifier {
    async fn verify(
        &self,
        domain: &str,
        method: VerificationMethod,
        token: &str,
    ) -> Result<bool, DnsLookupError> {
        if self.outage {
            return Err(DnsLookupError::Resolver("simulated outage".to_string()));
        }
        match method {
            VerificationMethod::DnsTxt => Ok(self
                .txt
                .get(&txt_record_name(domain))
                .is_some_and(|values| values.iter().any(|value| value == token))),
            VerificationMethod::DnsCname => Ok(self.cname.get(domain).is_some_and(|targets| {
                targets
                    .iter()
                    .any(|target| normalize_target(target) == self.cname_target)
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_txt_requires_exact_token() {
        let verifier = StaticDnsVerifier::new("storefronts.haunt.site")
            .with_txt("_haunt-verify.spooky.example", "haunt-verify-abc");
        assert!(
            verifier
                .verify("spooky.example", VerificationMethod::DnsTxt, "haunt-verify-abc")
                .await
                .unwrap()
        );
        assert!(
            !verifier
                .verify("spooky.example", VerificationMethod::DnsTxt, "haunt-verify-xyz")
                .await
                .unwrap()
        );
        // Absent record is a negative answer, not an error.
        assert!(
            !verifier
                .verify("other.example", VerificationMethod::DnsTxt, "haunt-verify-abc")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn static_cname_matches_case_insensitively() {
        let verifier = StaticDnsVerifier::new("storefronts.haunt.site")
            .with_cname("spooky.example", "Storefronts.HAUNT.site.");
        assert!(
            verifier
                .verify("spooky.example", VerificationMethod::DnsCname, "")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn outage_is_an_error_not_a_negative_answer() {
        let verifier = StaticDnsVerifier::new("storefronts.haunt.site").with_outage();
        let err = verifier
            .verify("spooky.example", VerificationMethod::DnsTxt, "token")
            .await
            .expect_err("outage");
        assert!(matches!(err, DnsLookupError::Resolver(_)));
    }

    #[tokio::test]
    async fn accept_all_always_verifies() {
        let verifier = AcceptAllVerifier::new();
        assert!(
            verifier
                .verify("anything.example", VerificationMethod::DnsCname, "")
                .await
                .unwrap()
        );
    }

    #[test]
    fn txt_record_name_prefixes_the_verify_label() {
        assert_eq!(
            txt_record_name("spooky.example"),
            "_haunt-verify.spooky.example"
        );
    }
}
