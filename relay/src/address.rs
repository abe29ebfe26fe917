//! Destination mailbox extraction from the request path.
//!
//! The mailbox is the whole path between one leading and one trailing slash,
//! percent-decoded once: `/user%40example.com/` resolves to `user@example.com`.
//! Validation is purely syntactic; no DNS or MX lookups are made.

use std::fmt;

use lettre::Address;
use percent_encoding::percent_decode_str;
use thiserror::Error;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;

/// Reasons a request path does not yield a mailbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The path is empty; the caller should serve the usage page.
    #[error("no address provided in URL path")]
    NoAddressProvided,

    /// The path decodes to something that is not a mailbox.
    #[error("invalid email address provided in URL path: {0}")]
    InvalidAddress(String),
}

/// A syntactically valid mailbox taken from the request path.
///
/// Case is preserved exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress(String);

impl ResolvedAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the destination mailbox from a raw request target.
///
/// Any query string is ignored. Exactly one leading and one trailing `/` are
/// removed before decoding, so `//a/` decodes to `/a`.
pub fn resolve(raw_target: &str) -> Result<ResolvedAddress, ResolveError> {
    let path = raw_target
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(raw_target);
    let path = path.split_once('#').map(|(path, _)| path).unwrap_or(path);

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let decoded = percent_decode_str(trimmed)
        .decode_utf8()
        .map_err(|_| ResolveError::InvalidAddress(trimmed.to_string()))?;

    if decoded.is_empty() {
        return Err(ResolveError::NoAddressProvided);
    }

    if !is_valid_mailbox(&decoded) {
        return Err(ResolveError::InvalidAddress(decoded.into_owned()));
    }

    Ok(ResolvedAddress(decoded.into_owned()))
}

/// Check `local-part@domain` syntax.
///
/// The grammar is lettre's, so anything accepted here can be handed to the
/// SMTP transport. On top of that the domain must be a dotted hostname:
/// single-label hosts such as `localhost` and address literals are refused.
pub fn is_valid_mailbox(address: &str) -> bool {
    if address.len() > MAX_ADDRESS_LEN {
        return false;
    }

    match address.parse::<Address>() {
        Ok(parsed) => {
            parsed.user().len() <= MAX_LOCAL_PART_LEN && is_dotted_hostname(parsed.domain())
        }
        Err(_) => false,
    }
}

fn is_dotted_hostname(domain: &str) -> bool {
    !domain.starts_with('[') && domain.contains('.')
}
