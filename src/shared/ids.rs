use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

pub const MAX_CORRELATION_ID_LEN: usize = 160;
const RANDOM_SUFFIX_BYTES: usize = 8;

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Opaque token linking a dispatched request to its callback artifact.
///
/// Generated ids have the shape `<action>-<millis>-<random hex>`. The
/// charset is restricted so an id can never introduce a path separator or
/// a URL delimiter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("callback id is empty".to_string());
        }
        if raw.len() > MAX_CORRELATION_ID_LEN {
            return Err(format!(
                "callback id is {} bytes; the limit is {MAX_CORRELATION_ID_LEN}",
                raw.len()
            ));
        }
        if let Some(bad) = raw
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
        {
            return Err(format!(
                "callback id contains {bad:?}; only [A-Za-z0-9_-] may appear in a store file name"
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn generate(action: &str) -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; RANDOM_SUFFIX_BYTES];
        getrandom::getrandom(&mut bytes)?;
        let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let prefix: String = action
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
            .take(48)
            .collect();
        let prefix = if prefix.is_empty() { "action" } else { &prefix };
        Ok(Self(format!("{prefix}-{}-{suffix}", monotonic_millis())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Wall-clock milliseconds, bumped so consecutive calls never repeat or go
/// backwards within this process.
fn monotonic_millis() -> i64 {
    let now = super::time::now_millis();
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_ISSUED_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::borrow::Borrow<str> for CorrelationId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .map_err(|err| D::Error::custom(format!("invalid callback id `{raw}`: {err}")))
    }
}
