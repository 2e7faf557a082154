use std::collections::BTreeMap;
use std::fmt;

/// The rejection value carried by a [`Promise`](crate::Promise).
///
/// An error is identified by a `domain` and an integer `code`, and may carry
/// auxiliary key/value data. Auxiliary values are plain strings; structured
/// data has to be rendered to text (JSON, `Display`, ...) before it is
/// attached. Callers who need a "cancelled" sentinel encode it as a
/// domain/code pair of their own.
///
/// # Examples
///
/// ```
/// use promise_then::Error;
/// let err = Error::new("net", 404).with_info("url", "/missing");
/// assert!(err.is("net", 404));
/// assert_eq!(err.info("url"), Some("/missing"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{domain} error {code}{}", InfoDisplay(.info))]
pub struct Error {
    domain: String,
    code: i64,
    info: BTreeMap<String, String>,
}

impl Error {
    pub fn new(domain: impl Into<String>, code: i64) -> Self {
        Self {
            domain: domain.into(),
            code,
            info: BTreeMap::new(),
        }
    }

    /// Attach one auxiliary entry, replacing any earlier value for `key`.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    pub fn user_info(&self) -> &BTreeMap<String, String> {
        &self.info
    }

    pub fn is(&self, domain: &str, code: i64) -> bool {
        self.domain == domain && self.code == code
    }
}

struct InfoDisplay<'a>(&'a BTreeMap<String, String>);

impl fmt::Display for InfoDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str(" {")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Failure to start an execution context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to spawn serial queue thread `{name}`")]
    SpawnThread {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create thread pool")]
    ThreadPool(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration already installed or already in use")]
    AlreadyInstalled,
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_display_without_info() {
        let err = Error::new("PMKErrorDomain", 123);
        assert_eq!(err.to_string(), "PMKErrorDomain error 123");
    }

    #[test]
    fn test_display_with_info_is_sorted() {
        let err = Error::new("io", 2)
            .with_info("path", "/tmp/x")
            .with_info("op", "open");
        assert_eq!(err.to_string(), "io error 2 {op: open, path: /tmp/x}");
    }

    #[test]
    fn test_is_matches_domain_and_code() {
        let err = Error::new("io", 2);
        assert!(err.is("io", 2));
        assert!(!err.is("io", 3));
        assert!(!err.is("net", 2));
        assert_eq!(err.info("missing"), None);
    }
}
