//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 3166-1 alpha-2 country code as reported by the geodata resource.
///
/// The code is kept exactly as the resource returns it. No case folding
/// or trimming is applied, so comparisons are byte-exact.
///
/// # Examples
/// ```
/// use ipchecker::domain::value_objects::CountryCode;
///
/// let code = CountryCode::new("US");
/// assert!(code.matches("US"));
/// assert!(!code.matches("us"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact, case-sensitive comparison against an allow-list entry.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CountryCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_as_str() {
        let code = CountryCode::new("BR");
        assert_eq!(code.as_str(), "BR");
        assert_eq!(code.to_string(), "BR");
    }

    #[test]
    fn test_matches_is_case_sensitive() {
        let code = CountryCode::new("US");
        assert!(code.matches("US"));
        assert!(!code.matches("us"));
        assert!(!code.matches("Us"));
    }

    #[test]
    fn test_matches_rejects_partial() {
        let code = CountryCode::new("US");
        assert!(!code.matches("U"));
        assert!(!code.matches("USA"));
        assert!(!code.matches(" US"));
        assert!(!code.matches(""));
    }

    #[test]
    fn test_serde_transparent() {
        let code = CountryCode::new("CA");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"CA\"");
        let parsed: CountryCode = serde_json::from_str("\"CA\"").unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn test_into_inner() {
        assert_eq!(CountryCode::from("DE").into_inner(), "DE");
    }
}
