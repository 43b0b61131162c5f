//! Saved authenticated sessions, one cookie set per account.
//!
//! Sets are created by an external credential-capture flow and consumed
//! read-only here; the session controller only updates `last_used` (via the
//! store) after a successful load. Multiple sets per platform enable
//! rotating between accounts to spread load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// One stored cookie. Field aliases accept the common browser-extension
/// export shape (`expirationDate`, `httpOnly`) unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    /// Defaults to `.{platform base domain}` when absent.
    #[serde(default)]
    pub domain: Option<String>,
    /// Defaults to `/` when absent.
    #[serde(default)]
    pub path: Option<String>,
    /// Unix seconds. Defaults to one year from load time when absent.
    #[serde(default, alias = "expirationDate")]
    pub expires_at: Option<f64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
}

/// An ordered collection of cookies representing one logged-in account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieSet {
    /// Store row ID.
    pub id: i64,
    pub platform: Platform,
    /// Human label ("work account", "backup"), shown in CLI listings.
    pub label: String,
    pub records: Vec<CookieRecord>,
    pub last_used: Option<DateTime<Utc>>,
}

impl CookieSet {
    pub fn new(platform: Platform, label: String, records: Vec<CookieRecord>) -> Self {
        Self {
            id: 0, // Set by store
            platform,
            label,
            records,
            last_used: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_record_minimal_json() {
        let record: CookieRecord = serde_json::from_str(r#"{"name":"li_at","value":"abc"}"#)
            .expect("minimal cookie should parse");
        assert_eq!(record.name, "li_at");
        assert!(record.domain.is_none());
        assert!(!record.secure);
    }

    #[test]
    fn test_cookie_record_extension_export_aliases() {
        let json = r#"{
            "name": "sessionid",
            "value": "xyz",
            "domain": ".indeed.com",
            "path": "/",
            "expirationDate": 1787000000.5,
            "secure": true,
            "httpOnly": true
        }"#;
        let record: CookieRecord = serde_json::from_str(json).expect("export shape should parse");
        assert_eq!(record.expires_at, Some(1787000000.5));
        assert!(record.http_only);
        assert!(record.secure);
    }
}
