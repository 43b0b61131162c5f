//! Translation of stored cookie records into CDP session cookies.

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::Page;
use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::models::{CookieRecord, CookieSet, Platform};

/// Cookies exported without an expiry get one year, matching what the
/// platforms themselves issue for login cookies.
const DEFAULT_EXPIRY_DAYS: i64 = 365;

/// Install a stored cookie set into the browsing context. Individual bad
/// cookies are logged and skipped; only returns the number that stuck.
pub(crate) async fn apply_cookie_set(page: &Page, platform: Platform, set: &CookieSet) -> u32 {
    let mut applied = 0u32;

    for record in &set.records {
        if record.name.is_empty() {
            continue;
        }

        match build_cookie_param(platform, record) {
            Ok(param) => {
                if let Err(e) = page.set_cookie(param).await {
                    warn!("Failed to set cookie {}: {}", record.name, e);
                } else {
                    applied += 1;
                }
            }
            Err(e) => {
                warn!("Failed to build cookie {}: {}", record.name, e);
            }
        }
    }

    debug!(
        applied,
        total = set.records.len(),
        label = %set.label,
        "Loaded cookie set into browser"
    );
    applied
}

fn build_cookie_param(platform: Platform, record: &CookieRecord) -> Result<CookieParam, String> {
    let domain = record
        .domain
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!(".{}", platform.base_domain()));
    let path = record
        .path
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let expires = record
        .expires_at
        .unwrap_or_else(|| (Utc::now() + Duration::days(DEFAULT_EXPIRY_DAYS)).timestamp() as f64);

    CookieParam::builder()
        .name(record.name.clone())
        .value(record.value.clone())
        .domain(domain)
        .path(path)
        .expires(TimeSinceEpoch::new(expires))
        .secure(record.secure)
        .http_only(record.http_only)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: "v".to_string(),
            domain: None,
            path: None,
            expires_at: None,
            secure: false,
            http_only: false,
        }
    }

    #[test]
    fn missing_fields_get_platform_defaults() {
        let param = build_cookie_param(Platform::LinkedIn, &record("li_at")).unwrap();
        assert_eq!(param.domain.as_deref(), Some(".linkedin.com"));
        assert_eq!(param.path.as_deref(), Some("/"));
        assert!(param.expires.is_some());
    }

    #[test]
    fn explicit_fields_are_preserved() {
        let mut rec = record("sess");
        rec.domain = Some("careers.indeed.com".to_string());
        rec.path = Some("/jobs".to_string());
        rec.expires_at = Some(1_900_000_000.0);
        rec.secure = true;

        let param = build_cookie_param(Platform::Indeed, &rec).unwrap();
        assert_eq!(param.domain.as_deref(), Some("careers.indeed.com"));
        assert_eq!(param.path.as_deref(), Some("/jobs"));
        assert_eq!(param.secure, Some(true));
    }
}
