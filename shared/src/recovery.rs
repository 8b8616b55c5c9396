//! Recovery-link detection.
//!
//! A password-reset email lands the user on the app with a fragment such as
//! `#access_token=...&refresh_token=...&type=recovery`. The fragment is read
//! once at startup; the shell's identity client redeems the tokens itself.

use url::{form_urlencoded, Url};

const TYPE_KEY: &str = "type";
const RECOVERY_TYPE: &str = "recovery";

/// True iff the URL's fragment, parsed as a query string, carries
/// `type=recovery`. A missing or unparsable URL is simply not a recovery link.
#[must_use]
pub fn detect(page_url: &str) -> bool {
    fragment_of(page_url).is_some_and(|fragment| is_recovery_fragment(&fragment))
}

/// Same check for a bare fragment, with or without the leading `#`.
#[must_use]
pub fn is_recovery_fragment(fragment: &str) -> bool {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    // Only the first `type` pair counts.
    form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == TYPE_KEY)
        .is_some_and(|(_, value)| value == RECOVERY_TYPE)
}

/// The path component alone, used to rewrite the address bar once the
/// recovery fragment has been consumed.
#[must_use]
pub fn path_only(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => {
            let end = page_url.find(['?', '#']).unwrap_or(page_url.len());
            let path = &page_url[..end];
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
    }
}

fn fragment_of(page_url: &str) -> Option<String> {
    match Url::parse(page_url) {
        Ok(url) => url.fragment().map(str::to_string),
        // Relative references still carry a usable fragment.
        Err(_) => page_url
            .split_once('#')
            .map(|(_, fragment)| fragment.to_string()),
    }
}
