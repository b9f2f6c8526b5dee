/// URL normalization for duplicate detection
use url::Url;
use url::form_urlencoded;

/// Query parameters that only carry analytics, advertising, marketing or
/// affiliate tracking state.
const TRACKING_PARAMS: &[&str] = &[
    // Click identifiers
    "fbclid", "gclid", "gclsrc", "dclid", "msclkid", "yclid", "twclid", "ttclid",
    "li_fat_id", "wbraid", "gbraid", "igshid", "srsltid",
    // Email campaigns
    "mc_cid", "mc_eid", "_hsenc", "_hsmi", "mkt_tok", "vero_id", "vero_conv",
    "oly_anon_id", "oly_enc_id", "rb_clickid", "s_cid",
    // Analytics
    "_ga", "_gl", "_ke", "ga_source", "ga_medium", "ga_campaign", "ga_term", "ga_content",
    // Generic referral / affiliate
    "ref", "ref_src", "ref_url", "referrer", "source", "campaign_id", "affiliate_id",
    "aff_id", "partner_id", "click_id", "clickid",
];

/// Any parameter starting with one of these is tracking state (`utm_source`, `utm_id`, ...).
const TRACKING_PREFIXES: &[&str] = &["utm_"];

/// Parameters whose name contains this (case-insensitive) are dropped too.
const SESSION_MARKER: &str = "session";

/// Hosts that keep in-page navigation state in the fragment.
/// Subdomains match as well.
const FRAGMENT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "stackoverflow.com",
    "stackexchange.com",
    "superuser.com",
    "serverfault.com",
    "askubuntu.com",
    "reddit.com",
    "news.ycombinator.com",
    "medium.com",
    "dev.to",
    "substack.com",
    "docs.google.com",
    "notion.so",
];

/// Browser-internal, system and extension pages. Never duplicates, never closed.
const INTERNAL_SCHEMES: &[&str] = &[
    "chrome:",
    "chrome-extension:",
    "chrome-search:",
    "chrome-untrusted:",
    "devtools:",
    "edge:",
    "extension:",
    "brave:",
    "opera:",
    "vivaldi:",
    "about:",
    "moz-extension:",
    "view-source:",
];

/// A URL string the parser rejected. It is compared literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedUrl(String);

impl UnparsedUrl {
    pub fn into_literal(self) -> String {
        self.0
    }
}

/// Rule set driving [`Normalizer`]. `Default` gives the built-in lists.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerRules {
    pub tracking_params: Vec<String>,
    pub tracking_prefixes: Vec<String>,
    pub session_marker: String,
    pub fragment_hosts: Vec<String>,
    pub internal_schemes: Vec<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        fn owned(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        NormalizerRules {
            tracking_params: owned(TRACKING_PARAMS),
            tracking_prefixes: owned(TRACKING_PREFIXES),
            session_marker: SESSION_MARKER.to_string(),
            fragment_hosts: owned(FRAGMENT_HOSTS),
            internal_schemes: owned(INTERNAL_SCHEMES),
        }
    }
}

/// Turns raw tab URLs into comparison keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalizer {
    rules: NormalizerRules,
}

impl Normalizer {
    pub fn new(rules: NormalizerRules) -> Normalizer {
        Normalizer { rules }
    }

    pub fn rules(&self) -> &NormalizerRules {
        &self.rules
    }

    /// Canonicalize `raw` into a comparison key.
    ///
    /// Algorithm:
    /// 1. Parse the URL; on failure hand the input back as [`UnparsedUrl`]
    /// 2. Drop tracking parameters and anything session-like from the query
    /// 3. Strip a single trailing slash unless the path is just "/"
    /// 4. Rebuild as `scheme://host[:port]` + path + remaining query
    /// 5. Keep the fragment only for hosts on the fragment allow-list
    ///
    /// Examples:
    /// - https://a.com/page/?utm_source=x&ref=y → https://a.com/page
    /// - https://github.com/x/y#section → https://github.com/x/y#section
    /// - https://shop.com/x#section → https://shop.com/x
    pub fn normalize(&self, raw: &str) -> Result<String, UnparsedUrl> {
        let parsed = Url::parse(raw).map_err(|_| UnparsedUrl(raw.to_string()))?;

        // Opaque URLs (mailto:, data:, ...) have no authority to rebuild
        if parsed.cannot_be_a_base() {
            let mut key = format!("{}:{}", parsed.scheme(), parsed.path());
            self.push_query(&parsed, &mut key);
            return Ok(key);
        }

        let mut key = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or(""));
        if let Some(port) = parsed.port() {
            key.push_str(&format!(":{}", port));
        }

        let path = parsed.path();
        match path.strip_suffix('/') {
            Some(trimmed) if path.len() > 1 => key.push_str(trimmed),
            _ => key.push_str(path),
        }

        self.push_query(&parsed, &mut key);

        if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
            if self.keeps_fragment(parsed.host_str().unwrap_or("")) {
                key.push('#');
                key.push_str(fragment);
            }
        }

        Ok(key)
    }

    /// Comparison key for `raw`, falling back to the literal input.
    pub fn comparison_key(&self, raw: &str) -> String {
        self.normalize(raw).unwrap_or_else(UnparsedUrl::into_literal)
    }

    /// Whether `raw` points at a browser-internal, system or extension page.
    pub fn is_internal(&self, raw: &str) -> bool {
        let lowered = raw.trim_start().to_lowercase();
        self.rules
            .internal_schemes
            .iter()
            .any(|scheme| lowered.starts_with(scheme.as_str()))
    }

    /// Append `?query` with tracking and session parameters removed, if anything is left
    fn push_query(&self, parsed: &Url, key: &mut String) {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(name, _)| !self.is_tracking_param(name))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        if !kept.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept)
                .finish();
            key.push('?');
            key.push_str(&query);
        }
    }

    fn is_tracking_param(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.rules.tracking_params.iter().any(|p| *p == lowered)
            || self
                .rules
                .tracking_prefixes
                .iter()
                .any(|prefix| lowered.starts_with(prefix.as_str()))
            || lowered.contains(&self.rules.session_marker)
    }

    fn keeps_fragment(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.rules.fragment_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Normalize with the built-in rules.
pub fn normalize(raw: &str) -> Result<String, UnparsedUrl> {
    Normalizer::default().normalize(raw)
}

/// Comparison key with the built-in rules.
pub fn comparison_key(raw: &str) -> String {
    Normalizer::default().comparison_key(raw)
}

/// Internal-page check with the built-in rules.
pub fn is_internal_url(raw: &str) -> bool {
    Normalizer::default().is_internal(raw)
}
