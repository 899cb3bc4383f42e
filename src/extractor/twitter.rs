use super::types::{Credentials, MediaVariant};
use crate::error::FetchError;
use crate::template::{RequestTemplate, TemplateStore};
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, AUTHORIZATION, TE, USER_AGENT,
};
use reqwest::{redirect, Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const MIGRATE_URL: &str = "https://x.com/x/migrate";
const GUEST_TOKEN_URL: &str = "https://api.x.com/1.1/guest/activate.json";
const GRAPHQL_URL: &str =
    "https://x.com/i/api/graphql/0hWvDhmW8YQ-S_ib3azIrw/TweetResultByRestId";

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:84.0) Gecko/20100101 Firefox/84.0";

/// Bound on the 400-expansion loop in [`TwitterExtractor::tweet_details`].
const MAX_EXPANSION_RETRIES: usize = 10;

/// Scraping third-party HTML/script assets is brittle by nature, so every
/// pattern lives here with its contract spelled out. Swapping a pattern
/// (say, when the front-end renames its bundle) must not touch the
/// extraction control flow.
pub struct TokenPatterns {
    /// Matches a post URL path segment; capture 1 is the numeric post id.
    pub post_id: Regex,
    /// Matches a meta-refresh redirect tag; capture 1 is the target URL.
    pub meta_refresh: Regex,
    /// Matches a script-based location replacement; capture 1 is the target URL.
    pub location_replace: Regex,
    /// Matches the hidden migration form field; capture 1 is its value.
    pub form_data: Regex,
    /// Matches the absolute URL of the front-end main script bundle.
    pub main_script: Regex,
    /// Matches the bearer-token literal embedded in the script bundle.
    pub bearer: Regex,
    /// Looser fallback for the bearer token; capture 1 is the token with
    /// the `Bearer ` prefix already stripped.
    pub bearer_fallback: Regex,
    /// Matches `Variable '<name>'` in API validation messages; capture 1 is
    /// the variable name.
    pub needed_variable: Regex,
    /// Matches the missing-feature list in API validation messages;
    /// capture 1 is a comma-separated list of feature names.
    pub needed_features: Regex,
}

impl Default for TokenPatterns {
    fn default() -> Self {
        Self {
            post_id: Regex::new(r"status/(\d+)").unwrap(),
            meta_refresh: Regex::new(r#"http-equiv=["']refresh["'][^>]*url\s*=\s*([^"'>\s]+)"#)
                .unwrap(),
            location_replace: Regex::new(
                r#"(?:document\.location\s*=\s*|location\.replace\()["']([^"']+)["']"#,
            )
            .unwrap(),
            form_data: Regex::new(r#"name=["']data["']\s+value=["']([^"']+)["']"#).unwrap(),
            main_script: Regex::new(
                r"https://abs\.twimg\.com/responsive-web/client-web(?:-legacy)?/main\.[0-9a-zA-Z]+\.js",
            )
            .unwrap(),
            bearer: Regex::new(r#"AAAAAAAAA[^"]+"#).unwrap(),
            bearer_fallback: Regex::new(r"Bearer ([A-Za-z0-9%_=-]+)").unwrap(),
            needed_variable: Regex::new(r"Variable '([^']+)'").unwrap(),
            needed_features: Regex::new(r#"The following features cannot be null: ([^"]+)"#)
                .unwrap(),
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("de,en-US;q=0.7,en;q=0.3"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    headers.insert(TE, HeaderValue::from_static("trailers"));
    headers
}

/// Per-invocation context: the HTTP clients, the scraping patterns, and the
/// loaded request template. Nothing is shared through module state, so two
/// extractors in one process cannot alias each other's template.
pub struct TwitterExtractor {
    client: Client,
    bare_client: Client,
    patterns: TokenPatterns,
    store: TemplateStore,
}

impl TwitterExtractor {
    pub fn new(store: TemplateStore) -> Result<Self, FetchError> {
        Self::with_patterns(store, TokenPatterns::default())
    }

    pub fn with_patterns(
        store: TemplateStore,
        patterns: TokenPatterns,
    ) -> Result<Self, FetchError> {
        // Both clients share one cookie jar: the migration probe must not
        // auto-follow redirects, but the session it establishes is reused
        // by every later request.
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .default_headers(browser_headers())
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(30))
            .build()?;
        let bare_client = Client::builder()
            .default_headers(browser_headers())
            .cookie_provider(jar)
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            bare_client,
            patterns,
            store,
        })
    }

    /// Check if URL is a Twitter/X status URL host.
    pub fn matches(url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        ["twitter.com", "x.com", "mobile.twitter.com", "mobile.x.com"].contains(&host)
    }

    /// Full pipeline for one post: tokens, metadata, variant selection.
    pub async fn extract(&mut self, post_url: &str) -> Result<Vec<String>, FetchError> {
        let credentials = self.get_tokens(post_url).await?;
        let details = self.tweet_details(post_url, &credentials).await?;
        Ok(collect_video_urls(&details))
    }

    /// Recovers the bearer token embedded in the front-end script bundle
    /// and exchanges it for a short-lived guest token.
    pub async fn get_tokens(&self, post_url: &str) -> Result<Credentials, FetchError> {
        let resp = self.client.get(post_url).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::PageFetch {
                url: post_url.to_string(),
                status: status.as_u16(),
            });
        }
        let mut html = resp.text().await?;

        // Mobile and legacy-domain posts serve a migration page instead of
        // the app shell; resolve it before looking for the script bundle.
        if let Some(target) = self.redirect_target(&html) {
            debug!(target = target.as_str(), "post page redirects");
            html = self.follow_migration(&target).await?;
        }

        let mainjs_url = self
            .patterns
            .main_script
            .find(&html)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| FetchError::AssetNotFound(post_url.to_string()))?;

        let resp = self.client.get(&mainjs_url).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::AssetFetch {
                url: mainjs_url,
                status: status.as_u16(),
            });
        }
        let mainjs = resp.text().await?;

        let bearer_token = match self.patterns.bearer.find(&mainjs) {
            Some(m) => m.as_str().to_string(),
            None => self
                .patterns
                .bearer_fallback
                .captures(&mainjs)
                .map(|caps| caps[1].to_string())
                .ok_or(FetchError::TokenNotFound(mainjs_url))?,
        };
        debug!(bearer_token = bearer_token.as_str(), "found bearer token");

        let resp = self
            .client
            .post(GUEST_TOKEN_URL)
            .header(AUTHORIZATION, format!("Bearer {bearer_token}"))
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Auth {
                url: GUEST_TOKEN_URL.to_string(),
                status: status.as_u16(),
            });
        }
        let body: Value = resp.json().await?;
        let guest_token = body
            .get("guest_token")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::GuestTokenNotFound(GUEST_TOKEN_URL.to_string()))?
            .to_string();
        debug!(guest_token = guest_token.as_str(), "activated guest token");

        Ok(Credentials {
            bearer_token,
            guest_token,
        })
    }

    fn redirect_target(&self, html: &str) -> Option<String> {
        self.patterns
            .meta_refresh
            .captures(html)
            .or_else(|| self.patterns.location_replace.captures(html))
            .map(|caps| caps[1].trim().to_string())
    }

    /// Resolves a migration redirect: picks up the `tok` query parameter
    /// and the hidden `data` form field, then either posts them to the
    /// migration endpoint or plainly re-fetches the target.
    async fn follow_migration(&self, target: &str) -> Result<String, FetchError> {
        let tok = Url::parse(target).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "tok")
                .map(|(_, v)| v.into_owned())
        });

        let resp = self.bare_client.get(target).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::RedirectFetch {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }
        let probe = resp.text().await?;
        let data = self
            .patterns
            .form_data
            .captures(&probe)
            .map(|caps| caps[1].to_string());

        if tok.is_none() && data.is_none() {
            let resp = self.client.get(target).send().await?;
            let status = resp.status();
            if status != StatusCode::OK {
                return Err(FetchError::PageFetch {
                    url: target.to_string(),
                    status: status.as_u16(),
                });
            }
            return Ok(resp.text().await?);
        }

        let mut form: Vec<(&str, String)> = Vec::new();
        if let Some(tok) = tok {
            form.push(("tok", tok));
        }
        if let Some(data) = data {
            form.push(("data", data));
        }
        let resp = self.client.post(MIGRATE_URL).form(&form).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Auth {
                url: MIGRATE_URL.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }

    /// Fetches the post's media metadata, growing the request template from
    /// the server's own validation errors when it answers 400. The template
    /// is persisted once a previously-rejected query goes through.
    pub async fn tweet_details(
        &mut self,
        post_url: &str,
        credentials: &Credentials,
    ) -> Result<Value, FetchError> {
        let post_id = parse_post_id(&self.patterns, post_url)?;

        let mut retries = 0;
        let mut expanded = false;
        loop {
            let url = self.details_url(&post_id);
            let resp = self
                .client
                .get(&url)
                .header(
                    AUTHORIZATION,
                    format!("Bearer {}", credentials.bearer_token),
                )
                .header("x-guest-token", &credentials.guest_token)
                .send()
                .await?;
            let status = resp.status();

            if status == StatusCode::OK {
                if expanded {
                    self.store.save()?;
                }
                return Ok(resp.json().await?);
            }
            if status != StatusCode::BAD_REQUEST || retries >= MAX_EXPANSION_RETRIES {
                return Err(FetchError::MetadataFetch {
                    url: post_url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.text().await?;
            let error_json: Value =
                serde_json::from_str(&body).map_err(|_| FetchError::MalformedErrorResponse {
                    url: post_url.to_string(),
                    body,
                })?;
            let errors = error_json
                .get("errors")
                .and_then(Value::as_array)
                .ok_or_else(|| FetchError::UnrecognizedErrorShape {
                    url: post_url.to_string(),
                })?;
            apply_error_hints(&self.patterns, &mut self.store.template, errors);

            expanded = true;
            retries += 1;
            debug!(retries, "retrying metadata query with expanded template");
        }
    }

    fn details_url(&self, post_id: &str) -> String {
        let (variables, features) = self.store.template.query_params(post_id);
        format!(
            "{GRAPHQL_URL}?variables={}&features={}",
            urlencoding::encode(&variables),
            urlencoding::encode(&features)
        )
    }
}

pub(crate) fn parse_post_id(patterns: &TokenPatterns, post_url: &str) -> Result<String, FetchError> {
    let mut ids = patterns.post_id.captures_iter(post_url);
    match (ids.next(), ids.next()) {
        (Some(caps), None) => Ok(caps[1].to_string()),
        _ => Err(FetchError::InvalidUrl(post_url.to_string())),
    }
}

/// Folds the API's validation complaints into the template. Only missing
/// keys are added; existing entries are left alone.
pub(crate) fn apply_error_hints(
    patterns: &TokenPatterns,
    template: &mut RequestTemplate,
    errors: &[Value],
) {
    for error in errors {
        let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
        for caps in patterns.needed_variable.captures_iter(message) {
            if template.require_variable(&caps[1]) {
                debug!(variable = &caps[1], "template expanded");
            }
        }
        if let Some(caps) = patterns.needed_features.captures(message) {
            for feature in caps[1].split(',') {
                let feature = feature.trim();
                if !feature.is_empty() && template.require_feature(feature) {
                    debug!(feature, "template expanded");
                }
            }
        }
    }
}

/// Walks `data.tweetResult.result.legacy.extended_entities.media` and picks
/// one URL per media item that has a usable variant, in source order. An
/// absent path yields an empty list.
pub fn collect_video_urls(details: &Value) -> Vec<String> {
    let Some(media) = details
        .pointer("/data/tweetResult/result/legacy/extended_entities/media")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for item in media {
        let variants: Vec<MediaVariant> = item
            .pointer("/video_info/variants")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(url) = select_variant(&variants) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Highest declared bitrate wins. A zero-bitrate (animated GIF) variant
/// overwrites the current pick unconditionally, and a later higher-bitrate
/// variant overwrites it back; the running maximum is never reset. Matches
/// the historical selection order exactly.
pub(crate) fn select_variant(variants: &[MediaVariant]) -> Option<&str> {
    let mut selected = None;
    let mut max_bitrate = 0;
    for variant in variants {
        match variant.bitrate {
            Some(bitrate) if bitrate > max_bitrate => {
                max_bitrate = bitrate;
                selected = Some(variant.url.as_str());
            }
            Some(0) => selected = Some(variant.url.as_str()),
            _ => {}
        }
    }
    selected
}
