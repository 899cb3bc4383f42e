use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::FetchError;

/// Query template for the `TweetResultByRestId` endpoint.
///
/// The API grows new required fields over time. Instead of pinning a client
/// version, the template accumulates whatever field names the server's own
/// validation errors cite, and remembers them across runs. Keys are only
/// ever inserted: nothing overwrites or removes an existing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTemplate {
    features: BTreeMap<String, bool>,
    variables: BTreeMap<String, Value>,
}

impl RequestTemplate {
    /// Inserts `name = true` into the feature map unless already present.
    /// Returns whether the template grew.
    pub fn require_feature(&mut self, name: &str) -> bool {
        if self.features.contains_key(name) {
            return false;
        }
        self.features.insert(name.to_string(), true);
        true
    }

    /// Inserts `name = true` into the variable map unless already present.
    /// Returns whether the template grew.
    pub fn require_variable(&mut self, name: &str) -> bool {
        if self.variables.contains_key(name) {
            return false;
        }
        self.variables.insert(name.to_string(), json!(true));
        true
    }

    pub fn feature(&self, name: &str) -> Option<bool> {
        self.features.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// JSON-serialized `(variables, features)` pair for the query string,
    /// with the post id injected as `tweetId`. The stored maps are not
    /// modified.
    pub fn query_params(&self, post_id: &str) -> (String, String) {
        let mut variables = self.variables.clone();
        variables.insert("tweetId".to_string(), json!(post_id));
        (json!(variables).to_string(), json!(self.features).to_string())
    }
}

impl Default for RequestTemplate {
    fn default() -> Self {
        let variables = [
            ("withCommunity", json!(false)),
            ("includePromotedContent", json!(false)),
            ("withVoice", json!(false)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let features = [
            ("creator_subscriptions_tweet_preview_api_enabled", true),
            ("tweetypie_unmention_optimization_enabled", true),
            ("responsive_web_edit_tweet_api_enabled", true),
            ("graphql_is_translatable_rweb_tweet_is_translatable_enabled", true),
            ("view_counts_everywhere_api_enabled", true),
            ("longform_notetweets_consumption_enabled", true),
            ("responsive_web_twitter_article_tweet_consumption_enabled", false),
            ("tweet_awards_web_tipping_enabled", false),
            ("freedom_of_speech_not_reach_fetch_enabled", true),
            ("standardized_nudges_misinfo", true),
            (
                "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled",
                true,
            ),
            ("longform_notetweets_rich_text_read_enabled", true),
            ("longform_notetweets_inline_media_enabled", true),
            ("responsive_web_graphql_exclude_directive_enabled", true),
            ("verified_phone_label_enabled", false),
            ("responsive_web_media_download_video_enabled", false),
            (
                "responsive_web_graphql_skip_user_profile_image_extensions_enabled",
                false,
            ),
            ("responsive_web_graphql_timeline_navigation_enabled", true),
            ("responsive_web_enhance_cards_enabled", false),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self { features, variables }
    }
}

fn template_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tvget")
}

fn template_path() -> PathBuf {
    template_dir().join("request_template.json")
}

/// Durable storage for the request template. Loaded once at startup,
/// rewritten in place after a metadata query that succeeded following an
/// expansion.
pub struct TemplateStore {
    path: PathBuf,
    pub template: RequestTemplate,
}

impl TemplateStore {
    pub fn load() -> Result<Self, FetchError> {
        Self::load_from(template_path())
    }

    /// Reads the template at `path`, seeding defaults when no file exists.
    pub fn load_from(path: PathBuf) -> Result<Self, FetchError> {
        let template = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            RequestTemplate::default()
        };
        Ok(Self { path, template })
    }

    /// Rewrites the template file in place, pretty-printed.
    pub fn save(&self) -> Result<(), FetchError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.template)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_has_seed_keys() {
        let template = RequestTemplate::default();
        assert_eq!(template.variable("withCommunity"), Some(&json!(false)));
        assert_eq!(template.feature("standardized_nudges_misinfo"), Some(true));
        assert_eq!(
            template.feature("responsive_web_enhance_cards_enabled"),
            Some(false)
        );
    }

    #[test]
    fn test_require_is_append_only() {
        let mut template = RequestTemplate::default();

        assert!(template.require_feature("brand_new_flag"));
        assert_eq!(template.feature("brand_new_flag"), Some(true));
        assert!(!template.require_feature("brand_new_flag"));

        // A pre-seeded `false` flag must not be flipped by a re-request.
        assert!(!template.require_feature("verified_phone_label_enabled"));
        assert_eq!(
            template.feature("verified_phone_label_enabled"),
            Some(false)
        );

        assert!(template.require_variable("withBirdwatchNotes"));
        assert!(!template.require_variable("withBirdwatchNotes"));
        assert_eq!(template.variable("withBirdwatchNotes"), Some(&json!(true)));
    }

    #[test]
    fn test_query_params_injects_post_id() {
        let template = RequestTemplate::default();
        let (variables, features) = template.query_params("1710868951109124552");

        let variables: Value = serde_json::from_str(&variables).unwrap();
        assert_eq!(variables["tweetId"], json!("1710868951109124552"));
        assert_eq!(variables["withVoice"], json!(false));

        let features: Value = serde_json::from_str(&features).unwrap();
        assert_eq!(features["responsive_web_edit_tweet_api_enabled"], json!(true));

        // The template itself is untouched.
        assert_eq!(template.variable("tweetId"), None);
    }

    #[test]
    fn test_store_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::load_from(dir.path().join("request_template.json")).unwrap();
        assert_eq!(store.template.variable("withCommunity"), Some(&json!(false)));
    }

    #[test]
    fn test_store_round_trips_expansions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request_template.json");

        let mut store = TemplateStore::load_from(path.clone()).unwrap();
        store.template.require_variable("fieldToggles");
        store.template.require_feature("articles_preview_enabled");
        store.save().unwrap();

        let reloaded = TemplateStore::load_from(path).unwrap();
        assert_eq!(reloaded.template.variable("fieldToggles"), Some(&json!(true)));
        assert_eq!(reloaded.template.feature("articles_preview_enabled"), Some(true));
        // Seed keys survive alongside the expansions.
        assert_eq!(reloaded.template.feature("view_counts_everywhere_api_enabled"), Some(true));
    }

    #[test]
    fn test_save_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request_template.json");

        let store = TemplateStore::load_from(path.clone()).unwrap();
        store.save().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n  \"features\""));
    }
}
