//! Construction of the options handed to the wrapped minifier.
use regex::Regex;
use serde_json::{Value, json};

use crate::{
    PluginError,
    comments::{CommentFilter, CommentToken},
    merge::merge,
};

/// How comments found by the minifier are treated.
#[derive(Clone, Debug)]
pub enum CommentPolicy {
    /// Keep license comments, each exact text at most once per invocation.
    Deduplicate,
    /// Drop every comment.
    None,
    /// Keep every comment.
    All,
    /// Keep the comments whose body matches.
    Pattern(Regex),
}

impl CommentPolicy {
    /// Read a caller supplied `output.comments` value.
    ///
    /// Unset, falsy and `"some"` values select the de-duplicating filter. Use `"none"` to drop
    /// all comments.
    pub fn from_value(value: Option<&Value>) -> Result<Self, PluginError> {
        let policy = match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => CommentPolicy::Deduplicate,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => CommentPolicy::Deduplicate,
            Some(Value::Bool(true)) => CommentPolicy::All,
            Some(Value::String(text)) => match text.as_str() {
                "" | "some" => CommentPolicy::Deduplicate,
                "none" => CommentPolicy::None,
                "all" => CommentPolicy::All,
                pattern => {
                    let pattern = pattern
                        .strip_prefix('/')
                        .and_then(|p| p.strip_suffix('/'))
                        .unwrap_or(pattern);
                    let regex = Regex::new(pattern).map_err(|err| PluginError::CommentPattern {
                        pattern: pattern.to_owned(),
                        message: err.to_string(),
                    })?;
                    CommentPolicy::Pattern(regex)
                }
            },
            Some(other) => {
                return Err(PluginError::InvalidOption {
                    key: "output.comments",
                    value: other.clone(),
                });
            }
        };

        Ok(policy)
    }

    /// A decision object for exactly one minify invocation.
    pub fn decision(&self) -> CommentDecision<'_> {
        match self {
            CommentPolicy::Deduplicate => CommentDecision::Filter(CommentFilter::new()),
            CommentPolicy::None => CommentDecision::None,
            CommentPolicy::All => CommentDecision::All,
            CommentPolicy::Pattern(regex) => CommentDecision::Pattern(regex),
        }
    }
}

/// Per invocation state of a [`CommentPolicy`].
pub enum CommentDecision<'policy> {
    Filter(CommentFilter),
    None,
    All,
    Pattern(&'policy Regex),
}

impl CommentDecision<'_> {
    pub fn keep(&mut self, token: &mut CommentToken) -> bool {
        match self {
            CommentDecision::Filter(filter) => filter.keep(token),
            CommentDecision::None => false,
            CommentDecision::All => true,
            CommentDecision::Pattern(regex) => regex.is_match(&token.text),
        }
    }
}

/// Options for the wrapped minifier: the merged option tree plus the comment policy that cannot
/// be expressed as plain data.
#[derive(Clone, Debug)]
pub struct MinifierOptions {
    pub config: Value,
    pub comments: CommentPolicy,
}

impl MinifierOptions {
    /// Merge the fixed defaults with the caller's raw options.
    pub fn build(raw: &Value) -> Result<Self, PluginError> {
        let comments = CommentPolicy::from_value(raw.pointer("/output/comments"))?;

        let defaults = json!({
            "module": true,
            "compress": {
                "drop_console": true,
                "drop_debugger": true
            }
        });
        let fixed = json!({
            "output": {
                "indent_level": 2
            }
        });

        let mut config = merge(defaults, [raw, &fixed]);
        if let CommentPolicy::Deduplicate = comments
            && let Some(output) = config.get_mut("output").and_then(Value::as_object_mut)
        {
            output.insert("comments".into(), Value::from("some"));
        }

        Ok(MinifierOptions { config, comments })
    }

    /// Look up a flag, treating `false` and `null` as off and mappings as on.
    pub fn enabled(&self, key: &str) -> Option<bool> {
        match self.config.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::Null => Some(false),
            Value::Object(_) => Some(true),
            _ => None,
        }
    }

    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.config.pointer(pointer)
    }
}

impl Default for MinifierOptions {
    fn default() -> Self {
        // The defaults alone never fail to build.
        MinifierOptions::build(&Value::Null).unwrap_or_else(|_| MinifierOptions {
            config: Value::Null,
            comments: CommentPolicy::Deduplicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let options = MinifierOptions::build(&Value::Null).unwrap();

        assert_eq!(
            options.config,
            json!({
                "module": true,
                "compress": { "drop_console": true, "drop_debugger": true },
                "output": { "indent_level": 2, "comments": "some" }
            })
        );
        assert!(matches!(options.comments, CommentPolicy::Deduplicate));
    }

    #[test]
    fn caller_options_override_defaults() {
        let raw = json!({
            "module": false,
            "compress": { "drop_console": false },
            "output": { "indent_level": 4 }
        });
        let options = MinifierOptions::build(&raw).unwrap();

        assert_eq!(options.enabled("module"), Some(false));
        assert_eq!(options.get("/compress/drop_console"), Some(&json!(false)));
        assert_eq!(options.get("/compress/drop_debugger"), Some(&json!(true)));
        // Indentation is fixed.
        assert_eq!(options.get("/output/indent_level"), Some(&json!(2)));
    }

    #[test]
    fn raw_options_are_not_modified() {
        let raw = json!({ "output": { "comments": "some" } });
        let before = raw.clone();
        MinifierOptions::build(&raw).unwrap();
        assert_eq!(raw, before);
    }

    #[test]
    fn explicit_policies_are_respected() {
        let policy = |value: Value| {
            MinifierOptions::build(&json!({ "output": { "comments": value } }))
                .unwrap()
                .comments
        };

        assert!(matches!(policy(json!("some")), CommentPolicy::Deduplicate));
        assert!(matches!(policy(json!(false)), CommentPolicy::Deduplicate));
        assert!(matches!(policy(json!("none")), CommentPolicy::None));
        assert!(matches!(policy(json!(true)), CommentPolicy::All));
        assert!(matches!(policy(json!("all")), CommentPolicy::All));
        assert!(matches!(policy(json!("/^!/")), CommentPolicy::Pattern(_)));
    }

    #[test]
    fn caller_policy_is_kept_in_config() {
        let options =
            MinifierOptions::build(&json!({ "output": { "comments": "all" } })).unwrap();
        assert_eq!(options.get("/output/comments"), Some(&json!("all")));
    }

    #[test]
    fn invalid_policies_are_configuration_errors() {
        let err = MinifierOptions::build(&json!({ "output": { "comments": "/(/" } })).unwrap_err();
        assert!(matches!(err, PluginError::CommentPattern { .. }));

        let err = MinifierOptions::build(&json!({ "output": { "comments": 3 } })).unwrap_err();
        assert!(matches!(err, PluginError::InvalidOption { .. }));
    }

    #[test]
    fn each_decision_has_its_own_cache() {
        let options = MinifierOptions::default();

        let mut first = options.comments.decision();
        let mut second = options.comments.decision();

        assert!(first.keep(&mut CommentToken::block("! A ")));
        assert!(!first.keep(&mut CommentToken::block("! A ")));
        assert!(second.keep(&mut CommentToken::block("! A ")));
    }

    #[test]
    fn pattern_decision_matches_body() {
        let policy = CommentPolicy::from_value(Some(&json!("^ keep"))).unwrap();
        let mut decision = policy.decision();

        assert!(decision.keep(&mut CommentToken::line(" keep me")));
        assert!(!decision.keep(&mut CommentToken::block(" drop me ")));
    }
}
