//! Forbidden word rules and the tag filter built on them.
//!
//! Rules come from a free-form configuration value: one rule per comma
//! (ASCII or full-width) or per line. A trailing `!` makes a rule strict,
//! meaning it only matches whole words instead of any substring.

use std::sync::LazyLock;

use regex::Regex;

/// Separator between tags in a prompt.
pub const TAG_SEPARATOR: &str = ", ";

#[allow(clippy::expect_used)]
static RULE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:,\s*|\s*\n\s*)").expect("rule separator pattern"));

#[allow(clippy::expect_used)]
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("non-alphanumeric pattern"));

/// Lowercases `text`, collapses every run of non-alphanumeric characters into
/// a single space and trims the result.
pub fn normalize_token(text: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// A single compiled rule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForbiddenRule {
    /// Normalized text to look for.
    pub pattern: String,
    /// Whole-word matching when set, substring matching otherwise.
    pub strict: bool,
}

impl ForbiddenRule {
    /// Compiles one raw rule, `None` when nothing matchable is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let (text, strict) = match raw.strip_suffix('!') {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };
        let pattern = normalize_token(text);
        if pattern.is_empty() {
            return None;
        }
        Some(Self { pattern, strict })
    }

    /// Tests an already normalized tag against this rule.
    ///
    /// Strict patterns are compared against single words, so a strict rule
    /// spanning several words matches nothing.
    pub fn matches(&self, normalized: &str) -> bool {
        if self.strict {
            normalized.split(' ').any(|word| word == self.pattern)
        } else {
            normalized.contains(&self.pattern)
        }
    }
}

/// Immutable set of rules compiled from one configuration value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ForbiddenRuleSet {
    rules: Vec<ForbiddenRule>,
}

impl ForbiddenRuleSet {
    /// Compiles the raw configuration text into a rule set.
    pub fn compile(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase().replace('，', ",");
        let rules = RULE_SEPARATOR
            .split(&lowered)
            .filter(|entry| !entry.is_empty())
            .filter_map(ForbiddenRule::parse)
            .collect();
        Self { rules }
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is configured, making [`Self::filter`] a no-op.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The compiled rules, in configuration order.
    pub fn rules(&self) -> &[ForbiddenRule] {
        &self.rules
    }

    /// True when any rule rejects `tag`.
    pub fn is_forbidden(&self, tag: &str) -> bool {
        let normalized = normalize_token(tag);
        self.rules.iter().any(|rule| rule.matches(&normalized))
    }

    /// Drops every forbidden tag from a `", "` separated prompt. Surviving
    /// tags are returned untouched.
    pub fn filter(&self, tags: &str) -> String {
        tags.split(TAG_SEPARATOR)
            .filter(|tag| !self.is_forbidden(tag))
            .collect::<Vec<_>>()
            .join(TAG_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize_token("  {{Big_Cat}}!! "), "big cat");
        assert_eq!(normalize_token("a--b..c"), "a b c");
        assert_eq!(normalize_token("***"), "");
    }

    #[test]
    fn compile_splits_on_commas_and_newlines() {
        let set = ForbiddenRuleSet::compile("Cat!, dog\n  bird ，fish,,\n\nsnake");
        let patterns: Vec<_> = set
            .rules()
            .iter()
            .map(|rule| (rule.pattern.as_str(), rule.strict))
            .collect();
        assert_eq!(
            patterns,
            vec![
                ("cat", true),
                ("dog", false),
                ("bird", false),
                ("fish", false),
                ("snake", false),
            ]
        );
    }

    #[test]
    fn compile_normalizes_rule_text() {
        let set = ForbiddenRuleSet::compile("Red_Eyes!");
        assert_eq!(
            set.rules(),
            &[ForbiddenRule {
                pattern: "red eyes".to_string(),
                strict: true,
            }]
        );
    }

    #[test]
    fn empty_configuration_compiles_to_nothing() {
        assert!(ForbiddenRuleSet::compile("").is_empty());
        assert!(ForbiddenRuleSet::compile("  \n , ").is_empty());
        assert!(ForbiddenRuleSet::compile("???").is_empty());
    }

    #[test]
    fn strict_rule_matches_whole_words_only() {
        let set = ForbiddenRuleSet::compile("cat!");
        assert!(set.is_forbidden("cat"));
        assert!(set.is_forbidden("big cat toy"));
        assert!(set.is_forbidden("{cat}"));
        assert!(!set.is_forbidden("cats"));
        assert!(!set.is_forbidden("concatenate"));
    }

    #[test]
    fn strict_rule_with_several_words_never_matches() {
        let set = ForbiddenRuleSet::compile("red eyes!");
        assert_eq!(set.rules()[0].pattern, "red eyes");
        assert!(!set.is_forbidden("red eyes"));
        assert!(ForbiddenRuleSet::compile("red eyes").is_forbidden("red eyes"));
    }

    #[test]
    fn loose_rule_matches_substrings() {
        let set = ForbiddenRuleSet::compile("cat");
        assert!(set.is_forbidden("concatenate"));
        assert!(set.is_forbidden("cats"));
        assert!(!set.is_forbidden("dog"));
    }

    #[test]
    fn filter_drops_rejected_tags() {
        let set = ForbiddenRuleSet::compile("cat!, gore");
        assert_eq!(
            set.filter("1girl, cat, cats, Gorey scene, blue sky"),
            "1girl, cats, blue sky"
        );
    }

    #[test]
    fn filter_without_rules_is_identity() {
        let set = ForbiddenRuleSet::default();
        assert_eq!(set.filter("a, b,c, {d}"), "a, b,c, {d}");
        assert_eq!(set.filter(""), "");
    }

    #[test]
    fn filter_can_empty_the_prompt() {
        let set = ForbiddenRuleSet::compile("cat");
        assert_eq!(set.filter("cat, black cat"), "");
    }
}
