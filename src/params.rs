//! Assembly of the query parameters sent to the generation service.

use clap::ValueEnum;

use crate::constants::{
    DEFAULT_IMG2IMG_STRENGTH, DEFAULT_SCALE, DEFAULT_TXT2IMG_STRENGTH,
};
use crate::error::DrawError;
use crate::forbidden::{ForbiddenRuleSet, TAG_SEPARATOR};
use crate::resize::{Size, normalize};

/// Generation model. `safe` is SFW only, `nai` allows NSFW output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Model {
    /// SFW model.
    Safe,
    /// Full NovelAI model.
    #[default]
    Nai,
}

impl Model {
    /// Value of the `r18` query parameter.
    pub fn r18(&self) -> &'static str {
        match self {
            Self::Safe => "0",
            Self::Nai => "1",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Nai => write!(f, "nai"),
        }
    }
}

/// Output orientation hint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Orient {
    /// Taller than wide.
    #[default]
    Portrait,
    /// Wider than tall.
    Landscape,
    /// Same width and height.
    Square,
}

impl Orient {
    /// Value of the `shape` query parameter.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Portrait => "Portrait",
            Self::Landscape => "Landscape",
            Self::Square => "Square",
        }
    }
}

impl std::fmt::Display for Orient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Portrait => write!(f, "portrait"),
            Self::Landscape => write!(f, "landscape"),
            Self::Square => write!(f, "square"),
        }
    }
}

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

/// Turns the user's raw tag text into the final prompt.
///
/// The input is lowercased and full-width commas are converted before the
/// forbidden-word filter runs; `base_prompt` is appended afterwards and is
/// never filtered.
pub fn compose_tags(
    raw: &str,
    has_image: bool,
    base_prompt: &str,
    rules: &ForbiddenRuleSet,
) -> Result<String, DrawError> {
    if contains_cjk(raw) {
        return Err(DrawError::CjkTags);
    }

    let input = raw.trim().to_lowercase().replace('，', ",");
    let filtered = rules.filter(&input);
    let filtered = filtered.trim();
    if has_image && filtered.is_empty() && base_prompt.is_empty() {
        return Err(DrawError::MissingTags);
    }

    let prompts: Vec<&str> = [filtered, base_prompt]
        .into_iter()
        .filter(|prompt| !prompt.is_empty())
        .collect();
    Ok(prompts.join(TAG_SEPARATOR))
}

/// Everything sent to the generation endpoint for one command invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParameters {
    /// Final prompt.
    pub tags: String,
    /// API token.
    pub token: String,
    /// Model selector, sent as `r18`.
    pub model: Model,
    /// Orientation, sent as `shape`.
    pub orient: Orient,
    /// Seed requested by the user.
    pub seed: Option<String>,
    /// Guidance scale.
    pub scale: f64,
    /// How far image-to-image may drift from the source.
    pub strength: f64,
    /// Normalized source size, present only for image-to-image.
    pub size: Option<Size>,
}

impl GenerationParameters {
    /// Starts a builder with the required fields.
    pub fn builder(
        tags: impl Into<String>,
        token: impl Into<String>,
        model: Model,
        orient: Orient,
    ) -> ParametersBuilder {
        ParametersBuilder {
            tags: tags.into(),
            token: token.into(),
            model,
            orient,
            seed: None,
            scale: None,
            strength: None,
            source: None,
        }
    }

    /// True when a source image was supplied.
    pub fn is_img2img(&self) -> bool {
        self.size.is_some()
    }

    /// Query string pairs, in the order the service documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("tags", self.tags.clone()),
            ("token", self.token.clone()),
            ("r18", self.model.r18().to_string()),
            ("shape", self.orient.shape().to_string()),
        ];
        if let Some(seed) = &self.seed {
            pairs.push(("seed", seed.clone()));
        }
        pairs.push(("scale", self.scale.to_string()));
        pairs.push(("strength", self.strength.to_string()));
        pairs
    }
}

/// Builder for [`GenerationParameters`]; optional fields fall back to the
/// documented defaults in [`ParametersBuilder::build`].
#[derive(Clone, Debug)]
pub struct ParametersBuilder {
    tags: String,
    token: String,
    model: Model,
    orient: Orient,
    seed: Option<String>,
    scale: Option<f64>,
    strength: Option<f64>,
    source: Option<Size>,
}

impl ParametersBuilder {
    /// Sets the seed; blank seeds are ignored.
    pub fn seed(mut self, seed: Option<String>) -> Self {
        self.seed = seed.filter(|seed| !seed.trim().is_empty());
        self
    }

    /// Overrides the guidance scale.
    pub fn scale(mut self, scale: Option<f64>) -> Self {
        self.scale = scale;
        self
    }

    /// Overrides the strength, clamped to `0..=1`.
    pub fn strength(mut self, strength: Option<f64>) -> Self {
        self.strength = strength;
        self
    }

    /// Marks the request as image-to-image with a source of the given size.
    pub fn source_image(mut self, size: Size) -> Self {
        self.source = Some(size);
        self
    }

    /// Resolves defaults and normalizes the source size.
    pub fn build(self) -> GenerationParameters {
        let default_strength = if self.source.is_some() {
            DEFAULT_IMG2IMG_STRENGTH
        } else {
            DEFAULT_TXT2IMG_STRENGTH
        };
        GenerationParameters {
            tags: self.tags,
            token: self.token,
            model: self.model,
            orient: self.orient,
            seed: self.seed,
            scale: self.scale.unwrap_or(DEFAULT_SCALE),
            strength: self.strength.unwrap_or(default_strength).clamp(0.0, 1.0),
            size: self.source.map(normalize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_rules() -> ForbiddenRuleSet {
        ForbiddenRuleSet::default()
    }

    #[test]
    fn model_maps_to_r18_flag() {
        assert_eq!(Model::Safe.r18(), "0");
        assert_eq!(Model::Nai.r18(), "1");
    }

    #[test]
    fn selectors_parse_lowercase_values_only() {
        assert_eq!(Model::from_str("nai", false), Ok(Model::Nai));
        assert_eq!(Model::from_str("safe", false), Ok(Model::Safe));
        assert!(Model::from_str("furry", false).is_err());
        assert_eq!(Orient::from_str("landscape", false), Ok(Orient::Landscape));
        assert!(Orient::from_str("diagonal", false).is_err());
    }

    #[test]
    fn orient_is_capitalized() {
        assert_eq!(Orient::Portrait.shape(), "Portrait");
        assert_eq!(Orient::Landscape.shape(), "Landscape");
        assert_eq!(Orient::Square.shape(), "Square");
    }

    #[test]
    fn cjk_input_is_rejected() {
        let err = compose_tags("画一只猫", false, "masterpiece", &no_rules()).unwrap_err();
        assert!(matches!(err, DrawError::CjkTags));
        let err = compose_tags("1girl, 猫", false, "", &no_rules()).unwrap_err();
        assert!(matches!(err, DrawError::CjkTags));
    }

    #[test]
    fn base_prompt_is_appended_after_filtering() {
        let rules = ForbiddenRuleSet::compile("master");
        let tags = compose_tags("1girls, Miku", false, "masterpiece", &rules).unwrap();
        assert_eq!(tags, "1girls, miku, masterpiece");
    }

    #[test]
    fn full_width_commas_become_separators() {
        let rules = ForbiddenRuleSet::compile("miku!");
        let tags = compose_tags("1girl， miku", false, "", &rules).unwrap();
        assert_eq!(tags, "1girl");
    }

    #[test]
    fn image_without_any_tags_is_rejected() {
        let rules = ForbiddenRuleSet::compile("cat");
        let err = compose_tags("cat", true, "", &rules).unwrap_err();
        assert!(matches!(err, DrawError::MissingTags));
        let err = compose_tags("   ", true, "", &rules).unwrap_err();
        assert!(matches!(err, DrawError::MissingTags));
    }

    #[test]
    fn image_with_only_base_prompt_is_accepted() {
        let tags = compose_tags("", true, "masterpiece", &no_rules()).unwrap();
        assert_eq!(tags, "masterpiece");
    }

    #[test]
    fn text_request_defaults() {
        let tags = compose_tags("1girls, miku", false, "masterpiece", &no_rules()).unwrap();
        let params = GenerationParameters::builder(tags, "secret", Model::Nai, Orient::Portrait)
            .seed(None)
            .scale(None)
            .strength(None)
            .build();

        assert_eq!(params.tags, "1girls, miku, masterpiece");
        assert_eq!(params.model.r18(), "1");
        assert_eq!(params.orient.shape(), "Portrait");
        assert_eq!(params.scale, 11.0);
        assert_eq!(params.strength, 0.5);
        assert_eq!(params.seed, None);
        assert!(!params.is_img2img());
    }

    #[test]
    fn image_request_defaults_and_size() {
        let params = GenerationParameters::builder("a", "", Model::Safe, Orient::Square)
            .source_image(Size::new(1920, 1080))
            .build();
        assert_eq!(params.strength, 0.7);
        assert_eq!(params.scale, 11.0);
        assert_eq!(params.size, Some(Size::new(896, 512)));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let params = GenerationParameters::builder("a", "", Model::Nai, Orient::Portrait)
            .seed(Some("42".to_string()))
            .scale(Some(7.5))
            .strength(Some(3.0))
            .build();
        assert_eq!(params.seed.as_deref(), Some("42"));
        assert_eq!(params.scale, 7.5);
        assert_eq!(params.strength, 1.0);
    }

    #[test]
    fn blank_seed_is_dropped() {
        let params = GenerationParameters::builder("a", "", Model::Nai, Orient::Portrait)
            .seed(Some(String::new()))
            .build();
        assert_eq!(params.seed, None);
    }

    #[test]
    fn query_pairs_include_optional_fields_only_when_set() {
        let params = GenerationParameters::builder("a, b", "tok", Model::Nai, Orient::Landscape)
            .build();
        let keys: Vec<_> = params.query_pairs().into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["tags", "token", "r18", "shape", "scale", "strength"]);

        let params = GenerationParameters::builder("a", "tok", Model::Nai, Orient::Landscape)
            .seed(Some("7".to_string()))
            .source_image(Size::new(512, 512))
            .build();
        let pairs = params.query_pairs();
        assert!(pairs.contains(&("seed", "7".to_string())));
        assert!(pairs.contains(&("scale", "11".to_string())));
        assert!(pairs.contains(&("strength", "0.7".to_string())));
        let keys: Vec<_> = pairs.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["tags", "token", "r18", "shape", "seed", "scale", "strength"]);
        assert_eq!(params.size, Some(Size::new(512, 512)));
    }
}
