//! Technology classification.
//!
//! Maps an implementation language to the technology family it runs on.
//! Families are checked in order and the first one listing the language
//! wins; anything unmatched is [`Technology::Other`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Technology family a project is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Technology {
    Jvm,
    DotNet,
    Other,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Technology::Jvm => write!(f, "JVM"),
            Technology::DotNet => write!(f, ".NET"),
            Technology::Other => write!(f, "Other"),
        }
    }
}

/// Default JVM languages. "Closure" is spelled the way benchmark
/// configurations spell it.
pub const JVM_LANGUAGES: [&str; 5] = ["Java", "Kotlin", "Scala", "Closure", "Groovy"];

/// Default .NET languages.
pub const DOT_NET_LANGUAGES: [&str; 1] = ["C#"];

/// A technology together with the exact language names it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnologyFamily {
    pub technology: Technology,
    languages: BTreeSet<String>,
}

impl TechnologyFamily {
    pub fn new<I, S>(technology: Technology, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            technology,
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-sensitive exact membership.
    pub fn matches(&self, language: &str) -> bool {
        self.languages.contains(language)
    }
}

/// Classify a language against an ordered family list.
pub fn classify(language: &str, families: &[TechnologyFamily]) -> Technology {
    families
        .iter()
        .find(|family| family.matches(language))
        .map(|family| family.technology)
        .unwrap_or(Technology::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_families() -> Vec<TechnologyFamily> {
        vec![
            TechnologyFamily::new(Technology::Jvm, JVM_LANGUAGES),
            TechnologyFamily::new(Technology::DotNet, DOT_NET_LANGUAGES),
        ]
    }

    #[test]
    fn test_jvm_languages() {
        let families = default_families();
        for lang in ["Java", "Kotlin", "Scala", "Closure", "Groovy"] {
            assert_eq!(classify(lang, &families), Technology::Jvm, "{}", lang);
        }
    }

    #[test]
    fn test_dot_net() {
        assert_eq!(classify("C#", &default_families()), Technology::DotNet);
    }

    #[test]
    fn test_fallback_to_other() {
        let families = default_families();
        for lang in ["Rust", "Go", "", "F#", "Clojure"] {
            assert_eq!(classify(lang, &families), Technology::Other, "{:?}", lang);
        }
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let families = default_families();
        assert_eq!(classify("java", &families), Technology::Other);
        assert_eq!(classify("c#", &families), Technology::Other);
    }

    #[test]
    fn test_first_family_wins() {
        let families = vec![
            TechnologyFamily::new(Technology::DotNet, ["F#", "Java"]),
            TechnologyFamily::new(Technology::Jvm, ["Java"]),
        ];
        assert_eq!(classify("Java", &families), Technology::DotNet);
        assert_eq!(classify("F#", &families), Technology::DotNet);
    }

    #[test]
    fn test_empty_family_list() {
        assert_eq!(classify("Java", &[]), Technology::Other);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Technology::DotNet).unwrap(), "\"DOT_NET\"");
        assert_eq!(serde_json::to_string(&Technology::Jvm).unwrap(), "\"JVM\"");
    }
}
