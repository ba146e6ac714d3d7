use serde::{Deserialize, Serialize};

/// A generative-AI provider whose answers are sampled for brand mentions.
///
/// Stored lowercase in the `mentions.provider` column and in API payloads.
/// Unknown provider strings parse to [`Provider::Other`] so a new upstream
/// source never breaks ingestion or recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Chatgpt,
    Gemini,
    Claude,
    Perplexity,
    Other,
}

impl Provider {
    /// All providers the collection jobs are known to sample.
    pub const ALL: [Provider; 5] = [
        Provider::Chatgpt,
        Provider::Gemini,
        Provider::Claude,
        Provider::Perplexity,
        Provider::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Chatgpt => "chatgpt",
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::Perplexity => "perplexity",
            Provider::Other => "other",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "chatgpt" => Provider::Chatgpt,
            "gemini" => Provider::Gemini,
            "claude" => Provider::Claude,
            "perplexity" => Provider::Perplexity,
            _ => Provider::Other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Provider::Chatgpt.to_string(), "chatgpt");
        assert_eq!(Provider::Perplexity.to_string(), "perplexity");
    }

    #[test]
    fn from_str_roundtrips_known_providers() {
        for provider in Provider::ALL {
            let parsed: Provider = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn from_str_maps_unknown_to_other() {
        let parsed: Provider = "mistral".parse().unwrap();
        assert_eq!(parsed, Provider::Other);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Provider::Claude).unwrap();
        assert_eq!(json, "\"claude\"");
        let back: Provider = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(back, Provider::Gemini);
    }
}
