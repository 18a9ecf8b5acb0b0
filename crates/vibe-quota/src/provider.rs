//! Upstream LLM providers tracked by the quota layer.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream provider whose usage is metered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Cerebras (llama-3.3-70b, large daily budget)
    Cerebras,
    /// Groq (llama-3.3-70b-versatile, small daily budget)
    Groq,
    /// Mistral AI
    Mistral,
    /// OpenRouter gateway
    OpenRouter,
}

impl Provider {
    /// Every tracked provider, in table order.
    pub const ALL: [Provider; 4] = [
        Provider::Cerebras,
        Provider::Groq,
        Provider::Mistral,
        Provider::OpenRouter,
    ];

    /// Stable lowercase identifier, also used in storage keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Cerebras => "cerebras",
            Provider::Groq => "groq",
            Provider::Mistral => "mistral",
            Provider::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}
