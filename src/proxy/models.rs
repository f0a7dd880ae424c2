//! Model alias rewriting
//!
//! Upstream retires model identifiers faster than clients are updated. Legacy
//! identifiers are mapped to one canonical model by exact match on the model
//! token of each path segment, so version digits elsewhere in the path are
//! never touched.

/// Legacy identifiers rewritten to the canonical model
pub const LEGACY_MODEL_ALIASES: &[&str] = &[
    "gemini-pro",
    "gemini-2.0-pro",
    "gemini-2.0-flash",
    "gemini-2.5-flash-latest",
    "gemini-flash-latest",
];

/// Closed mapping from legacy model identifiers to one canonical identifier
#[derive(Debug, Clone)]
pub struct ModelAliases {
    canonical: String,
    aliases: Vec<String>,
}

impl ModelAliases {
    /// Build the default alias set targeting `canonical`
    pub fn new(canonical: impl Into<String>) -> Self {
        Self::with_aliases(canonical, LEGACY_MODEL_ALIASES.iter().copied())
    }

    /// Build an alias set from an explicit list. An alias equal to the
    /// canonical id is dropped so it cannot rewrite to itself.
    pub fn with_aliases<I, S>(canonical: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = canonical.into();
        let aliases = aliases
            .into_iter()
            .map(Into::into)
            .filter(|alias| *alias != canonical)
            .collect();
        Self { canonical, aliases }
    }

    /// Canonical model identifier
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Resolve a single model token
    pub fn resolve<'a>(&'a self, model: &'a str) -> &'a str {
        if self.aliases.iter().any(|alias| alias == model) {
            &self.canonical
        } else {
            model
        }
    }

    /// Rewrite every path segment whose model token is a known alias.
    ///
    /// A segment is `model` or `model:operation`; only the part before the
    /// first `:` is compared, and the operation suffix is kept verbatim.
    pub fn rewrite_path(&self, path: &str) -> String {
        path.split('/')
            .map(|segment| match segment.split_once(':') {
                Some((model, operation)) => {
                    format!("{}:{}", self.resolve(model), operation)
                }
                None => self.resolve(segment).to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for ModelAliases {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CANONICAL_MODEL)
    }
}
