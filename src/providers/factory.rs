//! Provider name to helper lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AnthropicHelper, GeminiHelper, OpenAiHelper, ProviderHelper};
use crate::error::PromptError;
use crate::types::ConstraintOverrides;

#[derive(Debug, Clone)]
pub struct ProviderFactory {
    helpers: HashMap<String, Arc<dyn ProviderHelper>>,
}

impl Default for ProviderFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register(Arc::new(OpenAiHelper::default()));
        factory.register(Arc::new(AnthropicHelper::default()));
        factory.register(Arc::new(GeminiHelper::default()));
        factory
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl ProviderFactory {
    /// Factory with the OpenAI, Anthropic and Gemini helpers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    /// Add a helper, replacing any helper registered under the same name.
    pub fn register(&mut self, helper: Arc<dyn ProviderHelper>) {
        self.helpers.insert(normalize_name(helper.name()), helper);
    }

    /// Helper for `name` (trimmed, case-insensitive), or `UnknownProvider`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderHelper>, PromptError> {
        self.helpers
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| PromptError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(&normalize_name(name))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.helpers.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Rebuild helpers with configured constraint overrides.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, ConstraintOverrides>,
    ) -> Result<Self, PromptError> {
        for (name, o) in overrides {
            let helper = self.get(name)?;
            let constraint = helper.constraint().clone().apply(o);
            self.register(helper.with_constraint(constraint));
        }
        Ok(self)
    }
}
