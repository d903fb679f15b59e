use manualqa_core::config::{CONTEXT_PLACEHOLDER, QUERY_PLACEHOLDER};
use manualqa_core::error::{Error, Result};

/// Prompt template with `{context}` and `{query}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(CONTEXT_PLACEHOLDER) || !template.contains(QUERY_PLACEHOLDER) {
            return Err(Error::InvalidConfig("prompt template must contain {context} and {query}".to_string()));
        }
        Ok(Self { template })
    }

    /// Substitutes in a single left-to-right pass, so placeholder text inside
    /// the passage or the query is left as is.
    pub fn render(&self, context: &str, query: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + query.len());
        let mut rest = self.template.as_str();
        loop {
            let next = [(CONTEXT_PLACEHOLDER, context), (QUERY_PLACEHOLDER, query)]
                .into_iter()
                .filter_map(|(placeholder, value)| rest.find(placeholder).map(|at| (at, placeholder, value)))
                .min_by_key(|(at, _, _)| *at);
            match next {
                Some((at, placeholder, value)) => {
                    out.push_str(&rest[..at]);
                    out.push_str(value);
                    rest = &rest[at + placeholder.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}
