//! Prompt rendering for every completion-service call.
//!
//! Wording lives in `prompts/*.md` minijinja templates; this module only binds
//! stage inputs to them.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::SearchResult;

const ENHANCE_TEMPLATE: &str = include_str!("prompts/enhance.md");
const QUERY_TEMPLATE: &str = include_str!("prompts/query.md");
const DECIDE_TEMPLATE: &str = include_str!("prompts/decide.md");
const STEPS_TEMPLATE: &str = include_str!("prompts/steps.md");
const VALIDATE_TEMPLATE: &str = include_str!("prompts/validate.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            ("enhance", ENHANCE_TEMPLATE),
            ("query", QUERY_TEMPLATE),
            ("decide", DECIDE_TEMPLATE),
            ("steps", STEPS_TEMPLATE),
            ("validate", VALIDATE_TEMPLATE),
        ] {
            env.add_template(name, source)
                .with_context(|| format!("load {name} prompt template"))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))
    }

    pub fn enhance(&self, task: &str, summary: &str) -> Result<String> {
        self.render(
            "enhance",
            context! {
                task => task.trim(),
                summary => non_empty(summary),
            },
        )
    }

    pub fn query(&self, enhanced_task: &str) -> Result<String> {
        self.render(
            "query",
            context! {
                enhanced_task => enhanced_task.trim(),
            },
        )
    }

    pub fn decide(&self, enhanced_task: &str, summary: &str) -> Result<String> {
        self.render(
            "decide",
            context! {
                enhanced_task => enhanced_task.trim(),
                summary => non_empty(summary),
            },
        )
    }

    pub fn steps(
        &self,
        enhanced_task: &str,
        summary: &str,
        results: &[SearchResult],
    ) -> Result<String> {
        self.render(
            "steps",
            context! {
                enhanced_task => enhanced_task.trim(),
                summary => non_empty(summary),
                results => results,
            },
        )
    }

    /// `step_json` is the step as the service should see it; `problem` names a
    /// known shape error when the step could not be parsed.
    pub fn validate(&self, step_json: &str, problem: Option<&str>, summary: &str) -> Result<String> {
        self.render(
            "validate",
            context! {
                step => step_json,
                problem => problem,
                summary => non_empty(summary),
            },
        )
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_mentions_empty_codebase() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine.enhance("Create hello.py", "  ").expect("render");
        assert!(prompt.contains("Create hello.py"));
        assert!(prompt.contains("(the codebase is empty)"));
    }

    #[test]
    fn steps_lists_external_references() {
        let engine = PromptEngine::new().expect("engine");
        let results = vec![SearchResult {
            title: "Requests quickstart".to_string(),
            url: "https://requests.readthedocs.io".to_string(),
            content: "r = requests.get(url)".to_string(),
        }];
        let prompt = engine
            .steps("Fetch JSON", "\n---\nFilename: a.py\n", &results)
            .expect("render");
        assert!(prompt.contains("## External references"));
        assert!(prompt.contains("### Requests quickstart"));
        assert!(prompt.contains("Filename: a.py"));
    }

    #[test]
    fn steps_without_results_omits_references() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine.steps("task", "", &[]).expect("render");
        assert!(!prompt.contains("External references"));
    }

    #[test]
    fn validate_includes_step_and_problem() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .validate(
                r#"{"file":"a.py","tool":"noop"}"#,
                Some("unsupported tool `noop`"),
                "",
            )
            .expect("render");
        assert!(prompt.contains(r#"{"file":"a.py","tool":"noop"}"#));
        assert!(prompt.contains("## Known problem"));
    }
}
