//! Prompt generation.
//!
//! A [`PromptGenerator`] turns a topic into a block of numbered lines
//! (`"1. thunder crack"`, `"2. drip on leaf"`, ...). [`parse_prompts`] turns
//! that block into individual prompts for the synthesizer.

pub mod openai;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;

pub use openai::{OpenAI, OpenAIConfig};

/// Number of prompts requested per run.
pub const DEFAULT_PROMPT_COUNT: usize = 25;

/// Fixed system instruction sent with every generation request.
pub const SYSTEM_INSTRUCTION: &str = "You job is to create simple line propmts for sound effects";

/// Leading ordinal marker: digits, a period, optional whitespace.
static ORDINAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("ordinal prefix pattern is valid"));

/// Build the user instruction for a topic.
#[must_use]
pub fn user_instruction(topic: &str, count: usize) -> String {
    format!(
        "You job is to create {count} prompts about {topic} which will be used to create sound \
         effects. Keep the prompts extremely short and simple. And give in the form of a numbered \
         list 1. 2. a and nothing else"
    )
}

/// A backend that produces numbered sound-effect descriptions for a topic.
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    /// Ask for a numbered list of short prompts about `topic`.
    ///
    /// Returns the raw text; no parsing is done here. One attempt only.
    async fn generate(&self, topic: &str) -> Result<String>;

    /// Provider name, used in logs.
    fn provider_name(&self) -> &'static str;
}

/// Split generator output into prompts.
///
/// Each line loses its `"<n>."` prefix (after any indentation) and
/// surrounding whitespace. Lines without a prefix pass through trimmed, and
/// blank lines come out as empty prompts; nothing is filtered.
#[must_use]
pub fn parse_prompts(text: &str) -> Vec<String> {
    text.split('\n').map(parse_prompt_line).collect()
}

/// Strip the ordinal prefix from a single line and trim it.
#[must_use]
pub fn parse_prompt_line(line: &str) -> String {
    ORDINAL_PREFIX.replace(line.trim_start(), "").trim().to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parse_prompt_line {
        use super::*;

        #[test]
        fn strips_prefix_and_whitespace() {
            assert_eq!(parse_prompt_line("1. thunder crack"), "thunder crack");
            assert_eq!(parse_prompt_line("25.drip on leaf"), "drip on leaf");
        }

        #[test]
        fn indented_line_loses_prefix() {
            assert_eq!(parse_prompt_line("  12.  explosion sound  "), "explosion sound");
        }

        #[test]
        fn unnumbered_line_passes_through_trimmed() {
            assert_eq!(parse_prompt_line("ambient wind"), "ambient wind");
            assert_eq!(parse_prompt_line("  ambient wind \r"), "ambient wind");
        }

        #[test]
        fn only_first_prefix_is_removed() {
            assert_eq!(parse_prompt_line("3. 4. echo"), "4. echo");
        }

        #[test]
        fn blank_line_becomes_empty_prompt() {
            assert_eq!(parse_prompt_line(""), "");
            assert_eq!(parse_prompt_line("   "), "");
        }
    }

    mod parse_prompts {
        use super::*;

        #[test]
        fn parses_numbered_list_in_order() {
            let prompts = parse_prompts("1. thunder crack\n2. heavy rain\n3. drip on leaf");
            assert_eq!(prompts, vec!["thunder crack", "heavy rain", "drip on leaf"]);
        }

        #[test]
        fn keeps_blank_and_stray_lines() {
            let prompts = parse_prompts("Here you go:\n\n1. thunder\n");
            assert_eq!(prompts, vec!["Here you go:", "", "thunder", ""]);
        }

        #[test]
        fn twenty_five_lines_give_twenty_five_prompts() {
            let text = (1..=25)
                .map(|n| format!("{n}. sound {n}"))
                .collect::<Vec<_>>()
                .join("\n");
            let prompts = parse_prompts(&text);
            assert_eq!(prompts.len(), 25);
            assert_eq!(prompts[0], "sound 1");
            assert_eq!(prompts[24], "sound 25");
        }
    }

    #[test]
    fn user_instruction_embeds_topic_and_count() {
        let text = user_instruction("rainstorm", 25);
        assert!(text.contains("create 25 prompts about rainstorm"));
        assert!(text.ends_with("and nothing else"));
    }
}
