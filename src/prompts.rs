//! Audience definitions and prompt construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Reader level a summary or chat answer is tailored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Elementary,
    HighSchool,
    Undergraduate,
    Graduate,
    Expert,
}

impl Audience {
    pub const ALL: [Audience; 5] = [
        Audience::Elementary,
        Audience::HighSchool,
        Audience::Undergraduate,
        Audience::Graduate,
        Audience::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Elementary => "elementary",
            Audience::HighSchool => "high_school",
            Audience::Undergraduate => "undergraduate",
            Audience::Graduate => "graduate",
            Audience::Expert => "expert",
        }
    }

    /// The audience-specific instruction block placed ahead of every
    /// summary and chat prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Audience::Elementary => {
                "You are summarizing a research paper for elementary school students (ages 6-11).\n\
                 - Use very simple language that a child can understand\n\
                 - Avoid technical jargon completely\n\
                 - Use analogies and examples from everyday life\n\
                 - Keep sentences short and simple\n\
                 - Explain concepts as if teaching a curious child\n\
                 - Make it engaging and fun to read"
            }
            Audience::HighSchool => {
                "You are summarizing a research paper for high school students (ages 14-18).\n\
                 - Use clear, accessible language\n\
                 - Explain technical terms when you use them\n\
                 - Connect concepts to real-world applications\n\
                 - Use analogies that teenagers can relate to\n\
                 - Keep it engaging and informative\n\
                 - Assume basic science knowledge but explain advanced concepts"
            }
            Audience::Undergraduate => {
                "You are summarizing a research paper for undergraduate college students.\n\
                 - Use academic language but remain clear and accessible\n\
                 - Explain specialized terminology as needed\n\
                 - Focus on key methodologies and findings\n\
                 - Connect to broader field context\n\
                 - Assume foundational knowledge in the subject area\n\
                 - Highlight practical applications and implications"
            }
            Audience::Graduate => {
                "You are summarizing a research paper for graduate students and researchers.\n\
                 - Use technical and academic language appropriate for the field\n\
                 - Focus on methodology, results, and significance\n\
                 - Discuss limitations and future research directions\n\
                 - Assume strong background knowledge\n\
                 - Highlight novel contributions and innovations\n\
                 - Be precise and detailed in explanations"
            }
            Audience::Expert => {
                "You are summarizing a research paper for expert researchers and professionals in the field.\n\
                 - Use advanced technical terminology\n\
                 - Focus on novel methodologies and significant findings\n\
                 - Critically analyze approach and results\n\
                 - Discuss implications for the field\n\
                 - Highlight connections to related work\n\
                 - Be concise but comprehensive\n\
                 - Assume deep domain expertise"
            }
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elementary" => Ok(Audience::Elementary),
            "high_school" => Ok(Audience::HighSchool),
            "undergraduate" => Ok(Audience::Undergraduate),
            "graduate" => Ok(Audience::Graduate),
            "expert" => Ok(Audience::Expert),
            other => Err(RagError::Validation(format!("unknown audience '{other}'"))),
        }
    }
}

/// System prompt for the summarizer.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert academic assistant specialized in \
summarizing research papers for different audiences. Your summaries are accurate, \
well-structured, and tailored to the reader's level of expertise.";

/// Builds the user prompt for a summary request.
pub fn build_summary_prompt(text: &str, audience: Audience) -> String {
    format!(
        "{}\n\n\
         Please provide a clear, well-structured summary of the following research paper. Include:\n\
         1. Main research question or objective\n\
         2. Key methodology\n\
         3. Major findings\n\
         4. Significance and implications\n\n\
         Research Paper Text:\n{text}\n\nSummary:",
        audience.instruction()
    )
}

/// Builds the chat system prompt: audience instruction, retrieved context,
/// and answer-style guidance.
pub fn build_chat_system_prompt(audience: Audience, context: &str) -> String {
    format!(
        "{}\n\n\
         You are answering questions about a research paper. Use the following context from the \
         paper to answer the user's question. If the context doesn't contain enough information \
         to answer the question, say so honestly.\n\n\
         Context from the paper:\n{context}\n\n\
         Instructions:\n\
         - Answer in a way appropriate for the {} level\n\
         - Base your answer on the provided context\n\
         - If you're not certain, express uncertainty\n\
         - Keep responses concise and focused\n\
         - Reference specific sections when relevant",
        audience.instruction(),
        audience.as_str()
    )
}
