//! Prompt templates for the three LLM-backed refinement steps.

use lexrag_core::error::{LexragError, Result};
use minijinja::{Environment, context};

const ANSWER: &str = "answer.txt";
const VERIFICATION: &str = "verification.txt";
const CORRECTION: &str = "correction.txt";

const ANSWER_TEMPLATE: &str = r#"You are an expert legal analyst. Use the provided context to answer the question accurately and comprehensively.

Context from legal documents:
{{ context }}

Question: {{ question }}

Instructions:
1. Provide a precise, fact-based answer using ONLY the information from the context
2. Include specific contract clauses, sections or legal terms when relevant
3. If information is not in the context, state "This information is not provided in the document"
4. Cite specific sections or clauses when making claims
5. Be thorough but concise in your analysis
6. Focus on legal accuracy and implications

Answer:"#;

const VERIFICATION_TEMPLATE: &str = r#"You are a legal verification expert. Analyze the following answer for accuracy, completeness, and legal precision.

Original Question: {{ question }}
Generated Answer: {{ answer }}
Source Context: {{ context }}

Verification Tasks:
1. Check if ALL claims in the answer are supported by the context
2. Identify any potential hallucinations or unsupported statements
3. Verify that legal terms and concepts are used correctly
4. Assess if the answer fully addresses the question
5. Check for any missing critical information available in the context

Rate the answer on a scale of 0-1 for confidence based on:
- Factual accuracy (context support)
- Completeness (addresses all aspects)
- Legal precision (correct terminology)
- Relevance (answers the specific question)

Respond with only a JSON object:
{
    "verification_status": "VERIFIED" or "NEEDS_CORRECTION",
    "confidence": 0.0-1.0,
    "issues": ["specific issues found"],
    "missing_information": ["important information that should be included"],
    "legal_concerns": ["any legal accuracy concerns"]
}"#;

const CORRECTION_TEMPLATE: &str = r#"You are tasked with correcting a legal analysis response based on verification feedback.

Original Question: {{ question }}
Previous Answer: {{ answer }}
Context: {{ context }}
Issues Identified:
{{ issues }}

Correction Instructions:
1. Address each identified issue specifically
2. Ensure every claim is supported by the context
3. Include any missing critical information from the context
4. Maintain legal accuracy and precision
5. If certain information is truly not available in the context, state this clearly
6. Provide citations to specific parts of the context when possible

Provide the corrected answer:"#;

/// Compiled prompt templates.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            (ANSWER, ANSWER_TEMPLATE),
            (VERIFICATION, VERIFICATION_TEMPLATE),
            (CORRECTION, CORRECTION_TEMPLATE),
        ] {
            env.add_template(name, source).map_err(|e| {
                LexragError::internal(format!("Failed to compile prompt template {name}: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    pub fn answer(&self, question: &str, context: &[String]) -> Result<String> {
        self.render(
            ANSWER,
            context! { question => question, context => context.join("\n\n") },
        )
    }

    pub fn verification(&self, question: &str, answer: &str, context: &[String]) -> Result<String> {
        self.render(
            VERIFICATION,
            context! {
                question => question,
                answer => answer,
                context => context.join("\n\n"),
            },
        )
    }

    pub fn correction(
        &self,
        question: &str,
        answer: &str,
        context: &[String],
        issues: &[String],
    ) -> Result<String> {
        self.render(
            CORRECTION,
            context! {
                question => question,
                answer => answer,
                context => context.join("\n\n"),
                issues => issues.join("\n"),
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|e| LexragError::internal(format!("Failed to render prompt {name}: {e}")))
    }
}
