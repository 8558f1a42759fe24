//! services/api/src/prompts.rs
//!
//! Prompt templates for the generation adapters. Both prompts instruct the
//! model to answer with strict JSON; the extraction layer in the core crate
//! copes with the cases where it does not comply.

/// Builds the prompt asking for a question/answer set for a role.
pub fn question_answer_prompt(
    role: &str,
    experience: &str,
    topics_to_focus: &str,
    number_of_questions: u32,
) -> String {
    format!(
        r#"You are an AI trained to generate technical interview questions and answers for {role} positions.

Task:
- Role: {role}
- Candidate Experience: {experience} years
- Focus Topics: {topics_to_focus}
- Generate exactly {number_of_questions} interview questions with detailed answers.

CRITICAL JSON FORMATTING RULES:
1. Return ONLY a valid JSON array - no explanations, no markdown wrapper, no extra text
2. Each object must have exactly these fields: "question" and "answer" (lowercase "answer")
3. All strings must be properly escaped for JSON
4. For code examples, use markdown code blocks but escape them properly
5. Replace actual newlines with \n in JSON strings
6. Do not use unescaped quotes, backslashes, or special characters
7. Ensure no trailing commas

ANSWER STRUCTURE:
- Start with clear explanation
- Add code examples when relevant, formatted as markdown code blocks with escaped newlines
- Keep answers comprehensive but not overly long

VALID EXAMPLE FORMAT:
[
  {{
    "question": "What is a variable in JavaScript?",
    "answer": "A variable is a container that stores data values.\n\n**Example:**\n\n```javascript\nconst message = 'Hello World';\nconsole.log(message);\n```"
  }}
]

Now generate exactly {number_of_questions} interview questions following this format:
"#
    )
}

/// Builds the prompt asking for a `{title, explanation}` concept explanation.
pub fn concept_explain_prompt(question: &str) -> String {
    format!(
        r#"You are an AI trained to explain technical concepts clearly and comprehensively.

Task:
- Explain the concept of "{question}" in an easy-to-understand but in-depth manner.
- If relevant, include code examples formatted as markdown code blocks.
- Use clear, clean formatting.

CRITICAL JSON FORMATTING RULES:
1. Return ONLY a valid JSON object - no extra text, no markdown wrappers.
2. The JSON must have exactly these fields: "title" and "explanation".
3. All strings must be properly escaped for JSON.
4. For code examples, use markdown code blocks inside the JSON string.
5. Replace actual newlines with \n in JSON strings.
6. Do NOT use unescaped quotes, backslashes, or special characters.
7. Ensure no trailing commas.

RESPONSE STRUCTURE:
{{
  "title": "Short descriptive title summarizing the concept",
  "explanation": "Detailed explanation with code examples if applicable"
}}

IMPORTANT: Provide ONLY the JSON object in the exact format above - no additional text or explanation.

Now, generate the explanation for: "{question}"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_prompt_interpolates_all_fields() {
        let prompt = question_answer_prompt("Backend Engineer", "4", "Rust, SQL", 5);
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("Candidate Experience: 4 years"));
        assert!(prompt.contains("Rust, SQL"));
        assert!(prompt.contains("exactly 5 interview questions"));
    }

    #[test]
    fn explain_prompt_names_the_concept() {
        let prompt = concept_explain_prompt("event loop");
        assert!(prompt.contains("\"event loop\""));
        assert!(prompt.contains("\"title\""));
        assert!(prompt.contains("\"explanation\""));
    }
}
