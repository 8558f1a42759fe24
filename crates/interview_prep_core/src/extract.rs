//! crates/interview_prep_core/src/extract.rs
//!
//! Recovers structured data from raw generative-model output. The model is
//! instructed to return JSON, but in practice the text arrives with markdown
//! fences, unescaped newlines inside strings, miscapitalized keys, or
//! trailing commas. Each public function tries a fixed sequence of
//! strategies, strict first, permissive last.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::domain::{ConceptExplanation, QuestionAnswer};

/// Title used when no title can be recovered from the model output.
pub const FALLBACK_TITLE: &str = "Explanation";
/// Body used when no explanation can be recovered from the model output.
pub const FALLBACK_EXPLANATION: &str = "Unable to parse explanation content.";

/// Failure modes of [`extract_question_answers`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not locate valid JSON in the response")]
    NoJsonFound,
    #[error("response is not a valid array")]
    NotAnArray,
    #[error("question at index {index} is missing required fields (question or answer)")]
    MissingField { index: usize },
}

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").unwrap())
}

fn array_candidate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy: first `[ {` through the last `} ]` in the text.
    RE.get_or_init(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").unwrap())
}

fn answer_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""Answer"(\s*:)"#).unwrap())
}

fn question_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""Question"(\s*:)"#).unwrap())
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap())
}

//=========================================================================================
// Question/Answer Extraction
//=========================================================================================

/// Extracts an ordered list of question/answer pairs from raw model output.
///
/// Strategy order, first success wins:
/// 1. A fenced ```json block, parsed as-is.
/// 2. The same block contents after a repair pass.
/// 3. No fenced block: the first `[ { ... } ]` substring, repaired and parsed.
///
/// A successful parse must be an array whose every element carries non-empty
/// `question` and `answer` strings; one bad element fails the whole
/// extraction, reporting the first offending index.
pub fn extract_question_answers(raw_text: &str) -> Result<Vec<QuestionAnswer>, ExtractError> {
    let parsed = locate_question_json(raw_text)?;

    let items = match parsed {
        Value::Array(items) => items,
        _ => return Err(ExtractError::NotAnArray),
    };

    let mut pairs = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let question = non_empty_field(item, "question");
        let answer = non_empty_field(item, "answer");
        match (question, answer) {
            (Some(question), Some(answer)) => pairs.push(QuestionAnswer { question, answer }),
            _ => return Err(ExtractError::MissingField { index }),
        }
    }
    Ok(pairs)
}

fn non_empty_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn locate_question_json(raw_text: &str) -> Result<Value, ExtractError> {
    if let Some(caps) = fenced_json_re().captures(raw_text) {
        let block = caps.get(1).map_or("", |m| m.as_str());
        if let Ok(value) = serde_json::from_str(block) {
            return Ok(value);
        }
        return parse_repaired(block).ok_or(ExtractError::NoJsonFound);
    }

    let candidate = array_candidate_re()
        .find(raw_text)
        .ok_or(ExtractError::NoJsonFound)?;
    parse_repaired(candidate.as_str()).ok_or(ExtractError::NoJsonFound)
}

/// Runs the scoped repair pass and parses; when that still fails, retries
/// with the cruder global substitution pass.
fn parse_repaired(candidate: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(&repair_json(candidate)) {
        return Some(value);
    }
    serde_json::from_str(&repair_json_global(candidate)).ok()
}

//=========================================================================================
// Repair Passes
//=========================================================================================

/// Repairs the most common generator formatting mistakes in a JSON
/// candidate: miscapitalized keys, literal control characters and stray
/// quotes/backslashes inside string values, and trailing commas.
///
/// The string-value fixes run through an explicit character scanner
/// (outside-string / inside-string / escape states) so that structural
/// braces, brackets and delimiting quotes are left untouched.
fn repair_json(candidate: &str) -> String {
    let keyed = normalize_keys(candidate);
    let escaped = escape_inside_strings(&keyed);
    let without_trailing = trailing_comma_re().replace_all(&escaped, "$1");
    without_trailing.trim().to_string()
}

/// The best-effort fallback: the same substitutions applied globally,
/// without the string-span scoping.
fn repair_json_global(candidate: &str) -> String {
    let keyed = normalize_keys(candidate);
    let escaped = keyed
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    let without_trailing = trailing_comma_re().replace_all(&escaped, "$1");
    without_trailing.trim().to_string()
}

fn normalize_keys(candidate: &str) -> String {
    let step = answer_key_re().replace_all(candidate, "\"answer\"$1");
    question_key_re()
        .replace_all(&step, "\"question\"$1")
        .into_owned()
}

#[derive(PartialEq)]
enum ScanState {
    Outside,
    Inside,
}

/// Escapes literal newlines, carriage returns, tabs, lone backslashes and
/// embedded quotes, but only within string spans.
///
/// A quote encountered inside a string closes it when the next
/// non-whitespace character is structural (`:`, `,`, `}` or `]`); otherwise
/// it is treated as unescaped content and re-escaped.
fn escape_inside_strings(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut state = ScanState::Outside;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            ScanState::Outside => {
                if c == '"' {
                    state = ScanState::Inside;
                }
                out.push(c);
                i += 1;
            }
            ScanState::Inside => match c {
                '\\' => {
                    // Keep valid escape sequences; double lone backslashes.
                    match chars.get(i + 1) {
                        Some(next)
                            if matches!(
                                next,
                                '"' | '\\' | '/' | 'n' | 'r' | 't' | 'b' | 'f' | 'u'
                            ) =>
                        {
                            out.push('\\');
                            out.push(*next);
                            i += 2;
                        }
                        _ => {
                            out.push_str("\\\\");
                            i += 1;
                        }
                    }
                }
                '\n' => {
                    out.push_str("\\n");
                    i += 1;
                }
                '\r' => {
                    out.push_str("\\r");
                    i += 1;
                }
                '\t' => {
                    out.push_str("\\t");
                    i += 1;
                }
                '"' => {
                    if closes_string(&chars, i + 1) {
                        state = ScanState::Outside;
                        out.push('"');
                    } else {
                        out.push_str("\\\"");
                    }
                    i += 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            },
        }
    }
    out
}

/// Whether a quote at this position delimits the string, judged by the next
/// non-whitespace character being structural JSON.
fn closes_string(chars: &[char], after: usize) -> bool {
    match chars[after..].iter().find(|c| !c.is_whitespace()) {
        Some(c) => matches!(c, ':' | ',' | '}' | ']'),
        // Quote at end of input: closing.
        None => true,
    }
}

//=========================================================================================
// Concept Explanation Extraction
//=========================================================================================

/// Extracts a `{title, explanation}` object from raw model output.
///
/// Total: when no strategy recovers a field, the fixed placeholders are
/// returned instead. Strategy order: fenced ```json block, direct object
/// parse, per-key pattern matching, then a manual escape-aware scan.
pub fn extract_concept_explanation(raw_text: &str) -> ConceptExplanation {
    if let Some(result) = parse_fenced_object(raw_text) {
        return result;
    }
    if let Some(result) = parse_direct_object(raw_text) {
        return result;
    }
    if let Some(result) = extract_using_patterns(raw_text) {
        return result;
    }
    extract_fields_manually(raw_text)
}

fn explanation_from_value(value: &Value) -> Option<ConceptExplanation> {
    let title = value.get("title")?.as_str()?;
    let explanation = value.get("explanation")?.as_str()?;
    Some(ConceptExplanation {
        title: title.to_string(),
        explanation: explanation.to_string(),
    })
}

fn parse_fenced_object(raw_text: &str) -> Option<ConceptExplanation> {
    let caps = fenced_json_re().captures(raw_text)?;
    let block = caps.get(1)?.as_str();
    let value: Value = serde_json::from_str(block).ok()?;
    explanation_from_value(&value)
}

fn parse_direct_object(raw_text: &str) -> Option<ConceptExplanation> {
    let trimmed = raw_text.trim();
    if !(trimmed.starts_with('{')
        && trimmed.contains("\"title\"")
        && trimmed.contains("\"explanation\""))
    {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    explanation_from_value(&value)
}

/// Strategy 3: regex extraction per key, tolerating single quotes and
/// unquoted/miscased keys. Succeeds when at least one field matches,
/// filling the other with its placeholder.
fn extract_using_patterns(text: &str) -> Option<ConceptExplanation> {
    static TITLE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    static EXPLANATION_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    let title_patterns = TITLE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap(),
            Regex::new(r#"'title'\s*:\s*'((?:[^'\\]|\\.)*)'"#).unwrap(),
            Regex::new(r#"(?i)title\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap(),
        ]
    });
    let explanation_patterns = EXPLANATION_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r#"(?s)"explanation"\s*:\s*"(.*?)"\s*[,}]"#).unwrap(),
            Regex::new(r#"(?s)'explanation'\s*:\s*'(.*?)'\s*[,}]"#).unwrap(),
            Regex::new(r#"(?si)explanation\s*:\s*"(.*?)"\s*[,}]"#).unwrap(),
        ]
    });

    let title = title_patterns
        .iter()
        .find_map(|p| p.captures(text))
        .map(|caps| unescape(caps.get(1).map_or("", |m| m.as_str())));
    let explanation = explanation_patterns
        .iter()
        .find_map(|p| p.captures(text))
        .map(|caps| unescape(caps.get(1).map_or("", |m| m.as_str())));

    if title.is_none() && explanation.is_none() {
        return None;
    }
    Some(ConceptExplanation {
        title: title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        explanation: explanation.unwrap_or_else(|| FALLBACK_EXPLANATION.to_string()),
    })
}

/// Decodes the escape sequences the generator is told to emit.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            // Unknown escapes pass the character through unchanged.
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Strategy 4: plain index search for the key names, then a
/// character-by-character walk that tracks escape state to find the true
/// closing quote. Always produces a result; missing keys fall back to
/// placeholders.
fn extract_fields_manually(text: &str) -> ConceptExplanation {
    let mut cleaned = text.trim().to_string();
    // Strip fence markers when present.
    static FENCE_OPEN: OnceLock<Regex> = OnceLock::new();
    let fence_open = FENCE_OPEN.get_or_init(|| Regex::new(r"(?i)```json\s*").unwrap());
    cleaned = fence_open.replace(&cleaned, "").into_owned();
    if let Some(stripped) = cleaned.trim_end().strip_suffix("```") {
        cleaned = stripped.to_string();
    }

    let title = value_start(&cleaned, "\"title\"")
        .and_then(|start| raw_quoted_span(&cleaned, start))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let explanation = value_start(&cleaned, "\"explanation\"")
        .map(|start| decode_quoted_content(&cleaned, start))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| FALLBACK_EXPLANATION.to_string());

    ConceptExplanation { title, explanation }
}

/// Byte offset of the opening quote of the value following `key`, located
/// case-insensitively.
fn value_start(text: &str, key: &str) -> Option<usize> {
    let key_pos = text.to_ascii_lowercase().find(key)?;
    let colon = text[key_pos..].find(':')? + key_pos;
    let quote = text[colon..].find('"')? + colon;
    Some(quote)
}

/// The raw span between the opening quote and the first quote not preceded
/// by a backslash. No escape decoding.
fn raw_quoted_span(text: &str, quote_start: usize) -> Option<String> {
    let body = &text[quote_start + 1..];
    let mut prev = '\0';
    for (idx, c) in body.char_indices() {
        if c == '"' && prev != '\\' {
            return Some(body[..idx].to_string());
        }
        prev = c;
    }
    None
}

/// Walks the quoted value decoding escapes as encountered. Runs to the end
/// of input when the closing quote is missing, returning what accumulated.
fn decode_quoted_content(text: &str, quote_start: usize) -> String {
    let mut content = String::new();
    let mut escape_next = false;

    for c in text[quote_start + 1..].chars() {
        if escape_next {
            match c {
                'n' => content.push('\n'),
                'r' => content.push('\r'),
                't' => content.push('\t'),
                '\\' => content.push('\\'),
                '"' => content.push('"'),
                other => content.push(other),
            }
            escape_next = false;
        } else if c == '\\' {
            escape_next = true;
        } else if c == '"' {
            return content;
        } else {
            content.push(c);
        }
    }
    content
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fenced(body: &str) -> String {
        format!("Here you go:\n```json\n{}\n```\nLet me know!", body)
    }

    #[test]
    fn well_formed_fenced_array_preserves_order() {
        let raw = fenced(
            r#"[
                {"question": "What is ownership?", "answer": "A set of rules."},
                {"question": "What is borrowing?", "answer": "Temporary access."}
            ]"#,
        );
        let pairs = extract_question_answers(&raw).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "What is ownership?");
        assert_eq!(pairs[1].answer, "Temporary access.");
    }

    #[test]
    fn missing_answer_reports_offending_index() {
        let raw = fenced(
            r#"[
                {"question": "Q1", "answer": "A1"},
                {"question": "Q2"}
            ]"#,
        );
        match extract_question_answers(&raw) {
            Err(ExtractError::MissingField { index }) => assert_eq!(index, 1),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn empty_answer_string_is_rejected() {
        let raw = fenced(r#"[{"question": "Q1", "answer": ""}]"#);
        assert!(matches!(
            extract_question_answers(&raw),
            Err(ExtractError::MissingField { index: 0 })
        ));
    }

    #[test]
    fn fenced_object_is_not_an_array() {
        let raw = fenced(r#"{"question": "Q1", "answer": "A1"}"#);
        assert!(matches!(
            extract_question_answers(&raw),
            Err(ExtractError::NotAnArray)
        ));
    }

    #[test]
    fn prose_without_json_fails_to_locate() {
        let raw = "Sorry, I cannot generate questions right now.";
        assert!(matches!(
            extract_question_answers(raw),
            Err(ExtractError::NoJsonFound)
        ));
    }

    #[test]
    fn bare_array_without_fences_is_found() {
        let raw = r#"Sure! [ {"question": "Q1", "answer": "A1"} ] Anything else?"#;
        let pairs = extract_question_answers(raw).unwrap();
        assert_eq!(pairs[0].answer, "A1");
    }

    #[test]
    fn raw_newline_inside_string_is_repaired() {
        let raw = fenced(
            "[{\"question\": \"Q1\", \"answer\": \"first line\nsecond line\"}]",
        );
        let pairs = extract_question_answers(&raw).unwrap();
        assert_eq!(pairs[0].answer, "first line\nsecond line");
    }

    #[test]
    fn capitalized_answer_key_is_normalized_during_repair() {
        // The trailing comma makes the block invalid, so the repair pass
        // runs and canonicalizes the key along the way.
        let raw = fenced(r#"[{"question": "Q1", "Answer": "A1"},]"#);
        let pairs = extract_question_answers(&raw).unwrap();
        assert_eq!(pairs[0].answer, "A1");
    }

    #[test]
    fn capitalized_key_in_valid_json_is_a_missing_field() {
        // Valid JSON parses on the first strategy, so key normalization
        // never runs and validation sees no `answer`.
        let raw = fenced(r#"[{"question": "Q1", "Answer": "A1"}]"#);
        let err = extract_question_answers(&raw).unwrap_err();
        assert!(matches!(err, ExtractError::MissingField { index: 0 }));
    }

    #[test]
    fn trailing_comma_is_removed() {
        let raw = fenced(r#"[{"question": "Q1", "answer": "A1"},]"#);
        let pairs = extract_question_answers(&raw).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn repair_is_idempotent_on_valid_json() {
        let valid = r#"[{"question": "Q \"quoted\"", "answer": "line\nbreak \\ slash"}]"#;
        let once = repair_json(valid);
        let twice = repair_json(&once);
        let parsed_once: Value = serde_json::from_str(&once).unwrap();
        let parsed_twice: Value = serde_json::from_str(&twice).unwrap();
        assert_eq!(parsed_once, parsed_twice);
    }

    #[test]
    fn valid_json_survives_repair_unchanged_in_value() {
        let valid = r#"[{"question": "Q1", "answer": "A1"}]"#;
        let repaired = repair_json(valid);
        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed[0]["answer"], "A1");
    }

    #[test]
    fn explanation_placeholders_when_no_json_at_all() {
        let result = extract_concept_explanation("I had trouble with that request.");
        assert_eq!(result.title, FALLBACK_TITLE);
        assert_eq!(result.explanation, FALLBACK_EXPLANATION);
    }

    #[test]
    fn explanation_embedded_in_prose_unescapes_newlines() {
        let raw = r#"Here is the result: {"title": "X", "explanation": "Y\nZ"} hope it helps"#;
        let result = extract_concept_explanation(raw);
        assert_eq!(result.title, "X");
        assert_eq!(result.explanation, "Y\nZ");
    }

    #[test]
    fn explanation_from_fenced_block() {
        let raw = fenced(r#"{"title": "Closures", "explanation": "A closure captures."}"#);
        let result = extract_concept_explanation(&raw);
        assert_eq!(result.title, "Closures");
        assert_eq!(result.explanation, "A closure captures.");
    }

    #[test]
    fn explanation_direct_object_parse() {
        let raw = r#"  {"title": "Traits", "explanation": "Shared behaviour."}  "#;
        let result = extract_concept_explanation(raw);
        assert_eq!(result.title, "Traits");
    }

    #[test]
    fn explanation_single_quoted_variant() {
        let raw = "'title': 'Lifetimes' and 'explanation': 'Scopes of validity',";
        let result = extract_concept_explanation(raw);
        assert_eq!(result.title, "Lifetimes");
        assert_eq!(result.explanation, "Scopes of validity");
    }

    #[test]
    fn explanation_title_only_falls_back_for_body() {
        let raw = r#"something "title": "Partial" and no body here"#;
        let result = extract_concept_explanation(raw);
        assert_eq!(result.title, "Partial");
        assert_eq!(result.explanation, FALLBACK_EXPLANATION);
    }

    #[test]
    fn manual_scan_handles_escaped_quotes_inside_value() {
        // Unparseable as JSON (no closing brace), keys findable by scan only.
        let raw = "```json\n{\"TITLE\": \"Generics\", \"EXPLANATION\": \"use \\\"T\\\" freely\"\n```";
        let result = extract_concept_explanation(raw);
        assert_eq!(result.explanation, "use \"T\" freely");
    }

    #[test]
    fn manual_scan_decodes_escapes_as_encountered() {
        let cleaned = r#"{"explanation": "a\nb\tc\\d\qe"}"#;
        let start = value_start(cleaned, "\"explanation\"").unwrap();
        assert_eq!(decode_quoted_content(cleaned, start), "a\nb\tc\\dqe");
    }
}
