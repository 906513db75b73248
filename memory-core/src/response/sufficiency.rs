//! Judging whether retrieved context is grounded and complete enough to
//! answer a question from, without generating an answer first.

use serde::Deserialize;

/// The sufficiency judge's verdict on one retrieval iteration's context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SufficiencyVerdict {
    /// Whether the retrieved context is grounded and complete enough to
    /// answer the question from.
    pub sufficient: bool,
    /// What the judge reports as missing when `sufficient` is `false`,
    /// used to compose the next iteration's refined query. Empty when
    /// sufficient.
    pub missing_info: String,
    /// The judge's confidence in this verdict, in `[0, 1]`.
    pub confidence: f64,
}

/// Parse a sufficiency verdict from the judge LLM's raw output.
///
/// Tries a strict JSON parse first. On failure, falls back to a resilient
/// extraction: close an unterminated string/brace if the JSON was cut
/// off, then fall back further to a regex-driven field scan. As a last
/// resort, applies a conservative heuristic (treat the context as
/// sufficient only if the judge's raw text contains an affirmative
/// marker) rather than aborting the response loop over malformed judge
/// output.
#[must_use]
pub fn parse_verdict(raw: &str) -> SufficiencyVerdict {
    if let Ok(verdict) = serde_json::from_str::<SufficiencyVerdict>(raw) {
        return verdict;
    }

    if let Some(repaired) = repair_json(raw) {
        if let Ok(verdict) = serde_json::from_str::<SufficiencyVerdict>(&repaired) {
            return verdict;
        }
    }

    if let Some(verdict) = extract_fields(raw) {
        return verdict;
    }

    heuristic_verdict(raw)
}

/// Attempt to repair truncated or slightly malformed JSON by balancing
/// unterminated strings and braces. Best-effort: returns `None` if the
/// input does not look like JSON at all.
fn repair_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let start = trimmed.find('{')?;
    let mut repaired = trimmed[start..].to_string();

    let quote_count = repaired.matches('"').count();
    if quote_count % 2 != 0 {
        repaired.push('"');
    }

    let open_braces = repaired.matches('{').count();
    let close_braces = repaired.matches('}').count();
    for _ in close_braces..open_braces {
        repaired.push('}');
    }

    Some(repaired)
}

/// Regex-driven field extraction used when the judge's output is not
/// valid JSON even after repair (e.g. it wrote prose with an embedded
/// verdict).
fn extract_fields(raw: &str) -> Option<SufficiencyVerdict> {
    let sufficient_re = regex::Regex::new(r#""?sufficient"?\s*[:=]\s*(true|false)"#).ok()?;
    let missing_info_re = regex::Regex::new(r#""?missing_info"?\s*[:=]\s*"([^"]*)"#).ok()?;
    let confidence_re = regex::Regex::new(r#""?confidence"?\s*[:=]\s*([0-9]*\.?[0-9]+)"#).ok()?;

    let sufficient = sufficient_re
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str() == "true")?;
    let missing_info = missing_info_re
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or_else(|| "extracted from malformed judge output".to_string(), |m| m.as_str().to_string());
    let confidence = confidence_re
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    Some(SufficiencyVerdict { sufficient, missing_info, confidence })
}

fn heuristic_verdict(raw: &str) -> SufficiencyVerdict {
    let lower = raw.to_lowercase();
    let sufficient = lower.contains("sufficient") && !lower.contains("insufficient") && !lower.contains("not sufficient");
    if sufficient {
        SufficiencyVerdict { sufficient: true, missing_info: String::new(), confidence: 0.5 }
    } else {
        SufficiencyVerdict {
            sufficient: false,
            missing_info: "heuristic fallback: judge output was not parseable JSON".to_string(),
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json() {
        let verdict = parse_verdict(r#"{"sufficient": true, "missing_info": "", "confidence": 0.9}"#);
        assert!(verdict.sufficient);
        assert_eq!(verdict.missing_info, "");
        assert!((verdict.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn repairs_truncated_json_missing_closing_brace_and_quote() {
        let verdict = parse_verdict(r#"{"sufficient": false, "missing_info": "missing date", "confidence": 0.3"#);
        assert!(!verdict.sufficient);
        assert_eq!(verdict.missing_info, "missing date");
    }

    #[test]
    fn falls_back_to_field_extraction_on_non_json_prose() {
        let verdict = parse_verdict("Verdict: sufficient=true confidence=0.8 because the question was answered directly.");
        assert!(verdict.sufficient);
        assert!((verdict.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_heuristic_when_nothing_else_parses() {
        let verdict = parse_verdict("I believe this answer is sufficient for the user's needs.");
        assert!(verdict.sufficient);
        assert!((verdict.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn heuristic_treats_negation_as_insufficient_with_zero_confidence() {
        let verdict = parse_verdict("This answer is not sufficient and needs more detail.");
        assert!(!verdict.sufficient);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.missing_info.contains("heuristic"));
    }
}
