//! Sanitizing and ordering of agent candidates.

use std::collections::HashSet;
use std::sync::OnceLock;

use agent::CandidateOutput;
use regex::Regex;

/// Commands that abandon a proof instead of advancing it.
fn abandon_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(?:sorry|oops)\b").expect("static regex"))
}

/// Whether `command` contains `sorry` or `oops` as a whole word.
pub fn is_abandoning(command: &str) -> bool {
    abandon_pattern().is_match(command.trim())
}

/// Drop abandoning commands and trimmed duplicates, keeping first occurrences.
///
/// Kept candidates are returned untouched and in input order.
pub fn filter_agent_outputs(outputs: Vec<CandidateOutput>) -> Vec<CandidateOutput> {
    let mut seen: HashSet<String> = HashSet::with_capacity(outputs.len());
    outputs
        .into_iter()
        .filter(|output| {
            let trimmed = output.command.trim();
            !abandon_pattern().is_match(trimmed) && seen.insert(trimmed.to_string())
        })
        .collect()
}

/// Stable sort by descending logit. Unset logits (`+inf`) come first.
pub fn sort_by_confidence(outputs: &mut [CandidateOutput]) {
    outputs.sort_by(|a, b| b.logit.total_cmp(&a.logit));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(command: &str, logit: f64) -> CandidateOutput {
        CandidateOutput::with_logit(command, logit)
    }

    fn commands(outputs: &[CandidateOutput]) -> Vec<&str> {
        outputs.iter().map(|o| o.command.as_str()).collect()
    }

    #[test]
    fn test_filter_example() {
        let outputs = vec![
            cand("by auto", 1.0),
            cand(" sorry", 2.0),
            cand("by auto", 3.0),
            cand("oops ", 4.0),
        ];
        let kept = filter_agent_outputs(outputs);
        assert_eq!(commands(&kept), vec!["by auto"]);
        assert!((kept[0].logit - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_whole_word_only() {
        assert!(is_abandoning("sorry"));
        assert!(is_abandoning("  apply simp sorry"));
        assert!(is_abandoning("(oops)"));
        assert!(!is_abandoning("sorry_lemma"));
        assert!(!is_abandoning("by (simp add: oopsla_def)"));
        assert!(!is_abandoning("apply (rule unsorry)"));
    }

    #[test]
    fn test_duplicates_compare_trimmed() {
        let outputs = vec![
            cand("  by simp", 0.1),
            cand("by simp\n", 0.9),
            cand("by blast", 0.5),
        ];
        let kept = filter_agent_outputs(outputs);
        assert_eq!(commands(&kept), vec!["  by simp", "by blast"]);
    }

    #[test]
    fn test_filter_empty() {
        assert!(filter_agent_outputs(vec![]).is_empty());
    }

    #[test]
    fn test_sort_descending_stable() {
        let mut outputs = vec![
            cand("a", 0.5),
            cand("b", 2.0),
            cand("c", 0.5),
            CandidateOutput::new("d"),
            cand("e", -1.0),
        ];
        sort_by_confidence(&mut outputs);
        assert_eq!(commands(&outputs), vec!["d", "b", "a", "c", "e"]);
    }
}
