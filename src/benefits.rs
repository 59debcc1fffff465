//! Benefit sentence extraction from raw product descriptions.
//!
//! Descriptions scraped from product pages are often hard-wrapped source
//! text. This module reconstructs sentence-like units (line merge, then
//! oversized-line splitting) and keeps the first few that pass a length
//! filter. The policy is "first five clean-enough sentences", not "five
//! best sentences".

const MAX_BENEFITS: usize = 5;
const MIN_BENEFIT_CHARS: usize = 8;
const MAX_BENEFIT_CHARS: usize = 160;
const SPLIT_THRESHOLD_CHARS: usize = 140;

/// Turn a raw description blob into an ordered list of benefit sentences.
pub fn split_benefits(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }
    let lines = merge_lines(text);
    let sentences = expand_sentences(lines);
    pick_benefits(sentences, MAX_BENEFITS)
}

/// Re-join lines that look like wrapped continuations of the previous one:
/// the previous line does not end a sentence and the current line starts
/// with a lowercase letter.
fn merge_lines(text: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for line in text.replace('\r', "\n").split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(prev) if !ends_sentence(prev) && starts_lowercase(line) => {
                prev.push(' ');
                prev.push_str(line);
            }
            _ => merged.push(line.to_string()),
        }
    }
    merged
}

fn ends_sentence(line: &str) -> bool {
    matches!(line.chars().last(), Some('.') | Some('!') | Some('?'))
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}

/// Oversized lines are split at sentence boundaries; shorter lines pass
/// through unchanged.
fn expand_sentences(lines: Vec<String>) -> Vec<String> {
    let mut sentences = Vec::new();
    for line in lines {
        if line.chars().count() > SPLIT_THRESHOLD_CHARS {
            sentences.extend(split_at_terminators(&line));
        } else {
            sentences.push(line);
        }
    }
    sentences
}

/// Split at terminator-then-whitespace boundaries, keeping the terminator
/// attached to the preceding fragment.
fn split_at_terminators(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;
    for (idx, ch) in line.char_indices() {
        if prev_was_terminator && ch.is_whitespace() {
            let piece = line[start..idx].trim();
            if !piece.is_empty() {
                parts.push(piece.to_string());
            }
            start = idx;
        }
        prev_was_terminator = matches!(ch, '.' | '!' | '?');
    }
    let tail = line[start..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }
    parts
}

/// Keep candidates whose trimmed length is in bounds, in input order,
/// stopping at the cap. Out-of-bound candidates are dropped, not truncated.
fn pick_benefits(candidates: Vec<String>, limit: usize) -> Vec<String> {
    let mut kept = Vec::new();
    for candidate in candidates {
        let piece = candidate.trim();
        let chars = piece.chars().count();
        if chars < MIN_BENEFIT_CHARS || chars > MAX_BENEFIT_CHARS {
            continue;
        }
        kept.push(piece.to_string());
        if kept.len() >= limit {
            break;
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_wrapped_lines() {
        let text = "Line one\nline two continues here.\n\nBullet A\nBullet B";
        assert_eq!(
            split_benefits(text),
            vec![
                "Line one line two continues here.",
                "Bullet A",
                "Bullet B"
            ]
        );
    }

    #[test]
    fn test_uppercase_start_is_a_new_line() {
        // "continues here" starts lowercase and merges; "Bullet A" does not.
        let merged = merge_lines("Intro text\ncontinues here\nBullet A");
        assert_eq!(merged, vec!["Intro text continues here", "Bullet A"]);
    }

    #[test]
    fn test_terminated_line_is_not_merged() {
        let merged = merge_lines("First sentence.\nsecond line");
        assert_eq!(merged, vec!["First sentence.", "second line"]);
    }

    #[test]
    fn test_long_line_is_split_into_sentences() {
        let long = format!(
            "{}. {}! {}?",
            "a".repeat(60),
            "b".repeat(60),
            "c".repeat(60)
        );
        let benefits = split_benefits(&long);
        assert_eq!(benefits.len(), 3);
        assert!(benefits[0].ends_with('.'));
        assert!(benefits[1].ends_with('!'));
        assert!(benefits[2].ends_with('?'));
    }

    #[test]
    fn test_length_bounds_drop_candidates() {
        let text = format!("short\nThis one is fine.\n{}", "x".repeat(200));
        assert_eq!(split_benefits(&text), vec!["This one is fine."]);
    }

    #[test]
    fn test_capped_at_five() {
        let text = (1..=8)
            .map(|i| format!("Benefit number {i}."))
            .collect::<Vec<_>>()
            .join("\n");
        let benefits = split_benefits(&text);
        assert_eq!(benefits.len(), 5);
        assert_eq!(benefits[0], "Benefit number 1.");
        assert_eq!(benefits[4], "Benefit number 5.");
    }

    #[test]
    fn test_empty_description() {
        assert!(split_benefits("").is_empty());
        assert!(split_benefits("   \n\n  ").is_empty());
    }
}
