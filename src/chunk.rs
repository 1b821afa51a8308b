//! Word-aware splitting of response text into chat-sized segments.
//!
//! The first segment shares its line with the `[SERVER][name]:` header, so it
//! gets its own, usually smaller, budget. Lengths are counted in `char`s.

/// Split `text` into segments of whole words.
///
/// Words are taken greedily: a word joins the current segment while the
/// segment plus a separating space plus the word still fits the budget for
/// the segment's position. A word longer than its budget becomes a segment of
/// its own. Whitespace runs collapse to single spaces; blank input yields no
/// segments.
pub fn split(text: &str, first_budget: usize, continuation_budget: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let budget = if segments.is_empty() {
            first_budget
        } else {
            continuation_budget
        };
        let word_len = word.chars().count();
        let separator = usize::from(current_len > 0);

        if current_len > 0 && current_len + separator + word_len > budget {
            segments.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if current_len > 0 {
        segments.push(current);
    }

    for (i, segment) in segments.iter().enumerate() {
        let budget = if i == 0 { first_budget } else { continuation_budget };
        tracing::debug!(
            segment = i + 1,
            len = segment.chars().count(),
            budget,
            "segment analysis"
        );
    }
    segments
}
