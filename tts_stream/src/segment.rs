//! Splits utterance text into an ordered sequence of speakable chunks.
//!
//! The first chunk is kept deliberately small so the first audio frame
//! comes back quickly; later chunks favor natural prosody with the
//! larger standard budget. Chunk order is the sole ordering contract
//! the rest of the pipeline depends on.

/// A contiguous, order-preserving slice of the utterance, sized for
/// sequential synthesis. Always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Sentence-ending punctuation, the primary split boundary.
const SENTENCE_PUNCT: &[char] = &['.', '!', '?'];
/// Clause punctuation, used to re-split oversized sentences.
const CLAUSE_PUNCT: &[char] = &[',', ';'];

/// Segment `text` into chunks of at most `max_chunk_chars` characters,
/// with the first chunk reduced to at most `first_chunk_chars` where a
/// word-aligned split allows it. A single word longer than the budget
/// is never split and comes through as one oversized chunk.
///
/// Whitespace-only or punctuation-only input yields an empty sequence;
/// that is a normal outcome, not an error.
pub fn segment_text(text: &str, max_chunk_chars: usize, first_chunk_chars: usize) -> Vec<Chunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Non-speakable pieces are dropped before the first-chunk
    // reduction so the reduction sees the chunk that will actually be
    // spoken first.
    let mut pieces = speakable(segment_with_budget(trimmed, max_chunk_chars));

    // First-chunk reduction: peel a short word-aligned prefix off the
    // front and re-segment the remainder with the standard budget.
    if pieces
        .first()
        .is_some_and(|head| char_len(head) > first_chunk_chars)
    {
        let head = pieces.remove(0);
        let (prefix, remainder) = peel_prefix(&head, first_chunk_chars);
        let mut rebuilt = vec![prefix];
        rebuilt.extend(segment_with_budget(&remainder, max_chunk_chars));
        rebuilt.extend(pieces);
        pieces = speakable(rebuilt);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Keep only trimmed pieces that carry speakable content.
fn speakable(pieces: Vec<String>) -> Vec<String> {
    pieces
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| p.chars().any(char::is_alphanumeric))
        .collect()
}

/// Sentence split, clause re-split, then greedy word packing for
/// anything still over budget. No first-chunk handling here.
fn segment_with_budget(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    for sentence in split_after(text, SENTENCE_PUNCT) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if char_len(sentence) <= max_chunk_chars {
            out.push(sentence.to_string());
            continue;
        }
        for clause in split_after(sentence, CLAUSE_PUNCT) {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            if char_len(clause) <= max_chunk_chars {
                out.push(clause.to_string());
            } else {
                out.extend(pack_words(clause, max_chunk_chars));
            }
        }
    }
    out
}

/// Split `text` after any of `boundaries` when the boundary character
/// is followed by whitespace. The punctuation stays attached to the
/// preceding piece. Commas inside numbers ("1,000") are left alone
/// since no whitespace follows them.
fn split_after<'a>(text: &'a str, boundaries: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if boundaries.contains(&c) {
            if let Some(&(_, next)) = iter.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    parts.push(&text[start..end]);
                    start = end;
                }
            }
        }
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

/// Greedily pack whitespace-delimited words into lines of at most
/// `max_chars` characters. A word longer than the budget becomes its
/// own oversized line; audio correctness wins over the budget.
fn pack_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;
    for word in text.split_whitespace() {
        let word_len = char_len(word);
        if line_len == 0 {
            line.push_str(word);
            line_len = word_len;
        } else if line_len + 1 + word_len <= max_chars {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + word_len;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
            line_len = word_len;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Peel a word-aligned prefix of at most `max_chars` characters off the
/// front of `text`. The first word is always taken whole even if it
/// alone exceeds the budget. Returns `(prefix, remainder)`.
fn peel_prefix(text: &str, max_chars: usize) -> (String, String) {
    let mut words = text.split_whitespace();
    let mut prefix = match words.next() {
        Some(w) => w.to_string(),
        None => return (String::new(), String::new()),
    };
    let mut prefix_len = char_len(&prefix);
    let mut remainder_words: Vec<&str> = Vec::new();
    for word in words {
        let word_len = char_len(word);
        if remainder_words.is_empty() && prefix_len + 1 + word_len <= max_chars {
            prefix.push(' ');
            prefix.push_str(word);
            prefix_len += 1 + word_len;
        } else {
            remainder_words.push(word);
        }
    }
    (prefix, remainder_words.join(" "))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 60;
    const FIRST: usize = 35;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_and_whitespace_input_yield_no_chunks() {
        assert!(segment_text("", MAX, FIRST).is_empty());
        assert!(segment_text("   \n\t ", MAX, FIRST).is_empty());
    }

    #[test]
    fn punctuation_only_input_yields_no_chunks() {
        assert!(segment_text("...", MAX, FIRST).is_empty());
        assert!(segment_text("?! ?", MAX, FIRST).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = segment_text("Hallo Welt.", MAX, FIRST);
        assert_eq!(texts(&chunks), vec!["Hallo Welt."]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn sentences_become_separate_chunks() {
        let chunks = segment_text(
            "Hallo, wie geht es dir? Ich freue mich, dich zu sehen!",
            MAX,
            FIRST,
        );
        assert_eq!(
            texts(&chunks),
            vec!["Hallo, wie geht es dir?", "Ich freue mich, dich zu sehen!"]
        );
    }

    #[test]
    fn chunk_indices_are_sequential_from_zero() {
        let chunks = segment_text("Eins. Zwei. Drei. Vier.", MAX, FIRST);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn oversized_sentence_splits_at_clause_punctuation() {
        let text = "Das ist ein sehr langer Satz mit vielen Woertern, der unbedingt an dieser Stelle geteilt werden muss";
        let chunks = segment_text(text, MAX, usize::MAX);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].text.ends_with(','));
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= MAX, "over budget: {:?}", chunk);
        }
    }

    #[test]
    fn oversized_clause_falls_back_to_word_packing() {
        let text = "eins zwei drei vier fuenf sechs sieben acht neun zehn elf zwoelf dreizehn vierzehn fuenfzehn sechzehn";
        let chunks = segment_text(text, 30, usize::MAX);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 30);
            // Words are never split
            for word in chunk.text.split_whitespace() {
                assert!(text.contains(word));
            }
        }
    }

    #[test]
    fn single_long_word_is_kept_whole() {
        let word = "a".repeat(200);
        let chunks = segment_text(&word, MAX, FIRST);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, word);
    }

    #[test]
    fn first_chunk_obeys_the_smaller_budget() {
        let text = "Dieser erste Satz ist laenger als das kleine Budget des ersten Chunks erlaubt.";
        let chunks = segment_text(text, MAX, FIRST);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].text.chars().count() <= FIRST);
        for chunk in &chunks[1..] {
            assert!(chunk.text.chars().count() <= MAX);
        }
    }

    #[test]
    fn leading_punctuation_does_not_defeat_first_chunk_reduction() {
        let text = "!!! Dieser erste Satz ist deutlich laenger als das Budget";
        let chunks = segment_text(text, MAX, FIRST);
        assert!(chunks.len() >= 2);
        assert!(
            chunks[0].text.chars().count() <= FIRST,
            "first chunk over budget: {:?}",
            chunks[0]
        );
        for chunk in &chunks[1..] {
            assert!(chunk.text.chars().count() <= MAX);
        }
    }

    #[test]
    fn first_chunk_reduction_is_skipped_when_already_small() {
        let chunks = segment_text("Kurzer Satz. Und noch ein etwas laengerer zweiter Satz hier.", MAX, FIRST);
        assert_eq!(chunks[0].text, "Kurzer Satz.");
    }

    #[test]
    fn concatenation_reproduces_the_normalized_input() {
        let inputs = [
            "Hallo, wie geht es dir? Ich freue mich, dich zu sehen!",
            "Ein Satz ohne jede Unterteilung",
            "Viele   Leerzeichen    zwischen Woertern. Und\nZeilenumbrueche!",
            "Dieser erste Satz ist laenger als das kleine Budget des ersten Chunks erlaubt, und es geht noch weiter.",
        ];
        for input in inputs {
            let chunks = segment_text(input, MAX, FIRST);
            let rebuilt = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(normalize_ws(&rebuilt), normalize_ws(input.trim()), "input: {input:?}");
        }
    }

    #[test]
    fn number_commas_do_not_split() {
        let chunks = segment_text("Der Preis betraegt 1,5 Millionen Euro heute.", MAX, FIRST);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("1,5"));
    }

    #[test]
    fn unicode_text_splits_on_char_boundaries() {
        let text = "Schöne Grüße aus Köln! Die Straße ist äußerst ruhig, weiß überall.";
        let chunks = segment_text(text, 30, 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }
}
