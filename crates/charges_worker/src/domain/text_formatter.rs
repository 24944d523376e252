//! Case normalisation for the free text carried by charge deltas.
//!
//! Delta text arrives in upper case. The three formatters rebuild a readable
//! casing while keeping the original whitespace intact:
//!
//! - [`format_as_entity_name`] title cases names, keeping short joining words
//!   in lower case and company suffixes such as `PLC` in upper case
//! - [`format_as_sentence`] lower cases everything except the first word of a
//!   sentence
//! - [`format_as_particulars`] works like a sentence but also treats `:`, `;`
//!   and line breaks as the start of a new clause
//!
//! All three leave abbreviations (`U.K.`) and mixed letter/digit tokens (`A1`)
//! in upper case, except that an entity-name word led by punctuation such as
//! `(U.K.)` is title cased. `None` maps to `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static ENTITY_SUFFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "LTD", "PLC", "LLP", "LP", "LLC", "CIC", "CIO", "UK", "USA", "NV", "BV", "AG", "II",
        "III", "IV",
    ]
    .into_iter()
    .collect()
});

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "A", "AN", "AND", "AS", "AT", "BUT", "BY", "EN", "FOR", "FROM", "IF", "IN", "INTO", "NOR",
        "OF", "ON", "OR", "PER", "THE", "TO", "UPON", "VIA", "VS", "WITH",
    ]
    .into_iter()
    .collect()
});

static ABBREVIATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Lu}(?:\.\p{Lu})+$").expect("abbreviation pattern"));

pub fn format_as_entity_name(text: Option<&str>) -> Option<String> {
    text.map(|t| format_words(t, entity_word))
}

pub fn format_as_sentence(text: Option<&str>) -> Option<String> {
    text.map(|t| format_words(t, |word, pos| sentence_word(word, pos.sentence_start)))
}

pub fn format_as_particulars(text: Option<&str>) -> Option<String> {
    text.map(|t| {
        format_words(t, |word, pos| {
            sentence_word(word, pos.sentence_start || pos.clause_start || pos.line_start)
        })
    })
}

/// Where a word sits relative to its neighbours
struct Position {
    first: bool,
    last: bool,
    /// Previous word ended with `.`, `!` or `?`
    sentence_start: bool,
    /// Previous word ended with `:` or `;`
    clause_start: bool,
    /// Whitespace before the word contained a line break
    line_start: bool,
}

/// A whitespace-free token split into leading punctuation, stem and trailing punctuation
struct Word<'a> {
    prefix: &'a str,
    stem: &'a str,
    suffix: &'a str,
}

impl<'a> Word<'a> {
    fn split(token: &'a str) -> Self {
        let start = token.find(char::is_alphanumeric);
        let end = token
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_alphanumeric())
            .map(|(i, c)| i + c.len_utf8());

        match (start, end) {
            (Some(start), Some(end)) => Word {
                prefix: &token[..start],
                stem: &token[start..end],
                suffix: &token[end..],
            },
            _ => Word {
                prefix: token,
                stem: "",
                suffix: "",
            },
        }
    }

    fn is_entity_suffix(&self) -> bool {
        ENTITY_SUFFIXES.contains(self.stem)
    }

    fn stays_upper(&self) -> bool {
        self.is_entity_suffix()
            || ABBREVIATION.is_match(self.stem)
            || (self.stem.chars().any(|c| c.is_ascii_digit())
                && self.stem.chars().any(char::is_alphabetic))
    }

    fn with_stem(&self, stem: String) -> String {
        format!("{}{}{}", self.prefix, stem, self.suffix)
    }
}

fn format_words(text: &str, format_word: impl Fn(&Word, &Position) -> String) -> String {
    let upper = text.to_uppercase();
    let segments = split_whitespace_runs(&upper);
    let word_count = segments.iter().filter(|s| !s.is_space).count();

    let mut out = String::with_capacity(upper.len());
    let mut word_index = 0;
    let mut previous: Option<&str> = None;
    let mut line_break = false;

    for segment in &segments {
        if segment.is_space {
            line_break |= segment.text.contains('\n');
            out.push_str(segment.text);
            continue;
        }

        let position = Position {
            first: word_index == 0,
            last: word_index + 1 == word_count,
            sentence_start: previous.map_or(true, |p| p.ends_with(['.', '!', '?'])),
            clause_start: previous.is_some_and(|p| p.ends_with([':', ';'])),
            line_start: line_break,
        };
        out.push_str(&format_word(&Word::split(segment.text), &position));

        previous = Some(segment.text);
        line_break = false;
        word_index += 1;
    }

    out
}

/// Rules apply in order: company suffix, punctuation-led word, stop word,
/// abbreviation or mixed token, everything else.
fn entity_word(word: &Word, position: &Position) -> String {
    if word.stem.is_empty() || word.is_entity_suffix() {
        return word.with_stem(word.stem.to_string());
    }
    if !word.prefix.is_empty() {
        return word.with_stem(title_case(word.stem));
    }
    if STOP_WORDS.contains(word.stem)
        && !position.first
        && !position.last
        && !position.clause_start
    {
        return word.with_stem(word.stem.to_lowercase());
    }
    if word.stays_upper() {
        return word.with_stem(word.stem.to_string());
    }
    word.with_stem(title_case(word.stem))
}

fn sentence_word(word: &Word, capitalise: bool) -> String {
    if word.stem.is_empty() || word.stays_upper() || word.stem == "I" {
        return word.with_stem(word.stem.to_string());
    }
    let lower = word.stem.to_lowercase();
    if capitalise {
        word.with_stem(capitalise_first(&lower))
    } else {
        word.with_stem(lower)
    }
}

/// Capitalise each hyphen or slash separated part
fn title_case(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut at_start = true;
    for c in stem.chars() {
        if at_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_start = c == '-' || c == '/';
    }
    out
}

fn capitalise_first(lower: &str) -> String {
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct Segment<'a> {
    text: &'a str,
    is_space: bool,
}

fn split_whitespace_runs(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        match current {
            Some(kind) if kind == is_space => {}
            Some(kind) => {
                segments.push(Segment {
                    text: &text[start..i],
                    is_space: kind,
                });
                start = i;
                current = Some(is_space);
            }
            None => current = Some(is_space),
        }
    }
    if let Some(kind) = current {
        segments.push(Segment {
            text: &text[start..],
            is_space: kind,
        });
    }

    segments
}
