//! A module implementing lexical analysis (tokenization) for the command line.
//!
//! Words are separated by runs of spaces, tabs and newlines. There is no
//! quoting or escaping: quotes and backslashes are ordinary characters.

use std::collections::TryReserveError;

/// Maximum number of tokens kept from a single line unless configured otherwise.
pub const DEFAULT_MAX_TOKENS: usize = 64;

const DELIMITERS: [char; 3] = [' ', '\t', '\n'];

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    /// Memory for a token could not be allocated.
    #[error("out of memory while splitting the line into words")]
    OutOfMemory(#[from] TryReserveError),
}

/// Splits `line` into words, keeping at most [`DEFAULT_MAX_TOKENS`] of them.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    tokenize_with_limit(line, DEFAULT_MAX_TOKENS)
}

/// Splits `line` into words, keeping at most `max_tokens` of them.
///
/// Words past the limit are dropped without an error. An empty or
/// whitespace-only line yields an empty vector.
pub fn tokenize_with_limit(line: &str, max_tokens: usize) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut words = line.split(DELIMITERS).filter(|w| !w.is_empty());

    for word in words.by_ref().take(max_tokens) {
        tokens.try_reserve(1)?;
        tokens.push(copy_word(word)?);
    }

    let dropped = words.count();
    if dropped > 0 {
        log::debug!("token limit {max_tokens} reached, dropped {dropped} word(s)");
    }

    Ok(tokens)
}

fn copy_word(word: &str) -> Result<String, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(word.len())?;
    owned.push_str(word);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_lines_have_no_tokens() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t \n").unwrap().is_empty());
    }

    #[test]
    fn splits_on_runs_of_blanks() {
        let tokens = tokenize("  ls\t-l   /tmp\n").unwrap();
        assert_eq!(tokens, ["ls", "-l", "/tmp"]);
    }

    #[test]
    fn quotes_and_backslashes_are_plain_characters() {
        let tokens = tokenize(r#"echo "a b" c\ d"#).unwrap();
        assert_eq!(tokens, ["echo", "\"a", "b\"", "c\\", "d"]);
    }

    #[test]
    fn carriage_return_is_not_a_delimiter() {
        let tokens = tokenize("echo hi\r").unwrap();
        assert_eq!(tokens, ["echo", "hi\r"]);
    }

    #[test]
    fn words_past_the_limit_are_dropped() {
        let line = (0..70).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let tokens = tokenize(&line).unwrap();
        assert_eq!(tokens.len(), DEFAULT_MAX_TOKENS);
        assert_eq!(tokens.last().map(String::as_str), Some("63"));

        let tokens = tokenize_with_limit("a b c d", 2).unwrap();
        assert_eq!(tokens, ["a", "b"]);
    }
}
