//! Turns a query and its flags into a compiled regular expression.

use regex::{Regex, RegexBuilder};

use crate::options::SearchOptions;

/// Compiles the query described by `options`.
///
/// Returns `Ok(None)` for an empty query. Literal queries are escaped before
/// compilation.
pub fn compile(options: &SearchOptions) -> Result<Option<Regex>, regex::Error> {
    if options.query.is_empty() {
        return Ok(None);
    }

    let source = pattern_source(options);
    let regex = RegexBuilder::new(&source)
        .case_insensitive(!options.match_case)
        .multi_line(true)
        .build()?;
    Ok(Some(regex))
}

/// Builds the regex source text for `options` without compiling it.
pub fn pattern_source(options: &SearchOptions) -> String {
    let body = if options.is_regex {
        options.query.clone()
    } else {
        regex::escape(&options.query)
    };
    if options.whole_word {
        whole_word(&body)
    } else {
        body
    }
}

/// Requires a non-word character (or the pool edge) on both sides of the
/// match. Half boundaries only look outside the match, so queries that start
/// or end with punctuation still work in both literal and regex mode.
fn whole_word(body: &str) -> String {
    format!(r"\b{{start-half}}(?:{})\b{{end-half}}", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        let opts = SearchOptions::new("");
        assert!(compile(&opts).unwrap().is_none());
    }

    #[test]
    fn test_literal_is_escaped() {
        let opts = SearchOptions::literal("a.b*");
        assert_eq!(pattern_source(&opts), r"a\.b\*");
        let re = compile(&opts).unwrap().unwrap();
        assert!(re.is_match("xa.b*y"));
        assert!(!re.is_match("aXbbb"));
    }

    #[test]
    fn test_whole_word_sources() {
        let opts = SearchOptions::literal("cat").with_whole_word(true);
        assert_eq!(pattern_source(&opts), r"\b{start-half}(?:cat)\b{end-half}");

        let opts = SearchOptions::new("a|b").with_whole_word(true);
        assert_eq!(pattern_source(&opts), r"\b{start-half}(?:a|b)\b{end-half}");
    }

    #[test]
    fn test_whole_word_punctuation_edges() {
        let literal = compile(&SearchOptions::literal("(x)").with_whole_word(true))
            .unwrap()
            .unwrap();
        let regex = compile(&SearchOptions::new(r"\(x\)").with_whole_word(true))
            .unwrap()
            .unwrap();
        for re in [&literal, &regex] {
            let found: Vec<(usize, usize)> =
                re.find_iter("f (x) y").map(|m| (m.start(), m.end())).collect();
            assert_eq!(found, vec![(2, 5)]);
            assert!(!re.is_match("f(x)y"));
        }

        let cat = compile(&SearchOptions::new("ca.").with_whole_word(true))
            .unwrap()
            .unwrap();
        assert!(!cat.is_match("category"));
        assert!(cat.is_match("a cat."));
    }

    #[test]
    fn test_case_insensitive() {
        let opts = SearchOptions::literal("hello").with_match_case(false);
        let re = compile(&opts).unwrap().unwrap();
        assert!(re.is_match("HeLLo"));
    }

    #[test]
    fn test_invalid_regex() {
        let opts = SearchOptions::new("(unclosed");
        assert!(compile(&opts).is_err());
    }
}
