//! Whitespace token helpers for the text form of QTP

/// Splits a text line into tokens on any run of whitespace
pub fn split_text_tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Joins tokens with single tabs, the separator used by text-format writers
pub fn join_text_tokens(tokens: &[String]) -> String {
    tokens.join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let tokens = split_text_tokens("  type=qtp\t+TICKER_DATA \n opt=hs ");
        assert_eq!(tokens, ["type=qtp", "+TICKER_DATA", "opt=hs"]);
        assert_eq!(join_text_tokens(&tokens), "type=qtp\t+TICKER_DATA\topt=hs");
        assert!(split_text_tokens("   ").is_empty());
    }
}
