use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"http\S+").expect("valid url pattern"))
}

fn retweet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"RT.*").expect("valid retweet pattern"))
}

/// Strip links and retweet markers from a post before scoring it.
///
/// Every `http...` run up to the next whitespace is removed, then everything
/// from a literal `RT` to the end of its line, then surrounding whitespace.
/// Inner whitespace is left alone, so `"a http://x b"` becomes `"a  b"`.
pub fn clean_text(text: &str) -> String {
    let without_urls = url_pattern().replace_all(text, "");
    let without_retweets = retweet_pattern().replace_all(&without_urls, "");
    without_retweets.trim().to_string()
}
