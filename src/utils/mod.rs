use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"'`]+"#).expect("url pattern is valid")
    })
}

/// All http(s) URLs in `text`, in order of appearance, trailing punctuation trimmed.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']'))
                .to_string()
        })
        .filter(|url| url.len() > "https://".len())
        .collect()
}

/// Human readable size in megabytes, `"Unknown"` when absent or zero.
pub fn format_size_label(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b > 0 => format!("{:.2}MB", b as f64 / (1024.0 * 1024.0)),
        _ => "Unknown".to_string(),
    }
}

/// `m:ss`, or `h:mm:ss` for anything an hour or longer.
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Escapes characters that legacy Markdown captions treat as formatting.
pub fn escape_markdown(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            '_' | '*' | '`' | '[' => vec!['\\', c],
            c => vec![c],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls() {
        let urls = extract_urls("first https://youtu.be/abc, then (https://x.com/a/status/1).");
        assert_eq!(urls, vec!["https://youtu.be/abc", "https://x.com/a/status/1"]);
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_format_size_label() {
        assert_eq!(format_size_label(Some(5 * 1024 * 1024)), "5.00MB");
        assert_eq!(format_size_label(Some(0)), "Unknown");
        assert_eq!(format_size_label(None), "Unknown");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(212), "3:32");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("my_clip *best*"), "my\\_clip \\*best\\*");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
