use std::sync::OnceLock;

use regex::Regex;

fn bold() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| Regex::new(r"(?s)\*\*(.*?)\*\*").expect("bold pattern"))
}

fn italic() -> &'static Regex {
    static ITALIC: OnceLock<Regex> = OnceLock::new();
    ITALIC.get_or_init(|| Regex::new(r"(?s)\*(.*?)\*").expect("italic pattern"))
}

fn emphasize(text: &str, strong: (&str, &str), em: (&str, &str)) -> String {
    let text = bold().replace_all(text, format!("{}${{1}}{}", strong.0, strong.1));
    italic()
        .replace_all(&text, format!("{}${{1}}{}", em.0, em.1))
        .into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// HTML fragment for a message body. Text is escaped before emphasis is
/// applied, so only the generated tags are markup.
pub fn to_html(content: &str) -> String {
    let escaped = escape_html(content).replace('\n', "<br>");
    emphasize(&escaped, ("<strong>", "</strong>"), ("<em>", "</em>"))
}

pub fn to_ansi(content: &str) -> String {
    emphasize(content, ("\x1b[1m", "\x1b[22m"), ("\x1b[3m", "\x1b[23m"))
}

pub fn to_plain(content: &str) -> String {
    emphasize(content, ("", ""), ("", ""))
}
