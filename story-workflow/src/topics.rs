//! Topic menus.
//!
//! A menu is one message of numbered blocks joined by [`TOPIC_DELIMITER`]. Selection re-splits
//! the rendered text, so the message the operator clicked is the source of truth for
//! index → topic. Topics are collapsed to one paragraph at render time so the delimiter cannot
//! occur inside a block.

pub const TOPIC_DELIMITER: &str = "\n\n";

/// Menus never offer more than this many topics.
pub const MAX_TOPICS: usize = 5;

/// Joins the topic's non-empty lines into a single paragraph.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders up to [`MAX_TOPICS`] topics as `1. ...`, `2. ...` blocks.
pub fn render_topics(topics: &[String]) -> String {
    topics
        .iter()
        .map(|t| normalize_topic(t))
        .filter(|t| !t.is_empty())
        .take(MAX_TOPICS)
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join(TOPIC_DELIMITER)
}

fn blocks(rendered: &str) -> impl Iterator<Item = &str> {
    rendered
        .split(TOPIC_DELIMITER)
        .map(str::trim)
        .filter(|b| !b.is_empty())
}

/// Number of topic blocks in a rendered menu.
pub fn topic_count(rendered: &str) -> usize {
    blocks(rendered).count()
}

/// Removes a leading `1.`, `2)`, `-` or `•` marker. Numbers longer than two digits are kept,
/// so a topic starting with a year is not mangled.
pub fn strip_list_marker(block: &str) -> &str {
    let block = block.trim();
    for bullet in ["- ", "• ", "* "] {
        if let Some(rest) = block.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    let digits = block.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=2).contains(&digits) {
        let rest = &block[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    block
}

/// Text of the 1-based `index`-th block with its list marker removed; None when out of range.
pub fn parse_topic(rendered: &str, index: usize) -> Option<String> {
    if index == 0 {
        return None;
    }
    blocks(rendered)
        .nth(index - 1)
        .map(|b| strip_list_marker(b).to_string())
        .filter(|t| !t.is_empty())
}
