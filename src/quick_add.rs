//! Parser for Todoist quick-add shorthand.
//!
//! `Buy milk #Shopping @errand p1 tomorrow at 5pm` becomes content
//! `Buy milk`, project name `Shopping`, label `errand`, priority 4 and due
//! string `tomorrow at 5pm`. Project names are resolved to IDs by the caller.

use std::sync::LazyLock;

use regex::Regex;

// Literal patterns; compiling them cannot fail.
static PROJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").expect("project pattern"));
static LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").expect("label pattern"));
static PRIORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bp([1-4])\b").expect("priority pattern"));

const DAY_WORDS: &[&str] = &[
    "today", "tonight", "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickAdd {
    pub content: String,
    /// Name after the first `#`, unresolved.
    pub project_name: Option<String>,
    pub labels: Vec<String>,
    /// API priority: `p1` maps to 4 (urgent), `p4` to 1 (normal).
    pub priority: Option<u8>,
    pub due_string: Option<String>,
}

pub fn parse(input: &str) -> QuickAdd {
    let project_name = PROJECT.captures(input).map(|c| c[1].to_string());
    let text = PROJECT.replace_all(input, "");

    let labels = LABEL
        .captures_iter(&text)
        .map(|c| c[1].to_string())
        .collect();
    let text = LABEL.replace_all(&text, "");

    let priority = PRIORITY
        .captures(&text)
        .and_then(|c| c[1].parse::<u8>().ok())
        .map(|p| 5 - p);
    let text = PRIORITY.replace_all(&text, "");

    let words: Vec<&str> = text.split_whitespace().collect();
    let (content, due_string) = match date_start(&words) {
        Some(start) => (words[..start].join(" "), Some(words[start..].join(" "))),
        None => (words.join(" "), None),
    };

    QuickAdd {
        content,
        project_name,
        labels,
        priority,
        due_string,
    }
}

/// Index of the last word that opens a date phrase; everything from there to
/// the end is the due string.
fn date_start(words: &[&str]) -> Option<usize> {
    (0..words.len()).rev().find_map(|i| {
        let word = alphabetic_prefix(words[i]);
        if DAY_WORDS.contains(&word.as_str()) || is_month(&word) {
            return Some(i);
        }
        let after_next = i > 0 && alphabetic_prefix(words[i - 1]) == "next";
        (after_next && matches!(word.as_str(), "week" | "month")).then(|| i - 1)
    })
}

fn alphabetic_prefix(word: &str) -> String {
    word.chars()
        .take_while(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `jan`, `sept` and `january` all count.
fn is_month(word: &str) -> bool {
    word.len() >= 3 && MONTHS.iter().any(|m| m.starts_with(word))
}
