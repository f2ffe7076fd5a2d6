//! In-process fortune source and cow renderer.

use anyhow::{Result, bail};
use rand::seq::SliceRandom;

use crate::fortune::{ArtRenderer, TextSource};

const DEFAULT_FORTUNES: &[&str] = &[
    "A journey of a thousand miles begins with a single step.",
    "You will be fortunate in everything you put your hands to.",
    "Today is a good day to ship it.",
    "Beware of bugs in the above code; I have only proved it correct, not tried it.",
    "The best way to predict the future is to invent it.",
    "Simplicity is prerequisite for reliability.",
    "Never trust a computer you can't throw out a window.",
    "It works on my machine.",
    "There are only two hard things in computer science: cache invalidation and naming things.",
    "Moo.",
];

const COW: &str = r"        \   ^__^
         \  (oo)\_______
            (__)\       )\/\
                ||----w |
                ||     ||
";

/// Column at which the speech bubble wraps.
pub const BUBBLE_WIDTH: usize = 40;

/// Picks a message uniformly at random from a fixed list.
#[derive(Debug, Clone)]
pub struct BuiltinFortunes {
    messages: Vec<String>,
}

impl BuiltinFortunes {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn pick(&self) -> Option<String> {
        self.messages.choose(&mut rand::thread_rng()).cloned()
    }
}

impl Default for BuiltinFortunes {
    fn default() -> Self {
        Self::new(DEFAULT_FORTUNES.iter().map(|s| s.to_string()).collect())
    }
}

impl TextSource for BuiltinFortunes {
    async fn next(&self) -> Result<Vec<u8>> {
        match self.pick() {
            Some(message) => Ok(message.into_bytes()),
            None => bail!("no fortunes configured"),
        }
    }
}

/// Cowsay-style renderer.
#[derive(Debug, Clone)]
pub struct BuiltinCow {
    width: usize,
}

impl BuiltinCow {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }
}

impl Default for BuiltinCow {
    fn default() -> Self {
        Self::new(BUBBLE_WIDTH)
    }
}

impl ArtRenderer for BuiltinCow {
    async fn render(&self, text: &[u8]) -> Result<Vec<u8>> {
        // Wrapping needs characters; undecodable bytes become U+FFFD here only.
        let text = String::from_utf8_lossy(text);
        Ok(render_cow(&text, self.width).into_bytes())
    }
}

/// Draws `text` in a speech bubble above a cow.
pub fn render_cow(text: &str, width: usize) -> String {
    let lines = wrap(text, width.max(1));
    let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    out.push(' ');
    out.push_str(&"_".repeat(inner + 2));
    out.push('\n');

    let last = lines.len() - 1;
    for (i, line) in lines.iter().enumerate() {
        let (open, close) = match (i, last) {
            (_, 0) => ('<', '>'),
            (0, _) => ('/', '\\'),
            (i, last) if i == last => ('\\', '/'),
            _ => ('|', '|'),
        };
        out.push_str(&format!("{} {:<inner$} {}\n", open, line, close));
    }

    out.push(' ');
    out.push_str(&"-".repeat(inner + 2));
    out.push('\n');
    out.push_str(COW);
    out
}

/// Greedy word wrap. Line breaks in the input are kept, runs of whitespace
/// collapse to one space, and words wider than `width` are split.
/// Always returns at least one line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in source_line.split_whitespace() {
            for piece in split_long(word, width) {
                let piece_len = piece.chars().count();
                if current_len > 0 && current_len + 1 + piece_len > width {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(&piece);
                current_len += piece_len;
            }
        }

        lines.push(current);
    }

    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

fn split_long(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}
