//! freedesktop.org `.desktop` entries.

use std::fmt::Write;

/// A `[Desktop Entry]` of type Application.
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    pub name: String,
    pub comment: String,
    pub exec: String,
    pub icon: String,
    pub terminal: bool,
    pub categories: Vec<String>,
    /// Extra `Key=Value` lines, written in order after the standard keys.
    pub extra: Vec<(String, String)>,
}

impl DesktopEntry {
    pub fn application(name: &str, exec: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: String::new(),
            exec: exec.to_string(),
            icon: String::new(),
            terminal: false,
            categories: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    /// Serialize. Empty optional keys are omitted.
    pub fn to_text(&self) -> String {
        let mut out = String::from("[Desktop Entry]\nType=Application\n");
        let _ = writeln!(out, "Name={}", escape_string(&self.name));
        if !self.comment.is_empty() {
            let _ = writeln!(out, "Comment={}", escape_string(&self.comment));
        }
        let _ = writeln!(out, "Exec={}", self.exec);
        if !self.icon.is_empty() {
            let _ = writeln!(out, "Icon={}", self.icon);
        }
        let _ = writeln!(out, "Terminal={}", self.terminal);
        if !self.categories.is_empty() {
            let _ = writeln!(out, "Categories={};", self.categories.join(";"));
        }
        for (key, value) in &self.extra {
            let _ = writeln!(out, "{}={}", key, value);
        }
        out
    }
}

/// `string`/`localestring` value escapes: `\\` and a leading space.
fn escape_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\");
    match escaped.strip_prefix(' ') {
        Some(rest) => format!("\\s{}", rest),
        None => escaped,
    }
}
