//! `@KEY@` placeholder substitution.
//!
//! A placeholder is `@` followed by one or more of `A-Z 0-9 _` (starting
//! with a letter) and a closing `@`. Anything else containing `@`, such as
//! `"$@"` or `${arr[@]}` in shell, passes through untouched.
//!
//! Templates place every free-text placeholder inside a double-quoted
//! string, so values are escaped for that context of the target language.

use anyhow::{bail, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Substitution values keyed by placeholder name.
pub type Vars = BTreeMap<&'static str, String>;

/// The double-quoted string syntax a template is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// POSIX sh / bash `"..."`.
    Shell,
    /// grub.cfg `"..."`.
    Grub,
}

impl Quoting {
    fn specials(self) -> &'static [char] {
        match self {
            Quoting::Shell => &['\\', '"', '$', '`'],
            Quoting::Grub => &['\\', '"', '$'],
        }
    }

    /// Backslash-escape the characters that are special inside `"..."`.
    pub fn escape(self, value: &str) -> Cow<'_, str> {
        let specials = self.specials();
        if !value.contains(specials) {
            return Cow::Borrowed(value);
        }
        let mut out = String::with_capacity(value.len() + 4);
        for c in value.chars() {
            if specials.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        Cow::Owned(out)
    }
}

/// Render `template`, failing on the first placeholder missing from `vars`.
pub fn render(name: &str, template: &str, vars: &Vars, quoting: Quoting) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        match placeholder(after) {
            Some(key) => {
                let Some(value) = vars.get(key) else {
                    bail!("Template '{}' references unknown placeholder @{}@", name, key);
                };
                out.push_str(&quoting.escape(value));
                rest = &after[key.len() + 1..];
            }
            None => {
                out.push('@');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// If `s` starts with `KEY@`, return `KEY`.
fn placeholder(s: &str) -> Option<&str> {
    let end = s.find('@')?;
    let key = &s[..end];
    let mut chars = key.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        Some(key)
    } else {
        None
    }
}

/// Placeholder names a template uses, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    let mut rest = template;
    while let Some(at) = rest.find('@') {
        let after = &rest[at + 1..];
        match placeholder(after) {
            Some(key) => {
                if !found.contains(&key) {
                    found.push(key);
                }
                rest = &after[key.len() + 1..];
            }
            None => rest = after,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> Vars {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_substitutes_all_occurrences() {
        let out = render(
            "t",
            "user=@USERNAME@ home=/home/@USERNAME@",
            &vars(&[("USERNAME", "fox")]),
            Quoting::Shell,
        )
        .unwrap();
        assert_eq!(out, "user=fox home=/home/fox");
    }

    #[test]
    fn test_shell_at_signs_pass_through() {
        let text = r#"for a in "${list[@]}"; do :; done; main "$@"; mail root@localhost"#;
        let out = render("t", text, &Vars::new(), Quoting::Shell).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_unknown_placeholder_is_error() {
        let err = render(
            "hook",
            "name=@OS_NAME@ v=@VERSION@",
            &vars(&[("OS_NAME", "x")]),
            Quoting::Shell,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("@VERSION@"));
        assert!(msg.contains("hook"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let out = render("t", "@A@", &vars(&[("A", "@B@")]), Quoting::Shell).unwrap();
        assert_eq!(out, "@B@");
    }

    #[test]
    fn test_shell_escaping_survives_the_shell() {
        let value = r#"O'Brien & Sons "Fox" $HOME `id` C:\furry /x"#;
        let script = render(
            "t",
            "printf '%s' \"@AUTHOR@\"",
            &vars(&[("AUTHOR", value)]),
            Quoting::Shell,
        )
        .unwrap();

        let Ok(output) = std::process::Command::new("sh").arg("-c").arg(&script).output() else {
            eprintln!("sh not available, skipping");
            return;
        };
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), value);
    }

    #[test]
    fn test_grub_escaping_leaves_backticks() {
        assert_eq!(
            Quoting::Grub.escape(r#"A "B" $C `d` \e"#),
            r#"A \"B\" \$C `d` \\e"#
        );
        assert!(matches!(Quoting::Shell.escape("A & B / C's"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_placeholders_listing() {
        assert_eq!(
            placeholders("@A@ @B_2@ @A@ x@y \"$@\""),
            vec!["A", "B_2"]
        );
    }
}
