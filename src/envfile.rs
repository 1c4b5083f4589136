/// An order-preserving view of a Docker Compose `.env` file.
///
/// Comments, blank lines, and entries that are never touched are
/// rendered back exactly as they were read. [`EnvFile::set`]
/// replaces a key in place and drops any later duplicates, so a
/// key appears at most once after it has been set.
///
/// # Example
///
/// ```
/// use supahost::EnvFile;
///
/// let mut env = EnvFile::parse("# Studio\nDASHBOARD_USERNAME=supabase\nPOSTGRES_PORT=5432\n");
/// env.set("DASHBOARD_USERNAME", "admin");
///
/// assert_eq!(env.get("DASHBOARD_USERNAME"), Some("admin"));
/// assert_eq!(env.render(), "# Studio\nDASHBOARD_USERNAME=admin\nPOSTGRES_PORT=5432\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String, raw: String },
    Other(String),
}

impl EnvFile {
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|raw| {
                parse_entry(raw).map_or_else(
                    || Line::Other(raw.to_string()),
                    |(key, value)| Line::Entry {
                        key,
                        value,
                        raw: raw.to_string(),
                    },
                )
            })
            .collect();
        Self { lines }
    }

    /// Value of `key`. With duplicate keys the last one wins, the
    /// same way Docker Compose resolves them.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of lines defining `key`.
    #[must_use]
    pub fn occurrences(&self, key: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, Line::Entry { key: k, .. } if k == key))
            .count()
    }

    /// Insert or replace `key`. The first existing definition is
    /// rewritten in place and later ones are removed; a new key is
    /// appended at the end.
    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            raw: format!("{key}={value}"),
        };

        let mut seen = false;
        let mut lines = Vec::with_capacity(self.lines.len() + 1);
        for line in self.lines.drain(..) {
            match &line {
                Line::Entry { key: k, .. } if k == key => {
                    if !seen {
                        lines.push(replacement.clone());
                        seen = true;
                    }
                }
                _ => lines.push(line),
            }
        }
        if !seen {
            lines.push(replacement);
        }
        self.lines = lines;
    }

    /// Render the file with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { raw, .. } | Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn parse_entry(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some((key.to_string(), unquote(value.trim())))
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_entries() {
        let env = EnvFile::parse("# secrets\n\nPOSTGRES_PASSWORD=abc\nJWT_SECRET=\"x y\"\n");

        assert_eq!(env.get("POSTGRES_PASSWORD"), Some("abc"));
        assert_eq!(env.get("JWT_SECRET"), Some("x y"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn export_prefix_and_single_quotes() {
        let env = EnvFile::parse("export SITE_URL='http://localhost:3000'\n");

        assert_eq!(env.get("SITE_URL"), Some("http://localhost:3000"));
    }

    #[test]
    fn value_may_contain_equals() {
        let env = EnvFile::parse("PGRST_DB_SCHEMAS=public,storage\nANON=a=b=c\n");

        assert_eq!(env.get("ANON"), Some("a=b=c"));
    }

    #[test]
    fn last_duplicate_wins_on_read() {
        let env = EnvFile::parse("DASHBOARD_PASSWORD=old\nDASHBOARD_PASSWORD=new\n");

        assert_eq!(env.get("DASHBOARD_PASSWORD"), Some("new"));
        assert_eq!(env.occurrences("DASHBOARD_PASSWORD"), 2);
    }

    #[test]
    fn set_collapses_duplicates_in_place() {
        let mut env = EnvFile::parse("A=1\nDASHBOARD_PASSWORD=old\nB=2\nDASHBOARD_PASSWORD=older\nC=3\n");

        env.set("DASHBOARD_PASSWORD", "fresh");

        assert_eq!(env.render(), "A=1\nDASHBOARD_PASSWORD=fresh\nB=2\nC=3\n");
        assert_eq!(env.occurrences("DASHBOARD_PASSWORD"), 1);
    }

    #[test]
    fn set_appends_new_key() {
        let mut env = EnvFile::parse("A=1");

        env.set("B", "2");

        assert_eq!(env.render(), "A=1\nB=2\n");
    }

    #[test]
    fn untouched_lines_render_verbatim() {
        let input = "  # indented comment\nKEY = spaced\nnot an entry\n";
        let env = EnvFile::parse(input);

        assert_eq!(env.render(), input);
        assert_eq!(env.get("KEY"), Some("spaced"));
    }

    #[test]
    fn invalid_keys_are_not_entries() {
        let env = EnvFile::parse("BAD-KEY=1\n=nothing\n");

        assert!(!env.contains("BAD-KEY"));
        assert_eq!(env.render(), "BAD-KEY=1\n=nothing\n");
    }
}
