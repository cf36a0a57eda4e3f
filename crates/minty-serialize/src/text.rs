//! Indented text form of a [`Node`] tree.
//!
//! One node per line, with depth expressed as leading tabs:
//!
//! ```text
//! Entity
//! 	Name
//! 		name: Player
//! 	- unnamed value
//! ```
//!
//! A line is `name: data`, `name`, or `- data` for an unnamed node. A leading
//! `: data` line sets the root's own data. Blank lines and lines starting with
//! `#` are ignored. Newlines and backslashes inside data are escaped. Names
//! additionally escape `:` and a leading `#`, `-`, space or tab, so any name
//! survives a round trip.

use crate::node::Node;
use crate::ParseError;

const INDENT: char = '\t';
const SEPARATOR: &str = ": ";

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl Node {
    /// Render this tree as indented text. The root's children are written at
    /// depth zero; the root's name is not written.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if self.has_data() {
            out.push_str(SEPARATOR);
            out.push_str(&escape(self.data()));
            out.push('\n');
        }
        for child in self.children() {
            write_line(&mut out, child, 0);
        }
        out
    }

    /// Parse indented text into a tree whose root is an unnamed node.
    pub fn parse_text(text: &str) -> Result<Node, ParseError> {
        parse(text)
    }
}

fn write_line(out: &mut String, node: &Node, depth: usize) {
    for _ in 0..depth {
        out.push(INDENT);
    }
    match (node.has_name(), node.has_data()) {
        (true, true) => {
            out.push_str(&escape_name(node.name()));
            out.push_str(SEPARATOR);
            out.push_str(&escape(node.data()));
        }
        (true, false) => out.push_str(&escape_name(node.name())),
        (false, true) => {
            out.push_str("- ");
            out.push_str(&escape(node.data()));
        }
        (false, false) => out.push('-'),
    }
    out.push('\n');
    for child in node.children() {
        write_line(out, child, depth + 1);
    }
}

fn escape(data: &str) -> String {
    if !data.contains(['\\', '\n', '\r']) {
        return data.to_owned();
    }
    let mut escaped = String::with_capacity(data.len() + 4);
    for c in data.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    for (i, c) in name.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            ':' => escaped.push_str("\\:"),
            '#' | '-' | ' ' | INDENT if i == 0 => {
                escaped.push('\\');
                escaped.push(c);
            }
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape(data: &str) -> String {
    if !data.contains('\\') {
        return data.to_owned();
    }
    let mut out = String::with_capacity(data.len());
    let mut chars = data.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn parse(text: &str) -> Result<Node, ParseError> {
    // stack[0] is the root; stack[d + 1] is the open node at depth d.
    let mut stack: Vec<Node> = vec![Node::default()];
    let mut seen_line = false;

    for (line_index, raw) in text.lines().enumerate() {
        let line_number = line_index + 1;
        let line = raw.trim_end_matches('\r');
        let depth = line.chars().take_while(|c| *c == INDENT).count();
        let content = &line[depth..];

        if content.trim().is_empty() || content.starts_with('#') {
            continue;
        }

        // Root data: ": value" as the first meaningful line.
        if !seen_line && depth == 0 && content.starts_with(':') {
            let data = content
                .strip_prefix(SEPARATOR)
                .unwrap_or(&content[1..]);
            stack[0].set_data(unescape(data));
            seen_line = true;
            continue;
        }
        seen_line = true;

        if content.starts_with(' ') {
            return Err(ParseError::InvalidIndentation {
                line: line_number,
                details: "indentation must use tabs".to_owned(),
            });
        }

        if depth + 1 > stack.len() {
            return Err(ParseError::InvalidIndentation {
                line: line_number,
                details: format!(
                    "depth {depth} follows a line at depth {}",
                    stack.len().saturating_sub(2)
                ),
            });
        }

        while stack.len() > depth + 1 {
            close_top(&mut stack);
        }

        stack.push(parse_content(content));
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }

    Ok(stack.pop().unwrap_or_default())
}

fn close_top(stack: &mut Vec<Node>) {
    if let Some(node) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.add_child(node);
        }
    }
}

fn parse_content(content: &str) -> Node {
    if content == "-" {
        return Node::default();
    }
    if let Some(data) = content.strip_prefix("- ") {
        return Node::leaf("", unescape(data));
    }
    match split_name(content) {
        (name, Some(data)) => Node::leaf(unescape(name), unescape(data)),
        (name, None) => Node::new(unescape(name)),
    }
}

/// Split a line at the first unescaped `": "`. A trailing unescaped `:` ends
/// the name with no data.
fn split_name(content: &str) -> (&str, Option<&str>) {
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ':' => match chars.peek() {
                Some((_, ' ')) => return (&content[..i], Some(&content[i + SEPARATOR.len()..])),
                None => return (&content[..i], None),
                Some(_) => {}
            },
            _ => {}
        }
    }
    (content, None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut root = Node::new("");
        let entity = root.add_child(Node::new("Entity"));
        let name = entity.add_child(Node::new("Name"));
        name.add_child(Node::leaf("name", "Player"));
        entity.add_child(Node::leaf("", "unnamed"));
        root.add_child(Node::new("Entity"));
        root
    }

    #[test]
    fn renders_tabs_and_separators() {
        let text = sample().to_text();
        assert_eq!(
            text,
            "Entity\n\tName\n\t\tname: Player\n\t- unnamed\nEntity\n"
        );
    }

    #[test]
    fn parse_restores_tree() {
        let root = sample();
        let parsed = Node::parse_text(&root.to_text()).unwrap();
        assert_eq!(parsed, root);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "# scene file\n\nEntity\n\n\tTag\n\t\ttag: Hero\n";
        let parsed = Node::parse_text(text).unwrap();
        let tag = parsed.find("Entity").unwrap().find("Tag").unwrap();
        assert_eq!(tag.find("tag").unwrap().data(), "Hero");
    }

    #[test]
    fn skipped_indentation_is_an_error() {
        let text = "Entity\n\t\t\tname: x\n";
        let err = Node::parse_text(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidIndentation { line: 2, .. }));
    }

    #[test]
    fn space_indentation_is_an_error() {
        let err = Node::parse_text("Entity\n  Name\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidIndentation { line: 2, .. }));
    }

    #[test]
    fn root_data_and_escaped_newlines() {
        let mut root = Node::new("");
        root.set_data("abc");
        root.add_child(Node::leaf("text", "two\nlines \\ slash"));
        let text = root.to_text();
        assert!(text.starts_with(": abc\n"));
        assert!(text.contains("text: two\\nlines \\\\ slash"));
        assert_eq!(Node::parse_text(&text).unwrap(), root);
    }

    #[test]
    fn awkward_names_survive_round_trip() {
        let mut root = Node::new("");
        for name in ["#1", "Jump: Up", " lead", "-", "- dash", "a:", "\\x", "two\nlines", "\tTab", ":"] {
            root.add_child(Node::leaf(name, "5"));
            root.add_child(Node::new(name));
        }
        let text = root.to_text();
        assert_eq!(Node::parse_text(&text).unwrap(), root);
    }

    #[test]
    fn escaped_name_keeps_separator_in_name() {
        let parsed = Node::parse_text("Jump\\: Up: 5\n").unwrap();
        let node = &parsed.children()[0];
        assert_eq!(node.name(), "Jump: Up");
        assert_eq!(node.data(), "5");
    }
}
