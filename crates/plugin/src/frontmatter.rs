//! Minimal frontmatter codec for instruction documents.
//!
//! Parses the `---`-delimited metadata header of agent/command/skill
//! documents into loose [`serde_json::Value`]s, and renders generated
//! headers back out. Only the subset of syntax that appears in plugin
//! frontmatter is supported; arbitrary hand-written documents outside
//! that subset are not guaranteed to round-trip byte-for-byte.

use serde_json::{Map, Value};

/// A parsed instruction document: metadata header plus free-form body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub data: Map<String, Value>,
    pub body: String,
}

/// Split a raw document into frontmatter data and body.
///
/// A document whose first line is not `---`, or that never closes the
/// header, parses as an empty map with the whole input as body.
pub fn parse(raw: &str) -> Document {
    let lines: Vec<&str> = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    if lines.first().map(|line| line.trim()) != Some("---") {
        return Document {
            data: Map::new(),
            body: raw.to_string(),
        };
    }

    let Some(end) = lines
        .iter()
        .skip(1)
        .position(|line| line.trim() == "---")
        .map(|offset| offset + 1)
    else {
        return Document {
            data: Map::new(),
            body: raw.to_string(),
        };
    };

    Document {
        data: parse_header_lines(&lines[1..end]),
        body: lines[end + 1..].join("\n"),
    }
}

fn parse_header_lines(lines: &[&str]) -> Map<String, Value> {
    let mut data = Map::new();
    // Most recent bare key; `- item` lines append to it.
    let mut current_list: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(item) = line.trim().strip_prefix("- ") {
            let Some(key) = current_list.clone() else {
                continue;
            };
            match data.get_mut(&key) {
                Some(Value::Array(items)) => items.push(parse_scalar(item)),
                _ => {
                    data.insert(key, Value::Array(vec![parse_scalar(item)]));
                },
            }
            continue;
        }

        let Some(colon) = line.find(':') else {
            continue;
        };
        let key = line[..colon].trim().to_string();
        let value = line[colon + 1..].trim();
        current_list = Some(key.clone());

        if value.is_empty() {
            data.insert(key, Value::Array(Vec::new()));
            continue;
        }

        if value == "|" || value == ">" {
            let mut block: Vec<&str> = Vec::new();
            while i < lines.len() && lines[i].starts_with([' ', '\t']) {
                block.push(lines[i]);
                i += 1;
            }
            let joiner = if value == "|" { "\n" } else { " " };
            let text = dedent(&block).join(joiner);
            data.insert(key, Value::String(text.trim_end().to_string()));
            current_list = None;
            continue;
        }

        data.insert(key, parse_scalar(value));
    }

    data
}

/// Strip the minimum common leading whitespace across the block's lines.
fn dedent<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or(""))
        .collect()
}

/// Coerce a scalar token: quoted strings strip their quotes, `[a, b]`
/// recurses, `true`/`false`/`null`/`~` map to bool/null, integer and
/// decimal tokens become numbers, everything else stays a string.
fn parse_scalar(token: &str) -> Value {
    let token = token.trim();

    if token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')))
    {
        return Value::String(token[1..token.len() - 1].to_string());
    }

    if token.starts_with('[') && token.ends_with(']') {
        let inner = token[1..token.len() - 1].trim();
        if inner.is_empty() {
            return Value::Array(Vec::new());
        }
        return Value::Array(inner.split(',').map(parse_scalar).collect());
    }

    match token {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "~" => return Value::Null,
        _ => {},
    }

    if is_number(token) {
        if !token.contains('.') {
            if let Ok(n) = token.parse::<i64>() {
                return Value::Number(n.into());
            }
        } else if let Some(n) = token
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return Value::Number(n);
        }
    }

    Value::String(token.to_string())
}

fn is_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    let mut parts = digits.splitn(2, '.');
    let int = parts.next().unwrap_or_default();
    let frac = parts.next();
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// Render an ordered field list plus body back into a document.
///
/// The inverse of [`parse`] for codec-producible value shapes. An empty
/// field list renders the body unchanged.
pub fn render(fields: &[(String, Value)], body: &str) -> String {
    let mut header: Vec<String> = Vec::new();
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                header.push(format!("{key}:"));
                for item in items {
                    header.push(format!("  - {}", render_scalar(item)));
                }
            },
            _ => header.push(format!("{key}: {}", render_scalar(value))),
        }
    }

    if header.is_empty() {
        return body.to_string();
    }
    format!("---\n{}\n---\n\n{}", header.join("\n"), body)
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.contains('\n') => {
            let indented: Vec<String> = s.split('\n').map(|line| format!("  {line}")).collect();
            format!("|\n{}", indented.join("\n"))
        },
        // Quote anything that would re-parse as a different shape.
        Value::String(s) if s.contains(':') || s.starts_with('[') || s.starts_with('{') => {
            serde_json::to_string(s).unwrap_or_else(|_| s.clone())
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn parses_basic_header() {
        let doc = parse("---\nname: review-pr\ndescription: Review a pull request\n---\nBody text.\n");
        assert_eq!(doc.data["name"], json!("review-pr"));
        assert_eq!(doc.data["description"], json!("Review a pull request"));
        assert_eq!(doc.body, "Body text.\n");
    }

    #[test]
    fn missing_delimiter_is_all_body() {
        let doc = parse("# Just markdown\n\nNo header here.\n");
        assert!(doc.data.is_empty());
        assert_eq!(doc.body, "# Just markdown\n\nNo header here.\n");
    }

    #[test]
    fn unclosed_header_is_all_body() {
        let raw = "---\nname: broken\nno closing line\n";
        let doc = parse(raw);
        assert!(doc.data.is_empty());
        assert_eq!(doc.body, raw);
    }

    #[test]
    fn scalar_coercion() {
        let doc = parse(
            "---\nquoted: \"with: colon\"\nsingle: 'spaced out'\ncount: 3\nratio: -0.5\nflag: true\noff: false\nnothing: null\ntilde: ~\nplain: keep me\n---\n",
        );
        assert_eq!(doc.data["quoted"], json!("with: colon"));
        assert_eq!(doc.data["single"], json!("spaced out"));
        assert_eq!(doc.data["count"], json!(3));
        assert_eq!(doc.data["ratio"], json!(-0.5));
        assert_eq!(doc.data["flag"], json!(true));
        assert_eq!(doc.data["off"], json!(false));
        assert_eq!(doc.data["nothing"], Value::Null);
        assert_eq!(doc.data["tilde"], Value::Null);
        assert_eq!(doc.data["plain"], json!("keep me"));
    }

    #[test]
    fn inline_list_recurses() {
        let doc = parse("---\ntools: [bash, 2, true]\nempty: []\n---\n");
        assert_eq!(doc.data["tools"], json!(["bash", 2, true]));
        assert_eq!(doc.data["empty"], json!([]));
    }

    #[test]
    fn dash_items_append_to_bare_key() {
        let doc = parse("---\ncapabilities:\n  - reads code\n  - writes tests\n---\n");
        assert_eq!(doc.data["capabilities"], json!(["reads code", "writes tests"]));
    }

    #[test]
    fn bare_key_without_items_is_empty_list() {
        let doc = parse("---\nplatforms:\n---\n");
        assert_eq!(doc.data["platforms"], json!([]));
    }

    #[test]
    fn literal_block_joins_with_newlines() {
        let doc = parse("---\nnotes: |\n  first line\n  second line\n---\n");
        assert_eq!(doc.data["notes"], json!("first line\nsecond line"));
    }

    #[test]
    fn folded_block_joins_with_spaces() {
        let doc = parse("---\nsummary: >\n  wrapped\n  prose\n---\n");
        assert_eq!(doc.data["summary"], json!("wrapped prose"));
    }

    #[test]
    fn deep_indent_block_keeps_relative_structure() {
        // De-indentation strips the common prefix, not a fixed width.
        let doc = parse("---\nscript: |\n      if x:\n        y()\n---\n");
        assert_eq!(doc.data["script"], json!("if x:\n  y()"));
    }

    #[test]
    fn key_after_block_does_not_extend_it() {
        let doc = parse("---\nnotes: |\n  inside\nafter: yes\n---\n");
        assert_eq!(doc.data["notes"], json!("inside"));
        assert_eq!(doc.data["after"], json!("yes"));
    }

    #[test]
    fn render_quotes_ambiguous_strings() {
        let rendered = render(
            &fields(&[
                ("description", json!("watch: everything")),
                ("hint", json!("[file]")),
            ]),
            "Body.",
        );
        assert_eq!(
            rendered,
            "---\ndescription: \"watch: everything\"\nhint: \"[file]\"\n---\n\nBody."
        );
    }

    #[test]
    fn render_empty_header_is_body_only() {
        assert_eq!(render(&[], "Just the body."), "Just the body.");
    }

    #[test]
    fn round_trip_supported_shapes() {
        let input = fields(&[
            ("name", json!("security-reviewer")),
            ("temperature", json!(0.1)),
            ("count", json!(42)),
            ("enabled", json!(true)),
            ("tags", json!(["fast", "safe"])),
            ("summary", json!("with: a colon")),
            ("notes", json!("line one\nline two")),
        ]);
        let rendered = render(&input, "The body.\n");
        let doc = parse(&rendered);

        for (key, value) in &input {
            assert_eq!(doc.data.get(key), Some(value), "field {key} must survive");
        }
        assert_eq!(doc.body.trim(), "The body.");
    }

    #[test]
    fn round_trip_list_shape() {
        let input = fields(&[("capabilities", json!(["one", "two", "three"]))]);
        let doc = parse(&render(&input, ""));
        assert_eq!(doc.data["capabilities"], json!(["one", "two", "three"]));
    }
}
