//! Name normalization and unique-name claiming.

use std::collections::HashSet;

/// Normalize a human-readable name for deduplication: lowercase, path
/// separators and whitespace collapsed to single hyphens, charset
/// restricted to `[a-z0-9_-]`, leading/trailing hyphens trimmed.
/// Never empty.
pub fn normalize_name(value: &str) -> String {
    sanitize(value, false)
}

/// Slug a name for generated skills and commands. Like [`normalize_name`]
/// but namespace colons survive (charset `[a-z0-9_:-]`).
pub fn slug(value: &str) -> String {
    sanitize(value, true)
}

fn sanitize(value: &str, keep_colons: bool) -> String {
    let lowered = value.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => out.push(c),
            ':' if keep_colons => out.push(c),
            _ => {
                if !out.ends_with('-') {
                    out.push('-');
                }
            },
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "item".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Claims unique names across one conversion run.
#[derive(Debug, Default)]
pub struct NamePool {
    used: HashSet<String>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as taken without handing it out.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Claim `base` as-is, or `base-2`, `base-3`, … on collision.
    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut index = 2u32;
        loop {
            let candidate = format!("{base}-{index}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            index += 1;
        }
    }
}
