//! Cross-reference rewriting for skill-document targets.
//!
//! Three ordered substitution passes over an instruction body. The order is
//! load-bearing: a later pass must never re-match text a prior pass
//! produced.

use std::{collections::HashSet, sync::LazyLock};

use regex::{Captures, Regex};

use replug_plugin::naming::slug;

static TASK_CALL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^(\s*-?\s*)Task\s+([a-z][a-z0-9-]*)\(([^)]+)\)"));
static SLASH_REF: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)/([a-z][a-z0-9_:-]*)"));
static AGENT_REF: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)@([a-z][a-z0-9-]*-(?:agent|reviewer|researcher|analyst|specialist|oracle|sentinel|guardian|strategist))",
    )
});

/// Path-like words never mistaken for command references.
const RESERVED_PATH_WORDS: &[&str] = &["dev", "tmp", "etc", "usr", "var", "bin", "home"];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("built-in pattern failed to compile: {e}"))
}

/// Rewrite delegated invocations, slash references, and @-mentions for a
/// target that addresses everything as `$skill`.
pub fn rewrite_body(body: &str, known_commands: &HashSet<String>) -> String {
    let result = rewrite_task_calls(body);
    let result = rewrite_slash_refs(&result, known_commands);
    rewrite_agent_refs(&result)
}

/// Pass 1: `Task name(args)` lines become skill invocations.
fn rewrite_task_calls(body: &str) -> String {
    TASK_CALL
        .replace_all(body, |caps: &Captures| {
            let prefix = &caps[1];
            let name = slug(&caps[2]);
            let args = caps[3].trim();
            format!("{prefix}Use the ${name} skill to: {args}")
        })
        .into_owned()
}

/// Pass 2: `/command` tokens become `$command`, but only for commands this
/// run actually generated, and never for path-like words.
fn rewrite_slash_refs(body: &str, known_commands: &HashSet<String>) -> String {
    SLASH_REF
        .replace_all(body, |caps: &Captures| {
            let Some(matched) = caps.get(0) else {
                return String::new();
            };
            let original = matched.as_str().to_string();

            // Skip URL schemes and mid-word or mid-path slashes.
            let preceding = body[..matched.start()].chars().next_back();
            if preceding.is_some_and(|c| c == ':' || c.is_alphanumeric() || c == '_') {
                return original;
            }
            // The token must end at whitespace, light punctuation, or EOF.
            let following = body[matched.end()..].chars().next();
            if following.is_some_and(|c| !c.is_whitespace() && !",.\"')]}".contains(c)) {
                return original;
            }

            let word = &caps[1];
            if RESERVED_PATH_WORDS.contains(&word) {
                return original;
            }
            let slugged = slug(word);
            if !known_commands.contains(&slugged) {
                return original;
            }
            format!("${slugged}")
        })
        .into_owned()
}

/// Pass 3: `@name` mentions with a role suffix become skill references.
fn rewrite_agent_refs(body: &str) -> String {
    AGENT_REF
        .replace_all(body, |caps: &Captures| format!("${} skill", slug(&caps[1])))
        .into_owned()
}
