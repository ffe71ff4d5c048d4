//! Loads a Claude Code plugin directory into a [`PluginModel`].

use std::{
    collections::{BTreeMap, HashSet},
    path::{Component, Path, PathBuf},
};

use {
    serde::de::DeserializeOwned,
    serde_json::{Map, Value},
    tracing::debug,
    walkdir::WalkDir,
};

use crate::{
    error::{Error, Result},
    frontmatter,
    naming::normalize_name,
    types::{
        Agent, Command, HookConfig, HooksField, PathList, PluginManifest, PluginModel, Skill,
        ToolServer, ToolServersField,
    },
};

/// Resolve the plugin root from user input: the root itself, the manifest
/// path, or any path ending in `plugin.json`.
pub async fn resolve_plugin_root(input: &Path) -> Result<PathBuf> {
    let manifest = input.join(".claude-plugin").join("plugin.json");
    if path_exists(&manifest).await {
        return Ok(input.to_path_buf());
    }

    if input.file_name().is_some_and(|name| name == "plugin.json")
        && let Some(root) = input.parent().and_then(Path::parent)
    {
        return Ok(root.to_path_buf());
    }

    Err(Error::ManifestNotFound {
        path: input.to_path_buf(),
    })
}

/// Load and normalize the plugin rooted at `root`.
pub async fn load_plugin(root: &Path) -> Result<PluginModel> {
    let manifest_path = root.join(".claude-plugin").join("plugin.json");
    if !path_exists(&manifest_path).await {
        return Err(Error::ManifestNotFound {
            path: root.to_path_buf(),
        });
    }
    let manifest: PluginManifest = read_json(&manifest_path).await?;

    let agents = load_agents(&component_dirs(root, "agents", manifest.agents.as_ref())?).await?;
    let legacy_commands =
        load_commands(&component_dirs(root, "commands", manifest.commands.as_ref())?).await?;
    let skills = load_skills(&component_dirs(root, "skills", manifest.skills.as_ref())?).await?;
    let commands = effective_commands(legacy_commands, &skills);
    let hooks = load_hooks(root, manifest.hooks.as_ref()).await?;
    let mcp_servers = load_tool_servers(root, manifest.mcp_servers.as_ref()).await?;

    debug!(
        plugin = %manifest.name,
        agents = agents.len(),
        commands = commands.len(),
        skills = skills.len(),
        "plugin loaded"
    );

    Ok(PluginModel {
        root: root.to_path_buf(),
        manifest,
        agents,
        commands,
        skills,
        hooks,
        mcp_servers,
    })
}

// ── Path resolution ─────────────────────────────────────────────────────────

/// Resolve `entry` against `root`, rejecting any path that escapes it.
/// Raised before any read touches the entry.
pub fn resolve_within_root(root: &Path, entry: &str, label: &str) -> Result<PathBuf> {
    let resolved_root = lexical_normalize(root);
    let resolved = lexical_normalize(&root.join(entry));
    if resolved == resolved_root || resolved.starts_with(&resolved_root) {
        return Ok(resolved);
    }
    Err(Error::PathEscapesRoot {
        label: label.to_string(),
        entry: entry.to_string(),
    })
}

/// Collapse `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir.as_os_str());
                }
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn component_dirs(root: &Path, default_dir: &str, extra: Option<&PathList>) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![root.join(default_dir)];
    if let Some(extra) = extra {
        for entry in extra.as_slice() {
            dirs.push(resolve_within_root(root, entry, &format!("{default_dir} path"))?);
        }
    }
    Ok(dirs)
}

// ── Component loading ───────────────────────────────────────────────────────

async fn load_agents(dirs: &[PathBuf]) -> Result<Vec<Agent>> {
    let mut agents = Vec::new();
    for file in markdown_files(dirs) {
        let raw = tokio::fs::read_to_string(&file).await?;
        let doc = frontmatter::parse(&raw);
        agents.push(Agent {
            name: str_field(&doc.data, "name").unwrap_or_else(|| file_stem(&file)),
            description: str_field(&doc.data, "description"),
            capabilities: list_field(&doc.data, "capabilities").unwrap_or_default(),
            model: str_field(&doc.data, "model"),
            body: doc.body.trim().to_string(),
            source_path: file,
        });
    }
    Ok(agents)
}

async fn load_commands(dirs: &[PathBuf]) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for file in markdown_files(dirs) {
        let raw = tokio::fs::read_to_string(&file).await?;
        let doc = frontmatter::parse(&raw);
        commands.push(Command {
            name: str_field(&doc.data, "name").unwrap_or_else(|| file_stem(&file)),
            description: str_field(&doc.data, "description"),
            argument_hint: str_field(&doc.data, "argument-hint"),
            model: str_field(&doc.data, "model"),
            allowed_tools: list_field(&doc.data, "allowed-tools"),
            disable_model_invocation: bool_field(&doc.data, "disable-model-invocation"),
            body: doc.body.trim().to_string(),
            source_path: file,
        });
    }
    Ok(commands)
}

async fn load_skills(dirs: &[PathBuf]) -> Result<Vec<Skill>> {
    let mut skills = Vec::new();
    let skill_files = collect_files(dirs)
        .into_iter()
        .filter(|file| file.file_name().is_some_and(|name| name == "SKILL.md"));
    for file in skill_files {
        let raw = tokio::fs::read_to_string(&file).await?;
        let doc = frontmatter::parse(&raw);
        skills.push(Skill {
            name: str_field(&doc.data, "name").unwrap_or_else(|| dir_name(&file)),
            description: str_field(&doc.data, "description"),
            argument_hint: str_field(&doc.data, "argument-hint"),
            model: str_field(&doc.data, "model"),
            allowed_tools: list_field(&doc.data, "allowed-tools"),
            disable_model_invocation: bool_field(&doc.data, "disable-model-invocation"),
            user_invocable: bool_field(&doc.data, "user-invocable"),
            platforms: list_field(&doc.data, "platforms")
                .map(|items| items.iter().map(|p| p.trim().to_lowercase()).collect()),
            body: doc.body.trim().to_string(),
            source_dir: file.parent().map(Path::to_path_buf).unwrap_or_default(),
            source_path: file,
        });
    }
    Ok(skills)
}

/// Legacy commands first, then user-invocable skills, deduplicated by
/// normalized name with first-seen precedence.
fn effective_commands(legacy: Vec<Command>, skills: &[Skill]) -> Vec<Command> {
    let mut seen = HashSet::new();
    let mut commands = Vec::new();

    for command in legacy {
        if seen.insert(normalize_name(&command.name)) {
            commands.push(command);
        }
    }

    for skill in skills {
        if skill.user_invocable == Some(false) {
            continue;
        }
        if !seen.insert(normalize_name(&skill.name)) {
            continue;
        }
        commands.push(Command {
            name: skill.name.clone(),
            description: skill.description.clone(),
            argument_hint: skill.argument_hint.clone(),
            model: skill.model.clone(),
            allowed_tools: skill.allowed_tools.clone(),
            disable_model_invocation: skill.disable_model_invocation,
            body: skill.body.clone(),
            source_path: skill.source_path.clone(),
        });
    }

    commands
}

// ── Hooks and tool servers ──────────────────────────────────────────────────

async fn load_hooks(root: &Path, field: Option<&HooksField>) -> Result<Option<HookConfig>> {
    let mut configs = Vec::new();

    // Default file first so manifest-declared matchers append after it.
    let default_path = root.join("hooks").join("hooks.json");
    if path_exists(&default_path).await {
        configs.push(read_json::<HookConfig>(&default_path).await?);
    }

    match field {
        None => {},
        Some(HooksField::Inline(config)) => configs.push(config.clone()),
        Some(HooksField::Path(path)) => push_hook_file(root, path, &mut configs).await?,
        Some(HooksField::Paths(paths)) => {
            for path in paths {
                push_hook_file(root, path, &mut configs).await?;
            }
        },
    }

    if configs.is_empty() {
        return Ok(None);
    }
    Ok(Some(merge_hooks(configs)))
}

async fn push_hook_file(root: &Path, entry: &str, configs: &mut Vec<HookConfig>) -> Result<()> {
    let resolved = resolve_within_root(root, entry, "hooks path")?;
    if path_exists(&resolved).await {
        configs.push(read_json(&resolved).await?);
    }
    Ok(())
}

fn merge_hooks(configs: Vec<HookConfig>) -> HookConfig {
    let mut merged = HookConfig::default();
    for config in configs {
        for (event, matchers) in config.hooks {
            merged.hooks.entry(event).or_default().extend(matchers);
        }
    }
    merged
}

async fn load_tool_servers(
    root: &Path,
    field: Option<&ToolServersField>,
) -> Result<Option<BTreeMap<String, ToolServer>>> {
    let paths: Vec<&String> = match field {
        Some(ToolServersField::Inline(map)) => return Ok(Some(map.clone())),
        Some(ToolServersField::Path(path)) => vec![path],
        Some(ToolServersField::Paths(paths)) => paths.iter().collect(),
        None => {
            let default_path = root.join(".mcp.json");
            if path_exists(&default_path).await {
                return read_json(&default_path).await.map(Some);
            }
            return Ok(None);
        },
    };

    // Later files win on a shallow, per-server basis.
    let mut merged = BTreeMap::new();
    for entry in paths {
        let resolved = resolve_within_root(root, entry, "mcpServers path")?;
        if !path_exists(&resolved).await {
            continue;
        }
        let config: BTreeMap<String, ToolServer> = read_json(&resolved).await?;
        merged.extend(config);
    }
    Ok(Some(merged))
}

// ── Filesystem helpers ──────────────────────────────────────────────────────

fn collect_files(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        let entries = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok());
        for entry in entries {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files
}

fn markdown_files(dirs: &[PathBuf]) -> Vec<PathBuf> {
    collect_files(dirs)
        .into_iter()
        .filter(|file| file.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ── Frontmatter field helpers ───────────────────────────────────────────────

fn str_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn bool_field(data: &Map<String, Value>, key: &str) -> Option<bool> {
    match data.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// A list field accepts an actual list or a comma-separated string.
fn list_field(data: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match data.get(key)? {
        Value::Array(items) => Some(items.iter().map(value_to_string).collect()),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

fn dir_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}
