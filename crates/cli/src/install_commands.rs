//! The `replug install` command: plugin resolution, option plumbing, and
//! the sequential per-target convert-and-write loop.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, bail},
    serde::Deserialize,
    tracing::warn,
};

use {
    replug_convert::{AgentMode, ConvertOptions, PermissionMode, Target, convert},
    replug_install::{
        ConfirmPolicy, ConfirmService, WriteOptions, ensure_codex_agents_file, write_bundle,
    },
    replug_plugin::{PluginModel, load_plugin, resolve_plugin_root, resolve_within_root},
};

#[derive(Debug, clap::Args)]
pub struct InstallArgs {
    /// Plugin name (marketplace lookup) or path to a plugin directory.
    /// Defaults to the current directory.
    pub plugin: Option<String>,

    /// Target format: opencode | codex.
    #[arg(long, default_value = "opencode")]
    pub to: String,

    /// OpenCode output root (default: ~/.config/opencode).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Codex root (default: ~/.codex).
    #[arg(long)]
    pub codex_home: Option<String>,

    /// Agents root for Codex agent skills (default: ~/.agents).
    #[arg(long)]
    pub agents_home: Option<String>,

    /// Comma-separated extra targets to generate.
    #[arg(long)]
    pub also: Option<String>,

    /// Tool-access policy mode: none | broad | from-commands.
    #[arg(long, default_value = "broad")]
    pub permissions: String,

    /// Whether generated agents run as primary agents or subagents.
    #[arg(long, default_value = "subagent")]
    pub agent_mode: String,

    /// Infer a sampling temperature from each agent's name and description.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub infer_temperature: bool,

    /// Assume "yes" for all cleanup confirmations.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Never prompt; cleanup confirmations are declined.
    #[arg(long)]
    pub non_interactive: bool,
}

pub async fn run_install(args: InstallArgs) -> anyhow::Result<()> {
    let primary: Target = args.to.parse()?;
    let permissions: PermissionMode = args.permissions.parse()?;
    let options = ConvertOptions {
        agent_mode: AgentMode::parse(&args.agent_mode),
        infer_temperature: args.infer_temperature,
        permissions,
    };

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let input = args.plugin.as_deref().unwrap_or(".");
    let resolved = resolve_plugin_input(input, &cwd).await?;
    let root = resolve_plugin_root(&resolved).await?;
    let plugin = load_plugin(&root).await?;

    let roots = Roots {
        output: resolve_root(args.output.as_deref(), &[".config", "opencode"]),
        codex_home: resolve_root(args.codex_home.as_deref(), &[".codex"]),
        agents_home: resolve_root(args.agents_home.as_deref(), &[".agents"]),
    };
    let confirm = ConfirmService::new(confirm_policy(&args));

    // Each target converts and writes fully before the next one starts.
    install_target(primary, false, &plugin, &options, &roots, &confirm).await?;

    let mut codex_installed = primary == Target::Codex;
    for extra in extra_targets(args.also.as_deref()) {
        let Ok(target) = extra.parse::<Target>() else {
            warn!(target = %extra, "skipping unknown target");
            continue;
        };
        install_target(target, true, &plugin, &options, &roots, &confirm).await?;
        codex_installed = codex_installed || target == Target::Codex;
    }

    if codex_installed {
        ensure_codex_agents_file(&roots.codex_home).await?;
    }

    Ok(())
}

struct Roots {
    output: PathBuf,
    codex_home: PathBuf,
    agents_home: PathBuf,
}

async fn install_target(
    target: Target,
    is_extra: bool,
    plugin: &PluginModel,
    options: &ConvertOptions,
    roots: &Roots,
    confirm: &ConfirmService,
) -> anyhow::Result<()> {
    let bundle = convert(plugin, target, options);
    let destination = match target {
        Target::Codex => roots.codex_home.clone(),
        Target::OpenCode if is_extra => roots.output.join(target.name()),
        Target::OpenCode => roots.output.clone(),
    };

    write_bundle(
        &destination,
        &bundle,
        &WriteOptions {
            agents_home: &roots.agents_home,
            confirm,
        },
    )
    .await?;

    println!(
        "Installed {} to {}",
        plugin.manifest.name,
        destination.display()
    );
    Ok(())
}

fn confirm_policy(args: &InstallArgs) -> ConfirmPolicy {
    if args.yes {
        ConfirmPolicy::AssumeYes
    } else if args.non_interactive {
        ConfirmPolicy::NonInteractive
    } else {
        ConfirmPolicy::Interactive
    }
}

fn extra_targets(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

// ── Path resolution ─────────────────────────────────────────────────────────

fn resolve_root(value: Option<&str>, home_relative_default: &[&str]) -> PathBuf {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        return expand_home(value);
    }
    let mut path = home_dir();
    for segment in home_relative_default {
        path.push(segment);
    }
    path
}

fn expand_home(value: &str) -> PathBuf {
    if value == "~" {
        return home_dir();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home_dir().join(rest);
    }
    PathBuf::from(value)
}

fn home_dir() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the plugin argument: a direct path, a marketplace entry name,
/// or a `plugins/<name>` directory under the working directory.
async fn resolve_plugin_input(input: &str, cwd: &Path) -> anyhow::Result<PathBuf> {
    let direct = cwd.join(input);
    if tokio::fs::try_exists(&direct).await.unwrap_or(false) {
        return Ok(direct);
    }

    let slug = input.trim();
    if slug.is_empty() {
        bail!("Plugin name or path is required.");
    }

    if let Some(resolved) = resolve_marketplace_plugin(cwd, slug).await? {
        return Ok(resolved);
    }

    let plugins_dir = cwd.join("plugins").join(slug);
    if tokio::fs::try_exists(&plugins_dir).await.unwrap_or(false) {
        return Ok(plugins_dir);
    }

    bail!("Could not resolve plugin \"{slug}\".")
}

#[derive(Debug, Deserialize)]
struct Marketplace {
    #[serde(default)]
    plugins: Vec<MarketplaceEntry>,
}

#[derive(Debug, Deserialize)]
struct MarketplaceEntry {
    name: String,
    #[serde(default)]
    source: Option<String>,
}

async fn resolve_marketplace_plugin(root: &Path, slug: &str) -> anyhow::Result<Option<PathBuf>> {
    let marketplace_path = root.join(".claude-plugin").join("marketplace.json");
    if !tokio::fs::try_exists(&marketplace_path).await.unwrap_or(false) {
        return Ok(None);
    }

    let raw = tokio::fs::read_to_string(&marketplace_path).await?;
    let marketplace: Marketplace = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", marketplace_path.display()))?;

    let Some(entry) = marketplace.plugins.iter().find(|entry| entry.name == slug) else {
        return Ok(None);
    };
    let source = entry.source.as_deref().unwrap_or(".");
    let resolved = resolve_within_root(root, source, "marketplace plugin source")?;
    Ok(Some(resolved))
}
