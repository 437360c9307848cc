//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use outline_core::{Document, DocumentModel, RootHandle};
use outline_sync::{BuildCoordinator, CoordinatorConfig, OutlineRow, OutlineView, ShutdownSignals};
use outline_tree::{build_tree, FilterResult, ItemKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const CONFIG_DIR: &str = ".outline";
const CONFIG_FILE: &str = "config.json";

fn default_config_path(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Resolves the coordinator config. An explicit path must exist; otherwise
/// the default location under `base` is used when present.
fn load_config(explicit: Option<&Path>, base: &Path) -> Result<CoordinatorConfig> {
    if let Some(path) = explicit {
        return Ok(CoordinatorConfig::load(path)?);
    }

    let path = default_config_path(base);
    if path.exists() {
        debug!("Using config {}", path.display());
        Ok(CoordinatorConfig::load(&path)?)
    } else {
        Ok(CoordinatorConfig::default())
    }
}

/// Initialize Outline in a directory.
pub fn init(path: &Path) -> Result<()> {
    let config_path = default_config_path(path);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    CoordinatorConfig::default().save(&config_path)?;

    println!("{} Initialized Outline in {}", "✓".green(), path.display());
    println!("  Run {} to print a document", "outline show <document>".cyan());

    Ok(())
}

/// Filter settings for `show`.
#[derive(Debug, Default)]
pub struct ShowOptions {
    pub query: String,
    pub flatten: bool,
    pub chips: Vec<String>,
    pub graphs: Vec<String>,
    pub managers: Vec<String>,
    pub json: bool,
}

/// Build and print the outline of a document.
pub async fn show(document: &Path, config: Option<&Path>, options: ShowOptions) -> Result<()> {
    let config = load_config(config, &std::env::current_dir()?)?;
    let doc = Document::load(document)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Building outline...");

    let rows = outline_rows(doc, config, &options).await;
    spinner.finish_and_clear();
    let rows = rows?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No items match \"{}\"", options.query);
        return Ok(());
    }

    let query_active = !options.query.trim().is_empty() || !options.chips.is_empty();
    for row in &rows {
        println!("{}", format_row(row, query_active));
    }

    Ok(())
}

/// Runs one background build and filter pass.
async fn outline_rows(
    doc: Document,
    config: CoordinatorConfig,
    options: &ShowOptions,
) -> Result<Vec<OutlineRow>> {
    let roots = select_roots(&doc, &options.managers)?;

    let model: Arc<dyn DocumentModel> = Arc::new(doc);
    let (coordinator, events) =
        BuildCoordinator::new(model, config, Arc::new(ShutdownSignals::new()));
    let mut view = OutlineView::new(coordinator, events);

    for chip in &options.chips {
        view.add_chip(chip);
    }
    view.set_flatten(options.flatten);
    view.set_graphs_to_show(options.graphs.clone());
    view.set_query(&options.query);

    view.request_build(roots);
    if !view.settle().await && view.tree().is_empty() {
        return Err("outline build was cancelled".into());
    }

    Ok(view.rows())
}

fn select_roots(doc: &Document, paths: &[String]) -> Result<Vec<RootHandle>> {
    if paths.is_empty() {
        return Ok(doc.managers());
    }
    paths
        .iter()
        .map(|path| {
            doc.manager_by_path(path)
                .ok_or_else(|| format!("Unknown manager: {}", path).into())
        })
        .collect()
}

fn format_row(row: &OutlineRow, query_active: bool) -> String {
    let indent = "  ".repeat(row.depth);

    let name = match row.kind {
        ItemKind::Manager => row.display_name.blue().bold(),
        ItemKind::Graph => row.display_name.cyan(),
        ItemKind::Node => row.display_name.normal(),
        ItemKind::Property => row.display_name.dimmed(),
    };
    let name = if query_active && row.result >= FilterResult::Shown {
        row.display_name.yellow().bold()
    } else if query_active {
        name.dimmed()
    } else {
        name
    };

    format!("{}{} {}", indent, name, format!("({})", row.kind).dimmed())
}

/// Show document and outline statistics.
pub fn stats(document: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config, &std::env::current_dir()?)?;
    let doc = Document::load(document)?;
    let stats = doc.stats();

    println!("{}", "Document".cyan().bold());
    println!("  Managers:    {}", stats.managers);
    println!("  Graphs:      {}", stats.graphs);
    println!("  Nodes:       {}", stats.nodes);
    println!("  Comments:    {}", stats.annotations);
    println!("  Properties:  {}", stats.properties);

    let tree = build_tree(&doc, &doc.managers(), config.builder, || false)
        .ok_or("outline build was cancelled")?;

    println!();
    println!("{}", "Outline".cyan().bold());
    for kind in [
        ItemKind::Manager,
        ItemKind::Graph,
        ItemKind::Node,
        ItemKind::Property,
    ] {
        println!("  {:<12} {}", format!("{}s:", kind), tree.count_kind(kind));
    }
    println!("  {:<12} {}", "Total:", tree.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_sync::BuildMode;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const QUEST: &str = r#"{
        "managers": [{
            "name": "Quest",
            "graphs": [{
                "name": "Main",
                "nodes": [
                    { "name": "Start" },
                    { "name": "Talk", "parent": "Start", "type": "DialogueNode" }
                ]
            }, {
                "name": "Side",
                "nodes": [{ "name": "Fetch" }]
            }]
        }]
    }"#;

    fn quest() -> Document {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(QUEST.as_bytes()).unwrap();
        Document::load(file.path()).unwrap()
    }

    fn keys(rows: &[OutlineRow]) -> Vec<(usize, &str)> {
        rows.iter().map(|r| (r.depth, r.key.as_str())).collect()
    }

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempdir().unwrap();
        init(dir.path()).unwrap();

        let path = default_config_path(dir.path());
        assert_eq!(CoordinatorConfig::load(&path).unwrap(), CoordinatorConfig::default());

        // A second init leaves the file alone.
        init(dir.path()).unwrap();
    }

    #[test]
    fn test_load_config_resolution() {
        let dir = tempdir().unwrap();
        assert_eq!(load_config(None, dir.path()).unwrap(), CoordinatorConfig::default());

        let custom = CoordinatorConfig {
            mode: BuildMode::Sync,
            ..CoordinatorConfig::default()
        };
        custom.save(default_config_path(dir.path())).unwrap();
        assert_eq!(load_config(None, dir.path()).unwrap().mode, BuildMode::Sync);

        let missing = dir.path().join("missing.json");
        assert!(load_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_select_roots() {
        let doc = quest();
        assert_eq!(select_roots(&doc, &[]).unwrap().len(), 1);
        assert!(select_roots(&doc, &["Quest".to_string()]).is_ok());
        assert!(select_roots(&doc, &["Nope".to_string()]).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_outline_rows_with_query() {
        let options = ShowOptions {
            query: "talk".to_string(),
            ..ShowOptions::default()
        };
        let rows = outline_rows(quest(), CoordinatorConfig::default(), &options)
            .await
            .unwrap();

        assert_eq!(
            keys(&rows),
            [
                (0, "Quest"),
                (1, "Quest/Main"),
                (2, "Quest/Main/Start"),
                (3, "Quest/Main/Talk"),
            ]
        );
        assert_eq!(rows[3].result, FilterResult::Shown);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_outline_rows_flatten_and_scope() {
        let options = ShowOptions {
            chips: vec!["Tag:Graph".to_string()],
            flatten: true,
            ..ShowOptions::default()
        };
        let rows = outline_rows(quest(), CoordinatorConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(keys(&rows), [(0, "Quest/Main"), (0, "Quest/Side")]);

        let options = ShowOptions {
            graphs: vec!["Quest/Side".to_string()],
            ..ShowOptions::default()
        };
        let rows = outline_rows(quest(), CoordinatorConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(
            keys(&rows),
            [(0, "Quest"), (1, "Quest/Side"), (2, "Quest/Side/Fetch")]
        );
    }

    #[test]
    fn test_format_row_indents_by_depth() {
        colored::control::set_override(false);
        let row = OutlineRow {
            depth: 2,
            key: "Quest/Main/Talk".to_string(),
            display_name: "Talk".to_string(),
            kind: ItemKind::Node,
            result: FilterResult::Shown,
        };
        assert_eq!(format_row(&row, true), "    Talk (node)");
    }
}
