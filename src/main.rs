use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nested_sets::{
    delete_recursively, LinkKind, MemoryStore, NestedSetConfig, Navigator, NodeArena, Row,
    TreeCache,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nested-sets", about = "Inspect and prune nested set trees stored as rows")]
struct Cli {
    /// `left` value of tree roots.
    #[arg(long, default_value_t = 1, global = true)]
    root_left: i64,

    /// Trust boundary data instead of validating each level.
    #[arg(long, global = true)]
    no_validate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Materialize one tree and print it as an indented outline.
    Outline {
        /// Rows file (`<id>\t<tree>\t<left>\t<right>\t<label>` per line).
        rows: PathBuf,
        /// Tree identifier to load.
        #[arg(long)]
        tree: u64,
    },
    /// Resolve the relations of a single node lazily.
    Links {
        /// Rows file.
        rows: PathBuf,
        /// Node identifier.
        #[arg(long)]
        node: u64,
        /// Relations to resolve (parents, parent, prev, next, children). Default: all.
        #[arg(long = "relation")]
        relations: Vec<String>,
    },
    /// Delete a node and its subtree, honoring delete guards.
    Delete {
        /// Rows file.
        rows: PathBuf,
        /// Node identifier.
        #[arg(long)]
        node: u64,
        /// Rows whose delete guard rejects deletion.
        #[arg(long)]
        veto: Vec<u64>,
        /// Run without a transaction (partial deletes are kept).
        #[arg(long)]
        no_transaction: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = NestedSetConfig::new()
        .with_root_left(cli.root_left)
        .with_level_validation(!cli.no_validate);

    match cli.command {
        Commands::Outline { rows, tree } => run_outline(rows, tree, config)?,
        Commands::Links {
            rows,
            node,
            relations,
        } => run_links(rows, node, relations, config)?,
        Commands::Delete {
            rows,
            node,
            veto,
            no_transaction,
        } => run_delete(rows, node, veto, no_transaction, config)?,
    }

    Ok(())
}

fn run_outline(rows_path: PathBuf, tree: u64, config: NestedSetConfig) -> Result<()> {
    let store = MemoryStore::new(read_rows_file(&rows_path)?);
    let mut cache = TreeCache::new(config);
    let arena = cache
        .load_tree(&store, &tree)
        .with_context(|| format!("failed to materialize tree {tree}"))?;

    let Some(root) = arena.root() else {
        println!("Tree {tree} has no rows.");
        return Ok(());
    };

    for (index, depth) in arena.pre_order(root) {
        let node = arena.node(index)?;
        let row = node.record();
        println!(
            "{:indent$}{}\tid={}\t[{}, {}]",
            "",
            row.label,
            row.id,
            row.left,
            row.right,
            indent = depth * 2
        );
    }
    Ok(())
}

fn run_links(
    rows_path: PathBuf,
    node: u64,
    relations: Vec<String>,
    config: NestedSetConfig,
) -> Result<()> {
    let kinds = if relations.is_empty() {
        LinkKind::ALL.to_vec()
    } else {
        relations
            .iter()
            .map(|name| name.parse::<LinkKind>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let store = MemoryStore::new(read_rows_file(&rows_path)?);
    let row = store
        .row(node)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("row {} not found in {}", node, rows_path.display()))?;

    let mut arena = NodeArena::new();
    let mut navigator = Navigator::new(&store, &mut arena, config);
    let index = navigator.adopt(row);

    for kind in kinds {
        let related = navigator
            .resolve(index, kind)
            .with_context(|| format!("failed to resolve `{kind}` of node {node}"))?;
        let labels: Vec<String> = related
            .iter()
            .filter_map(|&other| navigator.arena().get(other))
            .map(|other| format!("{}({})", other.record().label, other.record().id))
            .collect();
        println!("{kind}\t{}", if labels.is_empty() { "-".to_string() } else { labels.join(", ") });
    }
    println!("queries\t{}", store.query_count());
    Ok(())
}

fn run_delete(
    rows_path: PathBuf,
    node: u64,
    veto: Vec<u64>,
    no_transaction: bool,
    config: NestedSetConfig,
) -> Result<()> {
    let mut store = MemoryStore::new(read_rows_file(&rows_path)?).with_transactions(!no_transaction);
    for id in veto {
        store.veto(id);
    }
    let row = store
        .row(node)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("row {} not found in {}", node, rows_path.display()))?;

    let mut arena = NodeArena::new();
    let index = arena.intern(row);
    let report = delete_recursively(&mut store, &mut arena, index, config)
        .with_context(|| format!("recursive delete of node {node} failed"))?;

    if report.is_success() {
        println!("Deleted node {} ({} delete calls).", node, report.deleted);
    } else {
        println!(
            "Delete rejected at node {}; rolled back: {}.",
            report
                .rejected_by
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string()),
            report.rolled_back
        );
    }
    println!("{} rows remain.", store.rows().len());
    Ok(())
}

fn read_rows_file(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("failed to open rows file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut rest = trimmed;
        let mut numbers = [0i64; 4];
        for (slot, name) in numbers.iter_mut().zip(["id", "tree", "left", "right"]) {
            let (field, tail) = split_field(rest);
            if field.is_empty() {
                anyhow::bail!("missing {} on line {}", name, line_no + 1);
            }
            *slot = field
                .parse()
                .with_context(|| format!("invalid {} '{}' on line {}", name, field, line_no + 1))?;
            rest = tail;
        }
        let [id, tree, left, right] = numbers;
        let label = rest.trim().to_string();

        rows.push(Row::new(
            u64::try_from(id).with_context(|| format!("negative id on line {}", line_no + 1))?,
            u64::try_from(tree).with_context(|| format!("negative tree on line {}", line_no + 1))?,
            left,
            right,
            label,
        ));
    }

    Ok(rows)
}

/// Split off the first whitespace-delimited field
fn split_field(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    input.split_at(end)
}
