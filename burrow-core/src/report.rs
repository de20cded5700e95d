// Report rendering from a discovery tree

use crate::config::ShowField;
use crate::error::Result;
use crate::tree::{DiscoveryTree, NodeId, TraversalOrder, TreeNode};
use burrow_scanner::ResponseRecord;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Tree,
    Json,
    Csv,
    Markdown,
    Plain,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tree" => Some(ReportFormat::Tree),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            "plain" | "text" | "txt" => Some(ReportFormat::Plain),
            _ => None,
        }
    }
}

/// Renders the tree in the requested format. Sibling order follows
/// insertion order, which is nondeterministic across runs.
pub fn render(tree: &DiscoveryTree, format: ReportFormat, show: &[ShowField]) -> Result<String> {
    Ok(match format {
        ReportFormat::Tree => render_tree(tree, show),
        ReportFormat::Json => render_json(tree, show)?,
        ReportFormat::Csv => render_csv(tree),
        ReportFormat::Markdown => render_markdown(tree),
        ReportFormat::Plain => render_plain(tree, show),
    })
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn colored_status(status: u16) -> ColoredString {
    let text = status.to_string();
    match status {
        100..=199 => text.white(),
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        500..=599 => text.red(),
        _ => text.normal(),
    }
}

/// Inline `key=value` details selected by `--show`
fn inline_details(record: &ResponseRecord, show: &[ShowField]) -> Vec<String> {
    show.iter()
        .filter_map(|field| match field {
            ShowField::Size => Some(format!("size={}", record.content_length)),
            ShowField::Time => Some(format!("time={}ms", record.elapsed_ms())),
            ShowField::Words => Some(format!("words={}", record.word_count)),
            ShowField::Lines => Some(format!("lines={}", record.line_count)),
            ShowField::Hash => Some(format!("hash={}", record.hash)),
            ShowField::Headers | ShowField::Body => None,
        })
        .collect()
}

/// Multi-line details (headers, body) printed under a node
fn block_details(record: &ResponseRecord, show: &[ShowField]) -> Vec<String> {
    let mut lines = Vec::new();
    if show.contains(&ShowField::Headers) {
        let mut headers: Vec<(&String, &String)> = record.headers.iter().collect();
        headers.sort();
        for (name, value) in headers {
            lines.push(format!("{}: {}", name, value));
        }
    }
    if show.contains(&ShowField::Body)
        && let Some(body) = &record.body
    {
        lines.extend(body.lines().map(str::to_string));
    }
    lines
}

fn render_tree(tree: &DiscoveryTree, show: &[ShowField]) -> String {
    let mut out = String::new();
    let Some(root) = tree.root() else {
        out.push_str("(empty)\n");
        return out;
    };

    if let Some(node) = tree.get(root) {
        out.push_str(&format!("{}\n", node.word.bold()));
    }
    render_children(tree, root, "", show, &mut out);
    out
}

fn render_children(
    tree: &DiscoveryTree,
    id: NodeId,
    prefix: &str,
    show: &[ShowField],
    out: &mut String,
) {
    let Some(node) = tree.get(id) else {
        return;
    };

    let count = node.children().len();
    for (i, &child_id) in node.children().iter().enumerate() {
        let Some(child) = tree.get(child_id) else {
            continue;
        };
        let is_last = i + 1 == count;
        let branch = if is_last { "└── " } else { "├── " };
        let continuation = if is_last { "    " } else { "│   " };

        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&node_line(child, show));
        out.push('\n');

        if let Some(record) = &child.record {
            for line in block_details(record, show) {
                out.push_str(&format!("{}{}  {}\n", prefix, continuation, line.dimmed()));
            }
        }

        let next_prefix = format!("{}{}", prefix, continuation);
        render_children(tree, child_id, &next_prefix, show, out);
    }
}

fn node_line(node: &TreeNode, show: &[ShowField]) -> String {
    match &node.record {
        Some(record) => {
            let mut line = format!("[{}] {}", colored_status(record.status_code), node.word);
            let details = inline_details(record, show);
            if !details.is_empty() {
                line.push_str(&format!("  {}", details.join(" ").dimmed()));
            }
            line
        }
        None => node.word.clone(),
    }
}

fn render_plain(tree: &DiscoveryTree, show: &[ShowField]) -> String {
    let mut out = String::new();
    for id in tree.traverse(TraversalOrder::DepthFirst) {
        let Some(record) = tree.get(id).and_then(|n| n.record.as_ref()) else {
            continue;
        };
        out.push_str(&record.url);
        let details = inline_details(record, show);
        if !details.is_empty() {
            out.push(' ');
            out.push_str(&details.join(" "));
        }
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(tree: &DiscoveryTree) -> String {
    let mut out = String::from("depth,word,url,status,size,time_ms,words,lines,hash\n");
    for id in tree.traverse(TraversalOrder::DepthFirst) {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let Some(record) = &node.record else {
            continue;
        };
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            node.depth,
            csv_field(&node.word),
            csv_field(&record.url),
            record.status_code,
            record.content_length,
            record.elapsed_ms(),
            record.word_count,
            record.line_count,
            record.hash
        ));
    }
    out
}

fn render_markdown(tree: &DiscoveryTree) -> String {
    let mut out = String::from("| Depth | URL | Status | Size | Time (ms) |\n");
    out.push_str("|-------|-----|--------|------|-----------|\n");
    for id in tree.traverse(TraversalOrder::DepthFirst) {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let Some(record) = &node.record else {
            continue;
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            node.depth,
            record.url.replace('|', "\\|"),
            record.status_code,
            record.content_length,
            record.elapsed_ms()
        ));
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonNode<'a> {
    word: &'a str,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    words: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a std::collections::HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    children: Vec<JsonNode<'a>>,
}

fn json_node<'a>(tree: &'a DiscoveryTree, id: NodeId, show: &[ShowField]) -> Option<JsonNode<'a>> {
    let node = tree.get(id)?;
    let record = node.record.as_ref();

    Some(JsonNode {
        word: &node.word,
        depth: node.depth,
        url: record.map(|r| r.url.as_str()),
        status: record.map(|r| r.status_code),
        size: record.map(|r| r.content_length),
        time_ms: record.map(|r| r.elapsed_ms()),
        words: record.map(|r| r.word_count),
        lines: record.map(|r| r.line_count),
        hash: record.map(|r| r.hash.as_str()),
        headers: record
            .filter(|_| show.contains(&ShowField::Headers))
            .map(|r| &r.headers),
        body: record
            .filter(|_| show.contains(&ShowField::Body))
            .and_then(|r| r.body.as_deref()),
        children: node
            .children()
            .iter()
            .filter_map(|&child| json_node(tree, child, show))
            .collect(),
    })
}

fn render_json(tree: &DiscoveryTree, show: &[ShowField]) -> Result<String> {
    let root = tree.root().and_then(|id| json_node(tree, id, show));
    let report = serde_json::json!({
        "generator": "Burrow",
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "discovered": tree.discovered().count(),
        "root": root,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}
