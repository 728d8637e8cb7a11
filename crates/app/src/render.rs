#![forbid(unsafe_code)]

use lt_core::TreeNode;
use lt_core::favicon::record_icon_url;
use std::fmt::Write as _;

pub const ZERO_STATE: &str =
    "This is Zero State. To add your first node, run `linktree add <name>`.";

#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub extension_base: String,
    /// Append each link's derived favicon URL.
    pub show_icons: bool,
    /// Upper bound on a column's width, in characters.
    pub column_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extension_base: crate::config::DEFAULT_EXTENSION_BASE.to_string(),
            show_icons: false,
            column_width: 32,
        }
    }
}

/// Indented listing of every node with its URL.
pub fn render_outline(root: &TreeNode, options: &RenderOptions) -> String {
    if root.children.is_empty() {
        return format!("{ZERO_STATE}\n");
    }
    let mut out = String::new();
    for (depth, node) in root.walk() {
        let _ = write!(out, "{}{}", "  ".repeat(depth), label(node));
        if let Some(url) = node.record.url_str() {
            let _ = write!(out, "  {url}");
        }
        if options.show_icons
            && let Some(icon) = record_icon_url(&node.record, &options.extension_base)
        {
            let _ = write!(out, "  icon={icon}");
        }
        out.push('\n');
    }
    out
}

/// Side-by-side layout: one column per top-level node, descendants indented below it.
pub fn render_columns(root: &TreeNode, options: &RenderOptions) -> String {
    if root.children.is_empty() {
        return format!("{ZERO_STATE}\n");
    }
    let width_cap = options.column_width.max(4);

    let columns: Vec<Vec<String>> = root
        .children
        .iter()
        .map(|top| {
            let mut lines = vec![label(top)];
            lines.extend(
                top.walk()
                    .into_iter()
                    .map(|(depth, node)| format!("{}{}", "  ".repeat(depth + 1), label(node))),
            );
            lines.into_iter().map(|line| clip(line, width_cap)).collect()
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .map(|lines| lines.iter().map(|l| l.chars().count()).max().unwrap_or(0))
        .collect();
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut out = String::new();
    for row in 0..rows {
        let mut cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(lines, width)| {
                let cell = lines.get(row).map(String::as_str).unwrap_or_default();
                format!("{cell:<width$}")
            })
            .collect();
        while cells.last().is_some_and(|cell| cell.trim().is_empty()) {
            cells.pop();
        }
        out.push_str(cells.join(" | ").trim_end());
        out.push('\n');
    }
    out
}

fn label(node: &TreeNode) -> String {
    let mark = if node.record.is_complete() { "[x] " } else { "" };
    let folder = if node.record.url_str().is_none() { "/" } else { "" };
    format!("{mark}{}{folder}", node.name())
}

fn clip(line: String, width: usize) -> String {
    if line.chars().count() <= width {
        return line;
    }
    let mut clipped: String = line.chars().take(width - 1).collect();
    clipped.push('~');
    clipped
}
