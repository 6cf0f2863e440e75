//! Plain-text rendering of menus, tables and forms

use crate::fields::RenderHint;
use crate::form::FormSession;
use crate::navigation::{MenuState, TableSession};
use crate::view::{SectionKind, SectionNode};
use colored::*;

pub fn render_menu(menu: &MenuState) {
    if menu.roots.is_empty() {
        println!("{}", "No menu entries available".dimmed());
        return;
    }
    for (depth, node) in menu.visible() {
        let marker = if node.is_leaf() {
            "•"
        } else if menu.is_expanded(node.id) {
            "▾"
        } else {
            "▸"
        };
        let model = node
            .res_model
            .as_deref()
            .map(|m| format!(" ({})", m).dimmed().to_string())
            .unwrap_or_default();
        println!(
            "{}{} {} {}{}",
            "  ".repeat(depth),
            marker,
            format!("[{}]", node.id).dimmed(),
            node.name.bright_white(),
            model
        );
    }
}

pub fn render_table(table: &TableSession) {
    println!(
        "{} {} {}",
        "📋".bright_blue(),
        table.model().bright_white().bold(),
        format!("({} rows)", table.len()).dimmed()
    );
    if table.is_empty() {
        println!("{}", "No records found".dimmed());
        return;
    }

    let mut widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|c| table.header(c).chars().count())
        .collect();
    for row in 0..table.len() {
        for (i, column) in table.columns().iter().enumerate() {
            widths[i] = widths[i].max(table.cell(row, column).chars().count().min(40));
        }
    }

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", table.header(c), w = *w))
        .collect();
    println!("{:>6}  {}", "ID".bold(), header.join("  ").bold());

    for row in 0..table.len() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", truncate(&table.cell(row, c), 40), w = *w))
            .collect();
        let id = table.record_id(row).map(|id| id.to_string()).unwrap_or_default();
        println!("{:>6}  {}", id.dimmed(), cells.join("  "));
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn render_form(form: &FormSession) {
    let title = match form.record_id() {
        Some(id) => format!("{} #{}", form.model(), id),
        None => format!("New {}", form.model()),
    };
    let dirty = if form.is_dirty() {
        " (modified)".yellow().to_string()
    } else {
        String::new()
    };
    println!("{} {}{}", "📝".bright_blue(), title.bright_white().bold(), dirty);

    if let Some(message) = &form.errors().form {
        println!("{} {}", "✗".bright_red().bold(), message.red());
    }
    for section in &form.layout().sections {
        render_section(form, section, 0);
    }
}

fn render_section(form: &FormSession, section: &SectionNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match (section.kind, &section.title) {
        (SectionKind::Separator, title) => {
            let text = title.as_deref().unwrap_or_default();
            println!("{}{} {}", indent, "──".dimmed(), text.dimmed());
        }
        (SectionKind::Notebook, _) => {}
        (_, Some(title)) => println!("{}{}", indent, title.bright_cyan().bold()),
        (_, None) => {}
    }

    let field_indent = if section.title.is_some() { depth + 1 } else { depth };
    for field in &section.fields {
        render_field(form, field, field_indent);
    }
    for child in &section.children {
        render_section(form, child, depth + 1);
    }
}

fn render_field(form: &FormSession, field: &str, depth: usize) {
    let Some(def) = form.architecture().field(field) else {
        return;
    };
    let value = match form.render_hint(field) {
        Some(RenderHint::Placeholder) => "(not supported)".dimmed().to_string(),
        Some(RenderHint::Select) if form.selection_options(field).is_empty() => {
            format!("{} {}", form.display_value(field), "(options loading)".dimmed())
        }
        _ => form.display_value(field),
    };
    let required = if def.required { "*".red().to_string() } else { String::new() };
    let readonly = if def.readonly { " 🔒" } else { "" };
    println!(
        "{}{}{}: {}{}",
        "  ".repeat(depth),
        def.label.bold(),
        required,
        value,
        readonly
    );
    if let Some(error) = form.errors().fields.get(field) {
        println!("{}  {} {}", "  ".repeat(depth), "✗".bright_red(), error.red());
    }
}
