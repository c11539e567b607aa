//! Terminal tables for run summaries and the table catalogue.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{ASCII_MARKDOWN, UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use omop_model::{OmopTable, TableIssue, TableStatus, TableSummary, schema_for};

/// How a table is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    /// Box drawing and colors for a terminal.
    Styled,
    /// Markdown pipes, no colors, no wrapping.
    Plain,
}

/// One row per table plus a total row.
pub fn render_summary(summaries: &[TableSummary], style: SummaryStyle) -> String {
    let mut table = Table::new();
    apply_style(&mut table, style);
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Status"),
        header_cell("Input"),
        header_cell("Output"),
        header_cell("Quarantined"),
        header_cell("Warnings"),
        header_cell("Failure"),
    ]);
    for index in 2..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut ordered: Vec<&TableSummary> = summaries.iter().collect();
    ordered.sort_by_key(|summary| summary.table);
    let (mut input, mut output, mut quarantined, mut warnings) = (0, 0, 0, 0);
    for summary in &ordered {
        input += summary.input_rows;
        output += summary.output_rows;
        quarantined += summary.quarantined_rows;
        warnings += summary.warning_count();
        table.add_row(vec![
            Cell::new(summary.table.name())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            status_cell(summary.status),
            Cell::new(summary.input_rows),
            Cell::new(summary.output_rows),
            count_cell(summary.quarantined_rows, Color::Yellow),
            count_cell(summary.warning_count(), Color::Yellow),
            match &summary.failure {
                Some(reason) => Cell::new(reason).fg(Color::Red),
                None => dim_cell("-"),
            },
        ]);
    }
    let emitted = ordered.iter().filter(|summary| summary.is_emitted()).count();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{emitted}/{} emitted", ordered.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(input).add_attribute(Attribute::Bold),
        Cell::new(output).add_attribute(Attribute::Bold),
        count_cell(quarantined, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(warnings, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table.to_string()
}

/// Every warning of the run, grouped by table. `None` when there are none.
pub fn render_issues(summaries: &[TableSummary], style: SummaryStyle) -> Option<String> {
    let mut issues: Vec<(OmopTable, &TableIssue)> = summaries
        .iter()
        .flat_map(|summary| summary.issues.iter().map(move |issue| (summary.table, issue)))
        .collect();
    if issues.is_empty() {
        return None;
    }
    issues.sort_by(|a, b| (a.0, a.1.kind).cmp(&(b.0, b.1.kind)));

    let mut table = Table::new();
    apply_style(&mut table, style);
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Kind"),
        header_cell("Column"),
        header_cell("Rows"),
        header_cell("Message"),
    ]);
    align_column(&mut table, 3, CellAlignment::Right);
    for (owner, issue) in issues {
        table.add_row(vec![
            Cell::new(owner.name()),
            Cell::new(issue.kind.as_str()).fg(Color::Yellow),
            match &issue.column {
                Some(column) => Cell::new(column),
                None => dim_cell("-"),
            },
            Cell::new(issue.count),
            Cell::new(&issue.message),
        ]);
    }
    Some(table.to_string())
}

/// Supported tables with their CDM layout.
pub fn render_catalogue(style: SummaryStyle) -> String {
    let mut table = Table::new();
    apply_style(&mut table, style);
    if style == SummaryStyle::Styled {
        table.load_preset(UTF8_FULL_CONDENSED);
    }
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Description"),
        header_cell("Primary key"),
        header_cell("Columns"),
    ]);
    for omop in OmopTable::ALL {
        let schema = schema_for(omop);
        let columns: Vec<&str> = schema.column_names().collect();
        table.add_row(vec![
            Cell::new(omop.cdm_name())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(omop.description()),
            match schema.primary_key {
                Some(key) => Cell::new(key),
                None => dim_cell("-"),
            },
            Cell::new(columns.join(", ")),
        ]);
    }
    table.to_string()
}

fn apply_style(table: &mut Table, style: SummaryStyle) {
    match style {
        SummaryStyle::Styled => {
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .apply_modifier(UTF8_SOLID_INNER_BORDERS)
                .set_content_arrangement(ContentArrangement::Dynamic);
        }
        SummaryStyle::Plain => {
            table
                .load_preset(ASCII_MARKDOWN)
                .force_no_tty()
                .set_content_arrangement(ContentArrangement::Disabled);
        }
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: TableStatus) -> Cell {
    match status {
        TableStatus::Emitted => Cell::new("emitted").fg(Color::Green),
        TableStatus::Failed => Cell::new("failed")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
