//! Plain-text rendering of turns and UI specs for the terminal surface.

use ontoclaw_core::{Role, Row, Turn, UiElement, UiSpec};
use serde_json::Value;
use std::collections::HashMap;

/// Rows shown before a table is cut short.
const MAX_ROWS: usize = 20;
/// Widest a table cell may get.
const MAX_CELL: usize = 60;

pub fn render_turn(turn: &Turn) -> String {
    match turn.role {
        Role::User => format!("you> {}", turn.content),
        Role::Assistant if turn.is_explanation => format!("  ... {}", turn.content),
        Role::Assistant => format!("bot> {}", turn.content),
    }
}

/// Render one pending widget. `number` is its 1-based position, used by the
/// `/select`, `/click` and `/submit` commands.
pub fn render_spec(number: usize, spec: &UiSpec, selections: &HashMap<String, Value>) -> String {
    match &spec.element {
        UiElement::Markdown { content, .. } => indent(content),
        UiElement::Dataframe { rows } | UiElement::Table { rows } => render_rows(rows),
        UiElement::Info { text } => format!("  [info] {}", text),
        UiElement::Warning { text } => format!("  [warning] {}", text),
        UiElement::Error { text } => format!("  [error] {}", text),
        UiElement::Button { label, .. } => {
            format!("  [{}] <{}>   (/click {})", number, label, number)
        }
        UiElement::Radio { label, options, .. } => {
            let selected = selections.get(&spec.id());
            let mut out = format!("  [{}] {}", number, label);
            for (i, option) in options.iter().enumerate() {
                let mark = if selected == Some(&option.value()) { "(*)" } else { "( )" };
                let value = option.value();
                let shown = option.display_label();
                match value.as_str() {
                    Some(v) if v != shown => {
                        out.push_str(&format!("\n      {} {}. {}  <{}>", mark, i + 1, shown, v))
                    }
                    _ => out.push_str(&format!("\n      {} {}. {}", mark, i + 1, shown)),
                }
            }
            out.push_str(&format!("\n      (/select {} <n>)", number));
            out
        }
        UiElement::Form {
            label,
            fields,
            submit_label,
            ..
        } => {
            let mut out = format!("  [{}] {}", number, label);
            for field in fields {
                if field.default.is_empty() {
                    out.push_str(&format!("\n      {}: {}", field.id, field.label));
                } else {
                    out.push_str(&format!(
                        "\n      {}: {} [{}]",
                        field.id, field.label, field.default
                    ));
                }
            }
            out.push_str(&format!(
                "\n      (/submit {} field=value ...  to {})",
                number,
                submit_label.to_lowercase()
            ));
            out
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    };
    let text = text.replace('\n', " ");
    if text.chars().count() > MAX_CELL {
        let cut: String = text.chars().take(MAX_CELL - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

/// Column-aligned table. Columns follow the first row, then any extra keys
/// later rows introduce.
pub fn render_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "    (no rows)".to_string();
    }
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let shown = &rows[..rows.len().min(MAX_ROWS)];
    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(*c))).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect();
        format!("    {}", padded.join(" | ").trim_end())
    };

    let mut out = vec![line(columns.clone())];
    out.push(format!(
        "    {}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    ));
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    if rows.len() > MAX_ROWS {
        out.push(format!("    ... {} more rows", rows.len() - MAX_ROWS));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoclaw_core::{AlignmentSuggestion, ConceptType, RadioOption};
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            row(&[("s", json!("http://ex.org/Acme")), ("n", json!(1))]),
            row(&[("s", json!("x")), ("n", Value::Null)]),
        ];
        let text = render_rows(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("s"));
        assert!(lines[2].contains("http://ex.org/Acme | 1"));
    }

    #[test]
    fn long_tables_are_cut() {
        let rows: Vec<Row> = (0..25).map(|i| row(&[("i", json!(i))])).collect();
        assert!(render_rows(&rows).ends_with("... 5 more rows"));
    }

    #[test]
    fn radio_marks_selection() {
        let spec = UiSpec::with_id(
            "r",
            UiElement::Radio {
                label: "Pick".into(),
                options: vec![
                    RadioOption::Concept(AlignmentSuggestion {
                        uri: "http://ex.org/Acme".into(),
                        label: "Acme".into(),
                        concept_type: ConceptType::Individual,
                        score: 0.7,
                    }),
                    RadioOption::Concept(AlignmentSuggestion::no_match()),
                ],
                default_index: 0,
            },
        );
        let mut selections = HashMap::new();
        selections.insert("r".to_string(), json!("http://ex.org/Acme"));
        let text = render_spec(2, &spec, &selections);
        assert!(text.starts_with("  [2] Pick"));
        assert!(text.contains("(*) 1. Acme  <http://ex.org/Acme>"));
        assert!(text.contains("( ) 2."));
    }
}
