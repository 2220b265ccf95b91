//! Line-oriented chat surface for a single local session
//!
//! Free text goes to the agent. Lines starting with `/` drive the widgets the
//! last cycle left pending, which are numbered from 1 in render order.

use crate::render::{render_spec, render_turn};
use ontoclaw_agent::{Session, SessionKey, TaskExecutor, TurnOutcome};
use ontoclaw_core::{CallbackEvent, OntoclawConfig, Role, UiElement};
use ontoclaw_graph::OntologyFormat;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const HELP: &str = "\
Type a request in plain words, or one of:
  /load <path> [format]        load an ontology (turtle, rdfxml, ntriples, nquads, trig)
  /doc <path> [name]           add a document from a text file
  /select <widget> <n>         choose option n on a radio
  /click <widget>              press a button
  /submit <widget> k=v ...     submit a form; unset fields keep their defaults
  /state                       show what the session holds
  /help                        this text
  /quit                        leave
Widgets are named by their [number] or by id. Quote values containing spaces.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Load { path: String, format: Option<String> },
    Doc { path: String, name: Option<String> },
    Select { widget: String, option: usize },
    Click { widget: String },
    Submit { widget: String, fields: Vec<(String, String)> },
    State,
    Help,
    Quit,
    /// Unusable input, with the reason.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        let words = split_words(rest);
        let Some((name, args)) = words.split_first() else {
            return Command::Invalid("empty command".into());
        };

        match (name.as_str(), args) {
            ("load", [path]) => Command::Load {
                path: path.clone(),
                format: None,
            },
            ("load", [path, format]) => Command::Load {
                path: path.clone(),
                format: Some(format.clone()),
            },
            ("load", _) => Command::Invalid("usage: /load <path> [format]".into()),
            ("doc", [path]) => Command::Doc {
                path: path.clone(),
                name: None,
            },
            ("doc", [path, name]) => Command::Doc {
                path: path.clone(),
                name: Some(name.clone()),
            },
            ("doc", _) => Command::Invalid("usage: /doc <path> [name]".into()),
            ("select", [widget, n]) => match n.parse::<usize>() {
                Ok(option) if option > 0 => Command::Select {
                    widget: widget.clone(),
                    option,
                },
                _ => Command::Invalid(format!("not an option number: {}", n)),
            },
            ("select", _) => Command::Invalid("usage: /select <widget> <n>".into()),
            ("click", [widget]) => Command::Click {
                widget: widget.clone(),
            },
            ("click", _) => Command::Invalid("usage: /click <widget>".into()),
            ("submit", [widget, pairs @ ..]) => {
                let mut fields = Vec::new();
                for pair in pairs {
                    match pair.split_once('=') {
                        Some((k, v)) if !k.is_empty() => fields.push((k.to_string(), v.to_string())),
                        _ => return Command::Invalid(format!("expected field=value, got '{}'", pair)),
                    }
                }
                Command::Submit {
                    widget: widget.clone(),
                    fields,
                }
            }
            ("submit", _) => Command::Invalid("usage: /submit <widget> field=value ...".into()),
            ("state", []) => Command::State,
            ("help", _) => Command::Help,
            ("quit", _) | ("exit", _) => Command::Quit,
            (other, _) => Command::Invalid(format!("unknown command /{}", other)),
        }
    }
}

/// Whitespace split that keeps double-quoted runs together.
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;
    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        words.push(current);
    }
    words
}

pub struct Terminal {
    executor: Arc<TaskExecutor>,
    session: Session,
    config: OntoclawConfig,
}

impl Terminal {
    pub fn new(executor: Arc<TaskExecutor>, key: SessionKey, config: OntoclawConfig) -> Self {
        Self {
            executor,
            session: Session::new(key),
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Greeting plus command help.
    pub fn banner(&self) -> String {
        let mut out: Vec<String> = self.session.history().iter().map(render_turn).collect();
        out.push(String::new());
        out.push(HELP.to_string());
        out.join("\n")
    }

    /// Run one line. `None` means the user asked to leave.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let command = Command::parse(line);
        debug!(?command, "terminal command");
        let outcome = match command {
            Command::Quit => return None,
            Command::Say(text) if text.is_empty() => return Some(String::new()),
            Command::Say(text) => self.executor.handle_user_input(&mut self.session, &text).await,
            Command::Help => return Some(HELP.to_string()),
            Command::Invalid(reason) => return Some(format!("  [error] {}", reason)),
            Command::State => {
                return Some(match serde_json::to_string_pretty(&self.session.state()) {
                    Ok(json) => json,
                    Err(e) => format!("  [error] {}", e),
                })
            }
            Command::Load { path, format } => {
                let format = match format.map(|f| f.parse::<OntologyFormat>()).transpose() {
                    Ok(format) => format,
                    Err(e) => return Some(format!("  [error] {}", e)),
                };
                let path = self.config.resolve_path(&path);
                self.executor.load_ontology(&mut self.session, &path, format)
            }
            Command::Doc { path, name } => {
                let path = self.config.resolve_path(&path);
                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => return Some(format!("  [error] cannot read {}: {}", path.display(), e)),
                };
                let name = name.unwrap_or_else(|| file_name(&path));
                self.executor.add_document(&mut self.session, &name, &content)
            }
            Command::Select { widget, option } => {
                let id = match self.widget_id(&widget) {
                    Ok(id) => id,
                    Err(reason) => return Some(format!("  [error] {}", reason)),
                };
                return Some(match self.session.select_index(&id, option - 1) {
                    Ok(value) => format!("  selected {}", value),
                    Err(e) => format!("  [error] {}", e),
                });
            }
            Command::Click { widget } => match self.callback(&widget, None) {
                Ok(event) => self.executor.handle_callback(&mut self.session, event).await,
                Err(reason) => return Some(format!("  [error] {}", reason)),
            },
            Command::Submit { widget, fields } => {
                let data: Map<String, Value> = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                match self.callback(&widget, Some(data)) {
                    Ok(event) => self.executor.handle_callback(&mut self.session, event).await,
                    Err(reason) => return Some(format!("  [error] {}", reason)),
                }
            }
        };
        self.session.publish_defaults();
        Some(self.render(&outcome))
    }

    /// Resolve a widget reference: a 1-based position or an id.
    fn widget_id(&self, widget: &str) -> Result<String, String> {
        let pending = self.session.pending_ui();
        if let Ok(n) = widget.parse::<usize>() {
            return match n.checked_sub(1).and_then(|i| pending.get(i)) {
                Some(spec) => Ok(spec.id()),
                None => Err(format!("no widget [{}]", n)),
            };
        }
        pending
            .iter()
            .find(|s| s.id() == widget)
            .map(|s| s.id())
            .ok_or_else(|| format!("no widget '{}'", widget))
    }

    fn callback(
        &self,
        widget: &str,
        data: Option<Map<String, Value>>,
    ) -> Result<CallbackEvent, String> {
        let id = self.widget_id(widget)?;
        let spec = self
            .session
            .pending_ui()
            .iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| format!("no widget '{}'", widget))?;
        let event = match (&spec.element, data) {
            (UiElement::Form { .. }, data) => spec.submit(data.unwrap_or_default()),
            (_, Some(_)) => return Err(format!("widget '{}' is not a form", widget)),
            (_, None) => spec.click(),
        };
        event.map_err(|e| e.to_string())
    }

    fn render(&self, outcome: &TurnOutcome) -> String {
        let mut out = Vec::new();
        if outcome.reset {
            out.push("  (new session)".to_string());
        }
        out.extend(
            outcome
                .turns
                .iter()
                .filter(|t| t.role != Role::User)
                .map(render_turn),
        );
        let selections = self.session.selections();
        out.extend(
            self.session
                .pending_ui()
                .iter()
                .enumerate()
                .map(|(i, spec)| render_spec(i + 1, spec, selections)),
        );
        out.join("\n")
    }

    /// Read lines from stdin until `/quit` or end of input. The caller prints the banner.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(session = %self.session.key, "Terminal session started");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("you> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.handle_line(&line).await {
                Some(text) if text.is_empty() => {}
                Some(text) => println!("{}", text),
                None => break,
            }
        }
        info!(session = %self.session.key, "Terminal session ended");
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said() {
        assert_eq!(Command::parse("  load my file "), Command::Say("load my file".into()));
    }

    #[test]
    fn quoted_arguments() {
        assert_eq!(
            Command::parse(r#"/doc "notes/q1 report.txt" report"#),
            Command::Doc {
                path: "notes/q1 report.txt".into(),
                name: Some("report".into()),
            }
        );
        assert_eq!(
            Command::parse(r#"/submit 2 subject="http://ex.org/A" object="two words""#),
            Command::Submit {
                widget: "2".into(),
                fields: vec![
                    ("subject".into(), "http://ex.org/A".into()),
                    ("object".into(), "two words".into()),
                ],
            }
        );
    }

    #[test]
    fn bad_commands() {
        assert!(matches!(Command::parse("/select 1 0"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/select 1"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/submit 1 novalue"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/frobnicate"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/"), Command::Invalid(_)));
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(
            Command::parse("/select radio_align_x 2"),
            Command::Select {
                widget: "radio_align_x".into(),
                option: 2
            }
        );
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(split_words(r#"a "" b"#), vec!["a", "", "b"]);
    }
}
