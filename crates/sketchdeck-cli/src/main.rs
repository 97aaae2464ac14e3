//! SketchDeck command line driver.
//!
//! Opens a document from a directory store, replays a script of input
//! events against it and writes the result back.
//!
//! ```text
//! sketchdeck --store <dir> --doc <id> [--config <file>] [--script <file>]
//! ```
//!
//! A script is a JSON array of steps:
//! ```json
//! [
//!   { "step": "tool", "tool": "rectangle" },
//!   { "step": "pointer", "event": { "kind": "down", "position": { "x": 0, "y": 0 } } },
//!   { "step": "pointer", "event": { "kind": "up", "position": { "x": 120, "y": 80 } } },
//!   { "step": "wait", "ms": 2500 }
//! ]
//! ```

use kurbo::Point;
use serde::Deserialize;
use sketchdeck_core::input::{KeyEvent, PointerEvent, TouchEvent, WheelEvent};
use sketchdeck_core::storage::{FileDocumentStore, StorageError, fetch_scene};
use sketchdeck_core::{Editor, EditorConfig, Instant, ToolFactories, ToolKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USAGE: &str = "usage: sketchdeck --store <dir> --doc <id> [--config <file>] [--script <file>]";

#[derive(Debug, Error)]
enum CliError {
    #[error("missing required argument {0}")]
    MissingArgument(&'static str),
    #[error("{0} needs a value")]
    MissingValue(String),
    #[error("unknown argument {0}")]
    UnknownArgument(String),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Config(#[source] serde_json::Error),
    #[error("invalid script: {0}")]
    Script(#[source] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    store: PathBuf,
    doc: String,
    config: Option<PathBuf>,
    script: Option<PathBuf>,
}

/// Parse `--flag value` pairs. Returns `None` when help was requested.
fn parse_args<I>(args: I) -> Result<Option<Args>, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut store = None;
    let mut doc = None;
    let mut config = None;
    let mut script = None;

    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        if flag == "-h" || flag == "--help" {
            return Ok(None);
        }
        let slot = match flag.as_str() {
            "--store" => &mut store,
            "--doc" => &mut doc,
            "--config" => &mut config,
            "--script" => &mut script,
            _ => return Err(CliError::UnknownArgument(flag)),
        };
        let value = args.next().ok_or_else(|| CliError::MissingValue(flag.clone()))?;
        *slot = Some(value);
    }

    Ok(Some(Args {
        store: store.map(PathBuf::from).ok_or(CliError::MissingArgument("--store"))?,
        doc: doc.ok_or(CliError::MissingArgument("--doc"))?,
        config: config.map(PathBuf::from),
        script: script.map(PathBuf::from),
    }))
}

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum ScriptStep {
    Pointer { event: PointerEvent },
    Touch { event: TouchEvent },
    Wheel { event: WheelEvent },
    Key { event: KeyEvent },
    Tool { tool: ToolKind },
    /// Replace the text of the object being edited.
    Text { text: String },
    Sticky {
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        text: String,
    },
    Image {
        src: String,
        #[serde(default)]
        position: Option<Point>,
    },
    Undo,
    Redo,
    /// Advance the script clock.
    Wait { ms: u64 },
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig, CliError> {
    match path {
        Some(path) => EditorConfig::from_json(&read_file(path)?).map_err(CliError::Config),
        None => Ok(EditorConfig::default()),
    }
}

fn load_script(path: Option<&Path>) -> Result<Vec<ScriptStep>, CliError> {
    match path {
        Some(path) => serde_json::from_str(&read_file(path)?).map_err(CliError::Script),
        None => Ok(Vec::new()),
    }
}

/// Feed one step to the editor and advance the clock for waits.
fn apply_step(editor: &mut Editor<FileDocumentStore>, step: ScriptStep, now: &mut Instant) {
    match step {
        ScriptStep::Pointer { event } => {
            editor.handle_pointer_at(&event, *now);
        }
        ScriptStep::Touch { event } => {
            editor.handle_touch_at(&event, *now);
        }
        ScriptStep::Wheel { event } => {
            editor.handle_wheel(&event);
        }
        ScriptStep::Key { event } => {
            editor.handle_key_at(&event, *now);
        }
        ScriptStep::Tool { tool } => editor.set_tool(tool),
        ScriptStep::Text { text } => {
            editor.update_editing_text(&text);
        }
        ScriptStep::Sticky { position, text } => {
            editor.add_sticky_note_at(position, &text, *now);
        }
        ScriptStep::Image { src, position } => {
            editor.add_image_at(&src, position, *now);
        }
        ScriptStep::Undo => {
            editor.undo_at(*now);
        }
        ScriptStep::Redo => {
            editor.redo_at(*now);
        }
        ScriptStep::Wait { ms } => *now += Duration::from_millis(ms),
    }
}

/// Run any save whose debounce has elapsed.
fn flush_due(editor: &mut Editor<FileDocumentStore>, now: Instant) {
    if let Some(job) = editor.tick(now) {
        let result = pollster::block_on(job.run());
        editor.finish_save(&result, now);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let script = load_script(args.script.as_deref())?;

    let store = Arc::new(FileDocumentStore::new(&args.store)?);
    let document = pollster::block_on(fetch_scene(store.as_ref(), &args.doc))?;

    let mut editor = Editor::new(Arc::clone(&store), args.doc.clone(), config, ToolFactories::default());
    let report = editor.open(&document);
    log::info!(
        "Opened {} ({} objects, {} skipped)",
        args.doc,
        editor.graph().len(),
        report.skipped
    );

    let mut now = Instant::now();
    let steps = script.len();
    for step in script {
        log::debug!("Step: {:?}", step);
        apply_step(&mut editor, step, &mut now);
        flush_due(&mut editor, now);
    }

    for notification in editor.take_notifications() {
        log::warn!("{:?}: {}", notification.level, notification.message);
    }

    let wrote = pollster::block_on(editor.save_now(now))?;
    log::info!(
        "Replayed {} steps: {} objects, {} snapshots, status {:?}{}",
        steps,
        editor.graph().len(),
        editor.history().len(),
        editor.save_status(),
        if wrote { ", saved" } else { "" }
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchdeck_core::storage::DocumentStore;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(strings(&["--store", "/tmp/s", "--doc", "d1", "--script", "s.json"]))
            .unwrap()
            .unwrap();
        assert_eq!(args.store, PathBuf::from("/tmp/s"));
        assert_eq!(args.doc, "d1");
        assert_eq!(args.config, None);
        assert_eq!(args.script, Some(PathBuf::from("s.json")));

        assert!(parse_args(strings(&["--help"])).unwrap().is_none());
        assert!(matches!(
            parse_args(strings(&["--doc", "d1"])),
            Err(CliError::MissingArgument("--store"))
        ));
        assert!(matches!(parse_args(strings(&["--store"])), Err(CliError::MissingValue(_))));
        assert!(matches!(
            parse_args(strings(&["--verbose"])),
            Err(CliError::UnknownArgument(_))
        ));
    }

    #[test]
    fn test_script_steps() {
        let json = r#"[
            { "step": "tool", "tool": "sticky-note" },
            { "step": "pointer", "event": { "kind": "down", "position": { "x": 1.0, "y": 2.0 } } },
            { "step": "key", "event": { "key": "z", "modifiers": { "ctrl": true } } },
            { "step": "undo" },
            { "step": "wait", "ms": 250 }
        ]"#;
        let steps: Vec<ScriptStep> = serde_json::from_str(json).unwrap();
        assert_eq!(steps[0], ScriptStep::Tool { tool: ToolKind::StickyNote });
        assert_eq!(
            steps[1],
            ScriptStep::Pointer {
                event: PointerEvent::down(Point::new(1.0, 2.0))
            }
        );
        let ScriptStep::Key { event } = &steps[2] else {
            panic!("expected a key step");
        };
        assert!(event.modifiers.ctrl);
        assert_eq!(steps[3], ScriptStep::Undo);
        assert_eq!(steps[4], ScriptStep::Wait { ms: 250 });
    }

    #[test]
    fn test_run_draws_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("script.json");
        std::fs::write(
            &script,
            r#"[
                { "step": "tool", "tool": "rectangle" },
                { "step": "pointer", "event": { "kind": "down", "position": { "x": 0.0, "y": 0.0 } } },
                { "step": "pointer", "event": { "kind": "move", "position": { "x": 100.0, "y": 50.0 } } },
                { "step": "pointer", "event": { "kind": "up", "position": { "x": 100.0, "y": 50.0 } } },
                { "step": "wait", "ms": 3000 }
            ]"#,
        )
        .unwrap();

        let args = Args {
            store: dir.path().join("docs"),
            doc: "board".to_string(),
            config: None,
            script: Some(script),
        };
        run(&args).unwrap();

        let store = FileDocumentStore::new(dir.path().join("docs")).unwrap();
        let saved = pollster::block_on(store.get_document("board")).unwrap();
        assert!(saved.content.scene_json.contains("rect"));
    }

    #[test]
    fn test_run_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            store: dir.path().to_path_buf(),
            doc: "board".to_string(),
            config: None,
            script: Some(dir.path().join("absent.json")),
        };
        assert!(matches!(run(&args), Err(CliError::Read { .. })));
    }
}
