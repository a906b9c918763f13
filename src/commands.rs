use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use inquire::{Confirm, Editor, Password, Select, Text};
use tracing::warn;

use crate::api::{Client, TaskBackend};
use crate::board::TaskBoard;
use crate::config::DEFAULT_API_BASE;
use crate::editor::{EditCommand, EditState, EditorSession, InputMode, PairField, StepField};
use crate::models::Task;
use crate::session::{AuthSession, SessionStore};

/// Resolve the backend for task commands: the stored session's base and
/// token, with `--api-base` taking precedence over the stored base.
pub fn connect(api_base: Option<String>) -> Result<Client> {
    let store = SessionStore::default_location()?;
    let (base, token) = resolve_target(api_base, store.load()?);
    Ok(Client::new(&base, token)?)
}

/// Pick the base URL and the token to send. The stored token only goes to
/// the base it was issued for.
fn resolve_target(api_base: Option<String>, session: Option<AuthSession>) -> (String, Option<String>) {
    let Some(session) = session else {
        warn!("no stored session; requests will be unauthenticated");
        return (api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()), None);
    };
    match api_base {
        Some(base) if !same_base(&base, &session.api_base) => {
            warn!(
                base = %base,
                session_base = %session.api_base,
                "--api-base differs from the logged-in server; not sending the stored token"
            );
            (base, None)
        }
        _ => (session.api_base, Some(session.token)),
    }
}

fn same_base(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

// ------------------- auth -------------------

pub async fn cmd_login(api_base: Option<String>, email: Option<String>) -> Result<()> {
    let api_base = api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    println!("🔐 Logging in to {api_base}");

    let email = match email {
        Some(e) => e,
        None => Text::new("Email:").prompt()?,
    };
    let password = Password::new("Password:").without_confirmation().prompt()?;

    let client = Client::new(&api_base, None)?;
    let token = client
        .login(&email, &password)
        .await
        .context("login request failed")?;

    let session = AuthSession::new(api_base, email.clone(), token);
    let path = SessionStore::default_location()?.save(&session)?;
    println!("✅ Logged in as {email}");
    println!("🔑 Session saved to: {}", path.display());
    Ok(())
}

pub async fn cmd_logout() -> Result<()> {
    let store = SessionStore::default_location()?;
    if store.clear()? {
        println!("✅ Logged out; removed {}", store.path().display());
    } else {
        println!("ℹ️  No session found. Already logged out.");
    }
    Ok(())
}

pub async fn cmd_whoami() -> Result<()> {
    match SessionStore::default_location()?.load()? {
        Some(session) => {
            println!("📧 Email: {}", session.email);
            println!("🌐 API Base: {}", session.api_base);
            println!("🕒 Logged in: {}", session.login_time.to_rfc3339());

            let client = session.client()?;
            match client.list_tasks().await {
                Ok(_) => println!("✅ Session is valid"),
                Err(e) if e.is_auth_error() => println!("⚠️  Session rejected by backend; run `taskdesk login`"),
                Err(e) => println!("⚠️  Could not reach backend: {e}"),
            }
        }
        None => {
            println!("❌ Not logged in");
            println!("💡 Use 'taskdesk login' to authenticate");
        }
    }
    Ok(())
}

// ------------------- task table -------------------

pub async fn cmd_list(api_base: Option<String>) -> Result<()> {
    let client = connect(api_base)?;
    let mut board = TaskBoard::new();
    let tasks = board.refresh(&client).await.context("fetching tasks")?;
    print!("{}", render_table(tasks));
    Ok(())
}

pub async fn cmd_show(api_base: Option<String>, id: i64, out: Option<PathBuf>) -> Result<()> {
    let client = connect(api_base)?;
    let mut board = TaskBoard::new();
    board.refresh(&client).await.context("fetching tasks")?;
    let Some(task) = board.find(id) else {
        bail!("no task with id {id}");
    };
    let json = serde_json::to_string_pretty(task)?;
    match out {
        Some(path) => {
            fs::write(&path, &json).with_context(|| format!("writing {}", path.display()))?;
            println!("✓ Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn render_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }
    let width = tasks.iter().map(|t| t.name.chars().count()).max().unwrap_or(0).max("Task Name".len());
    let mut out = format!("{:>6}  {:<width$}  {:>5}\n", "ID", "Task Name", "Pages");
    for t in tasks {
        out.push_str(&format!(
            "{:>6}  {:<width$}  {:>5}\n",
            t.id,
            t.name,
            t.task_json.pages.len()
        ));
    }
    out
}

// ------------------- editor -------------------

pub async fn cmd_create(api_base: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let client = connect(api_base)?;
    let mut board = TaskBoard::new();
    let editor = board.open_new();
    match file {
        Some(path) => {
            load_json_file(editor, &path)?;
            submit(&mut board, &client).await
        }
        None => run_interactive(&mut board, &client).await,
    }
}

pub async fn cmd_edit(api_base: Option<String>, id: i64, file: Option<PathBuf>) -> Result<()> {
    let client = connect(api_base)?;
    let mut board = TaskBoard::new();
    board.refresh(&client).await.context("fetching tasks")?;
    let Some(editor) = board.open_existing(id) else {
        bail!("no task with id {id}");
    };
    match file {
        Some(path) => {
            load_json_file(editor, &path)?;
            submit(&mut board, &client).await
        }
        None => run_interactive(&mut board, &client).await,
    }
}

fn load_json_file(editor: &mut EditorSession, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    editor.set_mode(InputMode::Json)?;
    editor.set_json_input(text);
    Ok(())
}

async fn submit<B: TaskBackend + ?Sized>(board: &mut TaskBoard, backend: &B) -> Result<()> {
    let saved = board.submit(backend).await.context("saving task")?;
    println!("✅ Saved task {} ({})", saved.name, saved.id);
    Ok(())
}

const FORM_ACTIONS: &[&str] = &[
    "Set name",
    "Add page",
    "Set page URL",
    "Remove page",
    "Add step",
    "Edit step",
    "Remove step",
    "Add key-value pair",
    "Edit key-value pair",
    "Remove key-value pair",
    "Add variable",
    "Edit variable",
    "Remove variable",
    "Switch to JSON",
    "Save",
    "Cancel",
];

const JSON_ACTIONS: &[&str] = &["Edit JSON", "Switch to form", "Save", "Cancel"];

/// Menu loop over the open editor. Edit and validation errors are shown and
/// the loop continues; only a successful save or a cancel ends it.
async fn run_interactive<B: TaskBackend + ?Sized>(board: &mut TaskBoard, backend: &B) -> Result<()> {
    loop {
        let Some(editor) = board.editor() else {
            return Ok(());
        };
        println!();
        match editor.mode() {
            InputMode::Form => print!("{}", render_draft(editor.name(), editor.state())),
            InputMode::Json => println!("{}", editor.json_input()),
        }

        let actions = match editor.mode() {
            InputMode::Form => FORM_ACTIONS,
            InputMode::Json => JSON_ACTIONS,
        };
        let choice = Select::new("Action:", actions.to_vec()).prompt()?;

        match choice {
            "Save" => match board.submit(backend).await {
                Ok(saved) => {
                    println!("✅ Saved task {} ({})", saved.name, saved.id);
                    return Ok(());
                }
                Err(e) => println!("❌ {e}"),
            },
            "Cancel" => {
                if Confirm::new("Discard changes?").with_default(false).prompt()? {
                    board.cancel();
                    println!("Discarded.");
                    return Ok(());
                }
            }
            "Switch to JSON" => {
                if let Err(e) = editor.set_mode(InputMode::Json) {
                    println!("❌ {e}");
                }
            }
            "Switch to form" => {
                if let Err(e) = editor.set_mode(InputMode::Form) {
                    println!("❌ {e}");
                }
            }
            "Edit JSON" => {
                let text = Editor::new("Task JSON:")
                    .with_predefined_text(editor.json_input())
                    .with_file_extension(".json")
                    .prompt()?;
                editor.set_json_input(text);
            }
            "Set name" => {
                let name = Text::new("Task name:").with_default(editor.name()).prompt()?;
                editor.set_name(name);
            }
            other => {
                if let Some(cmd) = prompt_command(other, editor.state())? {
                    if let Err(e) = editor.apply(cmd) {
                        println!("❌ {e}");
                    }
                }
            }
        }
    }
}

/// Ask for whatever a form action needs and build the command. `None` when
/// there is nothing to act on.
fn prompt_command(action: &str, state: &EditState) -> Result<Option<EditCommand>> {
    let cmd = match action {
        "Add page" => Some(EditCommand::AddPage),
        "Add variable" => Some(EditCommand::AddVariable),
        "Set page URL" => match pick_page(state)? {
            Some(page) => {
                let url = Text::new("Page URL:").prompt()?;
                Some(EditCommand::SetPageUrl { page, url })
            }
            None => None,
        },
        "Remove page" => pick_page(state)?.map(|page| EditCommand::RemovePage { page }),
        "Add step" => pick_page(state)?.map(|page| EditCommand::AddStep { page }),
        "Edit step" => match pick_step(state)? {
            Some((page, step)) => {
                let field = Select::new("Field:", vec!["action", "location", "variable"]).prompt()?;
                let value = Text::new("Value:").prompt()?;
                let field = match field {
                    "action" => StepField::SetAction(value),
                    "location" => StepField::SetLocation(value),
                    _ => StepField::SetVariable(value),
                };
                Some(EditCommand::UpdateStep { page, step, field })
            }
            None => None,
        },
        "Remove step" => pick_step(state)?.map(|(page, step)| EditCommand::RemoveStep { page, step }),
        "Add key-value pair" => pick_step(state)?.map(|(page, step)| EditCommand::AddPair { page, step }),
        "Edit key-value pair" => match pick_pair(state)? {
            Some((page, step, pair)) => {
                let field = prompt_pair_field()?;
                Some(EditCommand::UpdatePair { page, step, pair, field })
            }
            None => None,
        },
        "Remove key-value pair" => {
            pick_pair(state)?.map(|(page, step, pair)| EditCommand::RemovePair { page, step, pair })
        }
        "Edit variable" => match pick_variable(state)? {
            Some(index) => Some(EditCommand::UpdateVariable { index, field: prompt_pair_field()? }),
            None => None,
        },
        "Remove variable" => pick_variable(state)?.map(|index| EditCommand::RemoveVariable { index }),
        other => {
            warn!(action = other, "unhandled editor action");
            None
        }
    };
    Ok(cmd)
}

fn prompt_pair_field() -> Result<PairField> {
    let field = Select::new("Field:", vec!["key", "value"]).prompt()?;
    let value = Text::new("Value:").prompt()?;
    Ok(match field {
        "key" => PairField::SetKey(value),
        _ => PairField::SetValue(value),
    })
}

fn pick(message: &str, labels: Vec<String>) -> Result<Option<usize>> {
    if labels.is_empty() {
        println!("Nothing to choose from.");
        return Ok(None);
    }
    Ok(Some(Select::new(message, labels).raw_prompt()?.index))
}

fn pick_page(state: &EditState) -> Result<Option<usize>> {
    let labels = state
        .pages()
        .iter()
        .enumerate()
        .map(|(i, p)| format!("#{} {}", i + 1, display_or_blank(&p.url)))
        .collect();
    pick("Page:", labels)
}

fn pick_step(state: &EditState) -> Result<Option<(usize, usize)>> {
    let Some(page) = pick_page(state)? else {
        return Ok(None);
    };
    let pages = state.pages();
    let labels = pages[page]
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("#{} {} @ {}", i + 1, display_or_blank(&s.action), display_or_blank(&s.location)))
        .collect();
    Ok(pick("Step:", labels)?.map(|step| (page, step)))
}

fn pick_pair(state: &EditState) -> Result<Option<(usize, usize, usize)>> {
    let Some((page, step)) = pick_step(state)? else {
        return Ok(None);
    };
    let pages = state.pages();
    let labels = pages[page].steps[step]
        .key_value_pairs
        .iter()
        .map(|p| format!("{} = {}", display_or_blank(&p.key), display_or_blank(&p.value)))
        .collect();
    Ok(pick("Pair:", labels)?.map(|pair| (page, step, pair)))
}

fn pick_variable(state: &EditState) -> Result<Option<usize>> {
    let labels = state
        .variables()
        .iter()
        .map(|v| format!("{} = {}", display_or_blank(&v.key), display_or_blank(&v.value)))
        .collect();
    pick("Variable:", labels)
}

fn display_or_blank(s: &str) -> &str {
    if s.is_empty() { "(blank)" } else { s }
}

/// Text rendering of the draft tree shown above the menu.
pub fn render_draft(name: &str, state: &EditState) -> String {
    let mut out = format!("Task: {}\n", display_or_blank(name));
    out.push_str("Pages:\n");
    for (i, page) in state.pages().iter().enumerate() {
        out.push_str(&format!("  [{}] {}\n", i + 1, display_or_blank(&page.url)));
        for (j, step) in page.steps.iter().enumerate() {
            out.push_str(&format!(
                "      {}. {} @ {}",
                j + 1,
                display_or_blank(&step.action),
                display_or_blank(&step.location)
            ));
            if let Some(var) = &step.variable {
                out.push_str(&format!(" -> ${var}"));
            }
            out.push('\n');
            for pair in &step.key_value_pairs {
                out.push_str(&format!("         {} = {}\n", pair.key, pair.value));
            }
        }
    }
    out.push_str("Variables:\n");
    for v in state.variables() {
        out.push_str(&format!("  {} = {}\n", v.key, v.value));
    }
    out
}
