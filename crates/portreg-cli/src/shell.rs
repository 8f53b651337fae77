//! Interactive session.
//!
//! The shell reads one command per line and drives a [`Workflow`] over
//! whatever registry it was given. Outcomes of mutations reach the user
//! through the notification port; the shell itself only prints listings,
//! prompts and validation messages.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use portreg_client::PortApiClient;
use portreg_core::{
    import_rows, AppError, ExportConfig, NewPortRecord, Notification, NotificationPort, PortField,
    PortId, PortQuery, RemoteSync, Workflow, WorkflowOutcome,
};
use tracing::debug;

use crate::render::{describe, format_page};

const HELP: &str = "Commands:
  list [page]       show the collection, five rows per page
  find <text>       show records containing <text> in any field
  add               enter a new record
  edit <id>         change a record
  delete <id>       delete a record
  import <file>     merge rows from an .xlsx file
  export [name]     write all records to <name>.xlsx
  reload            retry loading from the backend
  help              show this text
  quit              leave the shell";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List(usize),
    Find(String),
    Add,
    Edit(PortId),
    Delete(PortId),
    Import(PathBuf),
    Export(Option<String>),
    Reload,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let id = |rest: &str| -> Result<PortId, String> {
        rest.parse::<PortId>()
            .map_err(|_| format!("'{}' needs a numeric record id", word))
    };

    match word.to_lowercase().as_str() {
        "" => Ok(ShellCommand::Empty),
        "list" | "ls" => {
            if rest.is_empty() {
                Ok(ShellCommand::List(1))
            } else {
                rest.parse()
                    .map(ShellCommand::List)
                    .map_err(|_| format!("invalid page number: {}", rest))
            }
        }
        "find" if !rest.is_empty() => Ok(ShellCommand::Find(rest.to_string())),
        "find" => Err("usage: find <text>".to_string()),
        "add" => Ok(ShellCommand::Add),
        "edit" => id(rest).map(ShellCommand::Edit),
        "delete" | "rm" => id(rest).map(ShellCommand::Delete),
        "import" if !rest.is_empty() => Ok(ShellCommand::Import(PathBuf::from(rest))),
        "import" => Err("usage: import <file>".to_string()),
        "export" => Ok(ShellCommand::Export(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "reload" => Ok(ShellCommand::Reload),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command '{}', type 'help'", other)),
    }
}

/// Where the shell reads its lines from.
pub trait LineSource {
    /// The next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads stdin one line at a time without holding its lock, so the
/// confirmation prompt can read from it too.
#[derive(Debug, Default)]
pub struct StdinLines;

impl LineSource for StdinLines {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
        }
    }
}

enum Answer {
    Value(String),
    Cancel,
}

pub struct Shell<L, W> {
    workflow: Workflow,
    notifier: Arc<dyn NotificationPort>,
    export: ExportConfig,
    remote: Option<Arc<RemoteSync<PortApiClient>>>,
    input: L,
    out: W,
}

impl<L: LineSource, W: Write> Shell<L, W> {
    pub fn new(
        workflow: Workflow,
        notifier: Arc<dyn NotificationPort>,
        export: ExportConfig,
        input: L,
        out: W,
    ) -> Self {
        Self {
            workflow,
            notifier,
            export,
            remote: None,
            input,
            out,
        }
    }

    /// Enables `reload` against a backend-mirrored registry.
    pub fn with_remote(mut self, remote: Arc<RemoteSync<PortApiClient>>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Runs until `quit` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        writeln!(self.out, "Type 'help' for the list of commands.")?;
        loop {
            write!(self.out, "portreg> ")?;
            self.out.flush()?;
            let Some(line) = self.input.next_line()? else {
                writeln!(self.out)?;
                break;
            };
            match parse_command(&line) {
                Ok(ShellCommand::Quit) => break,
                Ok(command) => self.execute(command).await?,
                Err(message) => writeln!(self.out, "{}", message)?,
            }
        }
        Ok(())
    }

    async fn execute(&mut self, command: ShellCommand) -> io::Result<()> {
        debug!(?command, "shell command");
        match command {
            ShellCommand::List(page) => self.show(PortQuery::default().page(page)),
            ShellCommand::Find(text) => self.show(PortQuery::default().search(text).page_size(usize::MAX)),
            ShellCommand::Add => self.add().await,
            ShellCommand::Edit(id) => self.edit(id).await,
            ShellCommand::Delete(id) => self.delete(id).await,
            ShellCommand::Import(path) => self.import(path).await,
            ShellCommand::Export(name) => self.export(name.as_deref()),
            ShellCommand::Reload => self.reload().await,
            ShellCommand::Help => writeln!(self.out, "{}", HELP),
            ShellCommand::Quit | ShellCommand::Empty => Ok(()),
        }
    }

    fn show(&mut self, query: PortQuery) -> io::Result<()> {
        let snapshot = self.workflow.registry().snapshot();
        let page = query.run(&snapshot);
        writeln!(self.out, "{}", format_page(&page))
    }

    fn prompt(&mut self, label: &str, current: &str) -> io::Result<Answer> {
        if current.is_empty() {
            write!(self.out, "{}: ", label)?;
        } else {
            write!(self.out, "{} [{}]: ", label, current)?;
        }
        self.out.flush()?;
        match self.input.next_line()? {
            None => Ok(Answer::Cancel),
            Some(line) if line.trim().eq_ignore_ascii_case("cancel") => Ok(Answer::Cancel),
            Some(line) if line.trim().is_empty() => Ok(Answer::Value(current.to_string())),
            Some(line) if line.trim() == "-" => Ok(Answer::Value(String::new())),
            Some(line) => Ok(Answer::Value(line)),
        }
    }

    async fn add(&mut self) -> io::Result<()> {
        writeln!(self.out, "New port record. Type 'cancel' to abort.")?;
        let mut draft = NewPortRecord::default();
        loop {
            for field in PortField::ALL {
                let current = draft.field(field).to_string();
                match self.prompt(field.header(), &current)? {
                    Answer::Value(value) => draft.set_field(field, value),
                    Answer::Cancel => return writeln!(self.out, "Cancelled."),
                }
            }
            match self.workflow.submit_new(draft.clone()).await {
                Err(AppError::Validation(errors)) => {
                    writeln!(self.out, "Please fix:\n{}", errors.render())?;
                }
                // Both outcomes are notified by the workflow
                _ => return Ok(()),
            }
        }
    }

    async fn edit(&mut self, id: PortId) -> io::Result<()> {
        let Ok(session) = self.workflow.begin_edit(id) else {
            return Ok(());
        };
        let title = describe(&session.original);
        writeln!(
            self.out,
            "Editing {}. Enter keeps a value, '-' clears it, 'cancel' aborts.",
            title
        )?;

        loop {
            for field in PortField::ALL {
                let current = match self.workflow.edit_session() {
                    Some(session) => session.draft.field(field).to_string(),
                    None => return Ok(()),
                };
                match self.prompt(field.header(), &current)? {
                    Answer::Value(value) => {
                        self.workflow.set_field(field, value);
                    }
                    Answer::Cancel => {
                        self.workflow.cancel();
                        return writeln!(self.out, "Cancelled.");
                    }
                }
            }
            match self.workflow.commit_edit().await {
                Err(AppError::Validation(errors)) => {
                    writeln!(self.out, "Please fix:\n{}", errors.render())?;
                }
                Ok(WorkflowOutcome::Cancelled) => return writeln!(self.out, "No changes saved."),
                _ => return Ok(()),
            }
        }
    }

    async fn delete(&mut self, id: PortId) -> io::Result<()> {
        if let Ok(WorkflowOutcome::Cancelled) = self.workflow.delete(id).await {
            writeln!(self.out, "Nothing deleted.")?;
        }
        Ok(())
    }

    async fn import(&mut self, path: PathBuf) -> io::Result<()> {
        let rows = match portreg_sheet::read_rows(&path) {
            Ok(rows) => rows,
            Err(e) => {
                self.notifier
                    .notify(Notification::error("Could not read file", e.user_message()));
                return Ok(());
            }
        };
        // The importer notifies its own outcome; only log it here
        if let Err(e) = import_rows(self.workflow.registry().as_ref(), &rows, self.notifier.as_ref()).await {
            debug!("import failed: {}", e);
        }
        Ok(())
    }

    fn export(&mut self, name: Option<&str>) -> io::Result<()> {
        let snapshot = self.workflow.registry().snapshot();
        match portreg_sheet::export_records(&snapshot, name, &self.export) {
            Ok(path) => self.notifier.notify(Notification::success(
                "Ports exported",
                format!("{} records written to {}", snapshot.len(), path.display()),
            )),
            Err(e @ AppError::EmptyInput(_)) => self
                .notifier
                .notify(Notification::warn("Nothing to export", e.user_message())),
            Err(e) => self
                .notifier
                .notify(Notification::error("Export failed", e.user_message())),
        }
        Ok(())
    }

    async fn reload(&mut self) -> io::Result<()> {
        let Some(remote) = self.remote.clone() else {
            return writeln!(self.out, "Not connected to a backend.");
        };
        if remote.is_initialized() {
            return writeln!(self.out, "Already loaded {} records.", remote.store().len());
        }
        if let Ok(count) = remote.initialize().await {
            self.notifier.notify(Notification::info(
                "Ports loaded",
                format!("{} records loaded from the backend.", count),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}
