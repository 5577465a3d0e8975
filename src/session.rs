// Session state: the loaded file, its rows and the selected chart kind

use crate::chart::ChartKind;
use crate::compiler::compile_chart;
use crate::csv_reader::{read_dataset_from_path, Dataset, LoadedFile};
use crate::ir::ChartDescription;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info};

/// Sequence number handed out for each load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Outcome of a background parse, tagged with the request it answers
#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub path: PathBuf,
    pub result: Result<LoadedFile>,
}

/// In-memory state driving the current chart. Lives only as long as the
/// process; loading a file or picking a kind replaces the old value.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Dataset,
    chart_kind: Option<ChartKind>,
    file_name: Option<String>,
    issued: u64,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn chart_kind(&self) -> Option<ChartKind> {
        self.chart_kind
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn select_kind(&mut self, kind: ChartKind) {
        debug!(kind = %kind, "chart kind selected");
        self.chart_kind = Some(kind);
    }

    /// Select a kind by its button text. Unknown text leaves the selection alone.
    pub fn select_kind_label(&mut self, label: &str) -> Result<ChartKind> {
        let kind = label.parse::<ChartKind>().map_err(|err| {
            debug!("ignoring chart kind: {}", err);
            err
        })?;
        self.select_kind(kind);
        Ok(kind)
    }

    /// Start a load. Any ticket issued before this one becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Apply a finished parse if it answers the newest request.
    ///
    /// The dataset and file name are replaced wholesale. Returns false when
    /// the result was stale and discarded.
    pub fn complete_load(&mut self, ticket: LoadTicket, loaded: LoadedFile) -> bool {
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                latest = self.issued,
                file = %loaded.name,
                "discarding stale load"
            );
            return false;
        }

        info!(file = %loaded.name, rows = loaded.dataset.len(), "loaded file");
        self.dataset = loaded.dataset;
        self.file_name = Some(loaded.name);
        true
    }

    /// Apply a background load result. Errors only surface for the newest
    /// request; stale failures are dropped like stale successes.
    pub fn apply(&mut self, outcome: LoadResult) -> Result<bool> {
        match outcome.result {
            Ok(loaded) => Ok(self.complete_load(outcome.ticket, loaded)),
            Err(err) if outcome.ticket.0 == self.issued => Err(err),
            Err(err) => {
                debug!("discarding stale load failure for {}: {}", outcome.path.display(), err);
                Ok(false)
            }
        }
    }

    /// Load a file synchronously. No path selected is a no-op.
    pub fn load_path(&mut self, path: Option<&Path>) -> Result<bool> {
        let Some(path) = path else {
            debug!("no file selected");
            return Ok(false);
        };

        let ticket = self.begin_load();
        let loaded = read_dataset_from_path(path)?;
        Ok(self.complete_load(ticket, loaded))
    }

    /// Start a load on a worker thread; the result arrives on `results`
    pub fn spawn_load(&mut self, path: PathBuf, results: Sender<LoadResult>) -> thread::JoinHandle<()> {
        let ticket = self.begin_load();
        debug!(ticket = ticket.0, path = %path.display(), "spawning load");

        thread::spawn(move || {
            let result = read_dataset_from_path(&path);
            // The receiver may be gone if the shell exited first
            let _ = results.send(LoadResult { ticket, path, result });
        })
    }

    /// Description of the chart to display, if any
    pub fn chart(&self) -> Option<ChartDescription> {
        compile_chart(&self.dataset, self.chart_kind)
    }

    /// Export is offered only once there are rows and a kind
    pub fn can_export(&self) -> bool {
        !self.dataset.is_empty() && self.chart_kind.is_some()
    }
}
