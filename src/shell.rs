// Line-oriented front end: each command is one of the user's actions

use crate::export::{capture, export_chart, to_data_uri};
use crate::graph::{ChartRenderer, PlottersRenderer};
use crate::session::{LoadResult, Session};
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

const HELP: &str = "\
commands:
  open [path]   load a CSV file (no path: nothing happens)
  kind <name>   pick Bar, Pie, Line, Scatter or Area
  show          print the loaded file, fields and chart
  export        write chart.png to the output directory
  link          print the chart as a data:image/png URI
  help          show this text
  quit          leave the shell";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    session: Session,
    renderer: Box<dyn ChartRenderer>,
    out_dir: PathBuf,
    results_tx: Sender<LoadResult>,
    results_rx: Receiver<LoadResult>,
    pending: usize,
}

impl Shell {
    pub fn new(renderer: PlottersRenderer, out_dir: PathBuf) -> Self {
        Shell::with_renderer(Box::new(renderer), out_dir)
    }

    pub fn with_renderer(renderer: Box<dyn ChartRenderer>, out_dir: PathBuf) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Shell {
            session: Session::new(),
            renderer,
            out_dir,
            results_tx,
            results_rx,
            pending: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read commands until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W, prompt: bool) -> Result<()> {
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(out, "> ")?;
                out.flush()?;
            }
            let Some(line) = lines.next() else { break };
            let line = line.context("Failed to read command")?;

            match self.execute(&line, out) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => writeln!(out, "error: {:#}", err)?,
            }
        }
        self.wait_for_loads(out)?;
        Ok(())
    }

    /// Run a single command line
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "" => {}
            "open" => self.open(argument),
            "kind" => {
                self.wait_for_loads(out)?;
                let kind = self.session.select_kind_label(argument)?;
                writeln!(out, "kind: {}", kind)?;
            }
            "show" => {
                self.wait_for_loads(out)?;
                self.show(out)?;
            }
            "export" => {
                self.wait_for_loads(out)?;
                self.export(out)?;
            }
            "link" => {
                self.wait_for_loads(out)?;
                self.link(out)?;
            }
            "help" => writeln!(out, "{}", HELP)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => return Err(anyhow!("Unknown command '{}' (try 'help')", other)),
        }

        Ok(Flow::Continue)
    }

    fn open(&mut self, argument: &str) {
        if argument.is_empty() {
            debug!("no file selected");
            return;
        }
        self.session
            .spawn_load(PathBuf::from(argument), self.results_tx.clone());
        self.pending += 1;
    }

    /// Block until every started load has reported back, applying each one
    fn wait_for_loads<W: Write>(&mut self, out: &mut W) -> Result<()> {
        while self.pending > 0 {
            let outcome = self
                .results_rx
                .recv()
                .context("Load worker disappeared")?;
            self.pending -= 1;

            let path = outcome.path.clone();
            match self.session.apply(outcome) {
                Ok(true) => {
                    if let Some(name) = self.session.file_name() {
                        writeln!(out, "loaded: {} ({} rows)", name, self.session.dataset().len())?;
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    warn!("load of {} failed: {:#}", path.display(), err);
                    writeln!(out, "error: {:#}", err)?;
                }
            }
        }
        Ok(())
    }

    fn show<W: Write>(&self, out: &mut W) -> Result<()> {
        let session = &self.session;
        writeln!(out, "file: {}", session.file_name().unwrap_or("-"))?;
        writeln!(out, "rows: {}", session.dataset().len())?;
        match session.chart_kind() {
            Some(kind) => writeln!(out, "kind: {}", kind)?,
            None => writeln!(out, "kind: -")?,
        }

        let Some(chart) = session.chart() else {
            return Ok(());
        };
        writeln!(
            out,
            "fields: x={} y={}",
            chart.x_field,
            chart.y_field.as_deref().unwrap_or("-")
        )?;
        for styled in chart.slices() {
            writeln!(out, "slice: {} {} {}", styled.slice.name, styled.slice.value, styled.fill)?;
        }
        if !chart.marks().is_empty() {
            writeln!(out, "marks: {}", chart.marks().len())?;
        }
        Ok(())
    }

    /// Same image as `export`, as the href of a download link
    fn link<W: Write>(&self, out: &mut W) -> Result<()> {
        if !self.session.can_export() {
            writeln!(out, "nothing to export")?;
            return Ok(());
        }
        let chart = self.session.chart();
        match capture(self.renderer.as_ref(), chart.as_ref())? {
            Some(frame) if !frame.is_empty() => writeln!(out, "{}", to_data_uri(&frame)?)?,
            _ => writeln!(out, "nothing to export")?,
        }
        Ok(())
    }

    fn export<W: Write>(&self, out: &mut W) -> Result<()> {
        if !self.session.can_export() {
            writeln!(out, "nothing to export")?;
            return Ok(());
        }
        let chart = self.session.chart();
        let frame = capture(self.renderer.as_ref(), chart.as_ref())?;
        match export_chart(frame.as_ref(), Path::new(&self.out_dir))? {
            Some(path) => writeln!(out, "exported: {}", path.display())?,
            None => writeln!(out, "nothing to export")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Frame;
    use crate::ir::ChartDescription;
    use std::io::Cursor;

    struct TinyRenderer;

    impl ChartRenderer for TinyRenderer {
        fn render(&self, _chart: &ChartDescription) -> Result<Frame> {
            Ok(Frame { width: 2, height: 2, pixels: vec![255; 12] })
        }
    }

    fn shell_in(dir: &Path) -> Shell {
        Shell::with_renderer(Box::new(TinyRenderer), dir.to_path_buf())
    }

    fn run_script(shell: &mut Shell, script: &str) -> String {
        let mut out = Vec::new();
        shell.run(Cursor::new(script), &mut out, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_shell_pie_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "sales.csv", "month,sales\nJan,10\nFeb,20\nMar,15\n");
        let mut shell = shell_in(dir.path());

        let output = run_script(&mut shell, &format!("open {}\nkind Pie\nshow\n", csv.display()));
        assert!(output.contains("loaded: sales.csv (3 rows)"));
        assert!(output.contains("fields: x=month y=sales"));
        assert!(output.contains("slice: Jan 10 hsl(0, 70%, 60%)"));
        assert!(output.contains("slice: Feb 20 hsl(40, 70%, 60%)"));
        assert!(output.contains("slice: Mar 15 hsl(80, 70%, 60%)"));
    }

    #[test]
    fn test_shell_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "sales.csv", "month,sales\nJan,10\n");
        let mut shell = shell_in(dir.path());

        let output = run_script(&mut shell, &format!("open {}\nkind bar\nexport\n", csv.display()));
        assert!(output.contains("exported:"));
        assert!(dir.path().join("chart.png").exists());
    }

    #[test]
    fn test_shell_export_without_kind() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "sales.csv", "month,sales\nJan,10\n");
        let mut shell = shell_in(dir.path());

        let output = run_script(&mut shell, &format!("open {}\nexport\n", csv.display()));
        assert!(output.contains("nothing to export"));
        assert!(!dir.path().join("chart.png").exists());
    }

    #[test]
    fn test_shell_open_without_path_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        let output = run_script(&mut shell, "open\nshow\n");
        assert!(output.contains("file: -"));
        assert!(output.contains("rows: 0"));
    }

    #[test]
    fn test_shell_second_open_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_csv(dir.path(), "first.csv", "a,b\n1,2\n3,4\n5,6\n");
        let second = write_csv(dir.path(), "second.csv", "c,d\n7,8\n");
        let mut shell = shell_in(dir.path());

        run_script(
            &mut shell,
            &format!("open {}\nopen {}\nkind Line\n", first.display(), second.display()),
        );
        assert_eq!(shell.session().file_name(), Some("second.csv"));
        assert_eq!(shell.session().dataset().len(), 1);
        assert_eq!(shell.session().chart().unwrap().x_field, "c");
    }

    #[test]
    fn test_shell_reports_errors_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        let output = run_script(&mut shell, "kind Radar\nfrobnicate\nopen /no/such.csv\nkind Area\nshow\n");
        assert!(output.contains("error: Unknown chart kind 'Radar'"));
        assert!(output.contains("error: Unknown command 'frobnicate'"));
        assert!(output.contains("error: Failed to open"));
        assert!(output.contains("kind: Area"));
    }

    #[test]
    fn test_shell_quit_stops_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        let output = run_script(&mut shell, "quit\nshow\n");
        assert!(!output.contains("rows:"));
    }

    #[test]
    fn test_shell_link_prints_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "sales.csv", "month,sales\nJan,10\n");
        let mut shell = shell_in(dir.path());

        let output = run_script(&mut shell, &format!("open {}\nlink\nkind Pie Chart\nlink\n", csv.display()));
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.contains(&"nothing to export"));
        assert!(lines.iter().any(|l| l.starts_with("data:image/png;base64,iVBORw0KGgo")));
        assert!(!dir.path().join("chart.png").exists());
    }

    #[test]
    fn test_shell_help() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell_in(dir.path());
        let output = run_script(&mut shell, "help\n");
        assert!(output.contains("open [path]"));
        assert!(output.contains("export"));
    }
}
