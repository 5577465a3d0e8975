use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fileconvert::chart::ChartKind;
use fileconvert::export::{capture, export_chart};
use fileconvert::graph::{GraphConfig, PlottersRenderer};
use fileconvert::session::Session;
use fileconvert::shell::Shell;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fileconvert")]
#[command(about = "Turn CSV files into charts and export them as PNG", long_about = None)]
struct Cli {
    #[arg(short = 'v', long = "verbose", global = true, help = "Log at debug level")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chart one CSV file and write chart.png
    Render(RenderArgs),
    /// Read commands from stdin: open, kind, show, export
    Shell(ShellArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long = "out-dir", default_value = ".", help = "Directory that receives chart.png")]
    out_dir: PathBuf,

    #[arg(long = "width", default_value = "800", help = "Output width in pixels")]
    width: u32,

    #[arg(long = "height", default_value = "400", help = "Output height in pixels")]
    height: u32,

    #[arg(short = 't', long = "title", help = "Chart title")]
    title: Option<String>,
}

impl OutputArgs {
    fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(help = "CSV file to chart")]
    input: PathBuf,

    #[arg(short = 'k', long = "kind", value_enum, help = "Chart kind")]
    kind: ChartKind,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ShellArgs {
    #[command(flatten)]
    output: OutputArgs,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn render(args: RenderArgs) -> Result<()> {
    let mut session = Session::new();
    session
        .load_path(Some(&args.input))
        .context("Failed to load CSV")?;
    session.select_kind(args.kind);

    let renderer = PlottersRenderer::new(args.output.graph_config());
    let chart = session.chart();
    let frame = capture(&renderer, chart.as_ref()).context("Failed to render chart")?;

    match export_chart(frame.as_ref(), &args.output.out_dir)? {
        Some(path) => println!("{}", path.display()),
        None => info!("no rows to chart, nothing exported"),
    }
    Ok(())
}

fn shell(args: ShellArgs) -> Result<()> {
    let renderer = PlottersRenderer::new(args.output.graph_config());
    let mut shell = Shell::new(renderer, args.output.out_dir);

    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    shell.run(stdin.lock(), &mut out, prompt)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Render(args) => render(args),
        Command::Shell(args) => shell(args),
    }
}
