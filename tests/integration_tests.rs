use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_fileconvert");

/// Run `fileconvert render` writing into `out_dir`
fn run_render(csv: &str, kind: &str, out_dir: &Path, extra: &[&str]) -> Output {
    Command::new(BIN)
        .arg("render")
        .arg(csv)
        .args(["--kind", kind])
        .arg("--out-dir")
        .arg(out_dir)
        .args(extra)
        .output()
        .expect("Failed to run fileconvert")
}

/// Feed a script to `fileconvert shell` and capture its output
fn run_shell(script: &str, out_dir: &Path) -> Output {
    let mut child = Command::new(BIN)
        .arg("shell")
        .arg("--out-dir")
        .arg(out_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn fileconvert");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("Failed to write script");

    child.wait_with_output().expect("Failed to wait for process")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn assert_chart_written(output: &Output, out_dir: &Path) {
    assert!(
        output.status.success(),
        "Failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let path = out_dir.join("chart.png");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("chart.png"), "unexpected stdout: {}", stdout);
    let bytes = fs::read(&path).expect("chart.png was not written");
    assert!(is_valid_png(&bytes), "Output is not a valid PNG");
}

// =============================================================================
// render
// =============================================================================

#[test]
fn test_end_to_end_bar_chart() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/sales.csv", "bar", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_line_chart() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/sales.csv", "line", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_pie_chart() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/sales.csv", "pie", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_scatter_plot() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/scatter.csv", "scatter", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_area_chart_with_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/gaps.csv", "area", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_single_column() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/single_column.csv", "bar", dir.path(), &[]);
    assert_chart_written(&output, dir.path());
}

#[test]
fn test_end_to_end_custom_size_and_title() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render(
        "test/sales.csv",
        "bar",
        dir.path(),
        &["--width", "320", "--height", "240", "--title", "Monthly sales"],
    );
    assert_chart_written(&output, dir.path());

    let bytes = fs::read(dir.path().join("chart.png")).unwrap();
    // IHDR width and height, big-endian
    assert_eq!(&bytes[16..20], &320u32.to_be_bytes());
    assert_eq!(&bytes[20..24], &240u32.to_be_bytes());
}

#[test]
fn test_end_to_end_header_only_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/header_only.csv", "bar", dir.path(), &[]);
    assert!(output.status.success());
    assert!(!dir.path().join("chart.png").exists());
}

#[test]
fn test_end_to_end_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/does_not_exist.csv", "bar", dir.path(), &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to open"), "stderr: {}", stderr);
}

#[test]
fn test_end_to_end_unknown_kind_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_render("test/sales.csv", "radar", dir.path(), &[]);
    assert!(!output.status.success());
    assert!(!dir.path().join("chart.png").exists());
}

// =============================================================================
// shell
// =============================================================================

#[test]
fn test_shell_session_exports_pie() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell("open test/sales.csv\nkind Pie\nshow\nexport\nquit\n", dir.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("loaded: sales.csv (3 rows)"), "stdout: {}", stdout);
    assert!(stdout.contains("slice: Feb 20 hsl(40, 70%, 60%)"), "stdout: {}", stdout);
    assert!(stdout.contains("exported:"), "stdout: {}", stdout);

    let bytes = fs::read(dir.path().join("chart.png")).unwrap();
    assert!(is_valid_png(&bytes));
}

#[test]
fn test_shell_export_needs_kind() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell("open test/sales.csv\nexport\n", dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nothing to export"));
    assert!(!dir.path().join("chart.png").exists());
}

#[test]
fn test_shell_survives_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell(
        "open test/does_not_exist.csv\nkind Radar\nkind Line\nopen test/sales.csv\nexport\n",
        dir.path(),
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: Failed to open"), "stdout: {}", stdout);
    assert!(stdout.contains("error: Unknown chart kind 'Radar'"));
    assert!(dir.path().join("chart.png").exists());
}
