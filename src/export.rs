// Capture a rendered chart and save it as chart.png

use crate::graph::{ChartRenderer, Frame};
use crate::ir::ChartDescription;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of every exported image
pub const EXPORT_FILE_NAME: &str = "chart.png";

/// Render the displayed chart into a frame, or `None` when nothing is displayed
pub fn capture(
    renderer: &dyn ChartRenderer,
    chart: Option<&ChartDescription>,
) -> Result<Option<Frame>> {
    match chart {
        Some(chart) => renderer.render(chart).map(Some),
        None => Ok(None),
    }
}

/// Encode a frame as PNG bytes
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    let expected = (frame.width as usize) * (frame.height as usize) * 3;
    if frame.pixels.len() != expected {
        anyhow::bail!(
            "Frame buffer has {} bytes, expected {} for {}x{} RGB",
            frame.pixels.len(),
            expected,
            frame.width,
            frame.height
        );
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(
                &frame.pixels,
                frame.width,
                frame.height,
                image::ColorType::Rgb8,
            )
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// `data:` URI carrying the frame as a base64 PNG
pub fn to_data_uri(frame: &Frame) -> Result<String> {
    let png_bytes = encode_png(frame)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png_bytes)))
}

/// Write `frame` to `<dir>/chart.png`, replacing any earlier export.
///
/// A missing or empty frame produces no file and no error; the returned
/// path is `None` in that case.
pub fn export_chart(frame: Option<&Frame>, dir: &Path) -> Result<Option<PathBuf>> {
    let frame = match frame {
        Some(frame) if !frame.is_empty() => frame,
        _ => {
            debug!("nothing rendered, skipping export");
            return Ok(None);
        }
    };

    let png_bytes = encode_png(frame)?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, &png_bytes)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    info!(path = %path.display(), bytes = png_bytes.len(), "exported chart");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::compiler::compile_chart;
    use crate::csv_reader::read_dataset;
    use crate::graph::{GraphConfig, PlottersRenderer};
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::io::Cursor;

    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            pixels: vec![200; (width * height * 3) as usize],
        }
    }

    /// Counts calls and hands back a fixed frame
    struct StubRenderer {
        calls: Cell<usize>,
    }

    impl ChartRenderer for StubRenderer {
        fn render(&self, _chart: &ChartDescription) -> Result<Frame> {
            self.calls.set(self.calls.get() + 1);
            Ok(solid_frame(4, 3))
        }
    }

    struct FailingRenderer;

    impl ChartRenderer for FailingRenderer {
        fn render(&self, _chart: &ChartDescription) -> Result<Frame> {
            Err(anyhow!("backend unavailable"))
        }
    }

    fn month_sales_chart() -> ChartDescription {
        let data = read_dataset(Cursor::new("month,sales\nJan,10\nFeb,20\nMar,15\n")).unwrap();
        compile_chart(&data, Some(ChartKind::Bar)).unwrap()
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&solid_frame(2, 2)).unwrap();
        assert_eq!(&png[0..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_encode_png_decodes_to_same_size() {
        let png = encode_png(&solid_frame(5, 7)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 5);
        assert_eq!(decoded.height(), 7);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let frame = Frame { width: 10, height: 10, pixels: vec![0; 3] };
        let result = encode_png(&frame);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("expected 300"));
    }

    #[test]
    fn test_data_uri_prefix() {
        let uri = to_data_uri(&solid_frame(1, 1)).unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_capture_nothing_displayed() {
        let renderer = StubRenderer { calls: Cell::new(0) };
        assert!(capture(&renderer, None).unwrap().is_none());
        assert_eq!(renderer.calls.get(), 0);
    }

    #[test]
    fn test_capture_each_call_is_independent() {
        let renderer = StubRenderer { calls: Cell::new(0) };
        let chart = month_sales_chart();
        capture(&renderer, Some(&chart)).unwrap();
        capture(&renderer, Some(&chart)).unwrap();
        assert_eq!(renderer.calls.get(), 2);
    }

    #[test]
    fn test_capture_propagates_backend_error() {
        let chart = month_sales_chart();
        assert!(capture(&FailingRenderer, Some(&chart)).is_err());
    }

    #[test]
    fn test_export_writes_chart_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_chart(Some(&solid_frame(3, 3)), dir.path()).unwrap().unwrap();
        assert_eq!(path, dir.path().join("chart.png"));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_export_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        export_chart(Some(&solid_frame(3, 3)), dir.path()).unwrap();
        export_chart(Some(&solid_frame(6, 2)), dir.path()).unwrap();
        let decoded = image::open(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 2));
    }

    #[test]
    fn test_export_without_frame_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export_chart(None, dir.path()).unwrap(), None);
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_export_empty_frame_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Frame { width: 0, height: 0, pixels: vec![] };
        assert_eq!(export_chart(Some(&empty), dir.path()).unwrap(), None);
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_export_real_render() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlottersRenderer::new(GraphConfig::default());
        let frame = capture(&renderer, Some(&month_sales_chart())).unwrap();
        let path = export_chart(frame.as_ref(), dir.path()).unwrap().unwrap();
        let decoded = image::open(path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));
    }
}
