//! Caption renderer backed by the ImageMagick command-line tools.
//!
//! The hint is laid out twice over a transparent canvas the size of the
//! background: once as a thick black outline, once as plain white fill.
//! Both layers are composited onto the background, which keeps the text
//! readable on any image.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use hintd_types::backend::CaptionRenderer;
use hintd_types::config::CaptionerSection;
use hintd_types::error::{HintError, Result};

pub struct MagickCaptioner {
    convert: String,
    identify: String,
    font_size: u32,
    interline_spacing: u32,
    stroke_width: u32,
}

impl MagickCaptioner {
    pub fn from_config(section: &CaptionerSection) -> Self {
        Self {
            convert: section.convert.clone(),
            identify: section.identify.clone(),
            font_size: section.font_size,
            interline_spacing: section.interline_spacing,
            stroke_width: section.stroke_width,
        }
    }

    /// Pixel size of `image` as reported by `identify`.
    pub fn image_size(&self, image: &Path) -> Result<(u32, u32)> {
        let mut cmd = Command::new(&self.identify);
        cmd.args(["-format", "%wx%h"]).arg(image);
        let output = run(&self.identify, cmd)?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_geometry(&text).ok_or_else(|| {
            HintError::Render(format!(
                "cannot read size of {}: unexpected output {:?}",
                image.display(),
                text.trim()
            ))
        })
    }

    /// Arguments for the `convert` invocation that draws `text` onto
    /// `background` and writes `output`.
    fn convert_args(
        &self,
        background: &Path,
        text: &str,
        (width, height): (u32, u32),
        output: &Path,
    ) -> Vec<OsString> {
        let caption = format!("caption:{}", escape_caption(text));
        let layer = |color: &str, stroke: u32| -> Vec<OsString> {
            [
                "(".to_string(),
                "-size".to_string(),
                format!("{width}x{height}"),
                "-background".to_string(),
                "none".to_string(),
                "-gravity".to_string(),
                "center".to_string(),
                "-interline-spacing".to_string(),
                self.interline_spacing.to_string(),
                "-pointsize".to_string(),
                self.font_size.to_string(),
                "-fill".to_string(),
                color.to_string(),
                "-stroke".to_string(),
                color.to_string(),
                "-strokewidth".to_string(),
                stroke.to_string(),
                caption.clone(),
                ")".to_string(),
                "-composite".to_string(),
            ]
            .into_iter()
            .map(OsString::from)
            .collect()
        };

        let mut args = vec![background.as_os_str().to_os_string()];
        args.extend(layer("black", self.stroke_width));
        args.extend(layer("white", 0));
        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl CaptionRenderer for MagickCaptioner {
    fn render_caption(&self, background: &Path, text: &str, output: &Path) -> Result<()> {
        let size = self.image_size(background)?;
        let mut cmd = Command::new(&self.convert);
        cmd.args(self.convert_args(background, text, size, output));
        run(&self.convert, cmd)?;
        log::debug!(
            "rendered {}x{} caption into {}",
            size.0,
            size.1,
            output.display()
        );
        Ok(())
    }
}

/// Run a tool to completion, turning a failure exit into a render error
/// that carries its stderr.
fn run(program: &str, mut cmd: Command) -> Result<Output> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| HintError::Render(format!("cannot run {program}: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HintError::Render(format!(
            "{program} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Parse `WIDTHxHEIGHT`.
fn parse_geometry(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().split_once('x')?;
    let w = w.parse().ok()?;
    let h = h.parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Keep ImageMagick from expanding `%` escapes or reading `@file` in hint
/// text.
fn escape_caption(text: &str) -> String {
    let escaped = text.replace('%', "%%");
    if escaped.starts_with('@') {
        format!("\\{escaped}")
    } else {
        escaped
    }
}
