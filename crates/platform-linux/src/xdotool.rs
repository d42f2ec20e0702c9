//! X11 window probing through `xdotool`.

use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::{GeometryProbe, ScreenBounds, WindowGeometry, WindowRect};

use crate::display::run_query;

/// Finds the first visible X11 window whose name or class matches
/// `window_name`.
///
/// xdotool matches case-insensitively; the name is escaped so it is
/// treated as a literal substring rather than a regular expression.
pub struct XdotoolProbe {
    pattern: String,
}

impl XdotoolProbe {
    pub fn new(window_name: &str) -> Self {
        Self {
            pattern: escape_regex(window_name),
        }
    }

    async fn display_bounds(&self) -> WinrecResult<ScreenBounds> {
        let output = run_query("xdotool", &["getdisplaygeometry"]).await?;
        if !output.status.success() {
            return Err(WinrecError::probe(format!(
                "xdotool getdisplaygeometry exited with {}",
                output.status
            )));
        }
        parse_display_geometry(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait::async_trait]
impl GeometryProbe for XdotoolProbe {
    async fn query(&mut self) -> WinrecResult<Option<WindowGeometry>> {
        let output = run_query("xdotool", &search_args(&self.pattern)).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        // `search` exits 1 with empty output when nothing matches.
        if !output.status.success() && stdout.trim().is_empty() {
            return Ok(None);
        }
        let Some(rect) = parse_window_geometry(&stdout)? else {
            return Ok(None);
        };

        let screen = self.display_bounds().await?;
        Ok(Some(rect.clamp_to(screen)))
    }

    fn name(&self) -> &str {
        "xdotool"
    }
}

/// `--name --class` are ORed by xdotool, matching title or WM_CLASS.
fn search_args(pattern: &str) -> [&str; 6] {
    [
        "search",
        "--onlyvisible",
        "--name",
        "--class",
        pattern,
        "getwindowgeometry",
    ]
}

fn parse_window_geometry(output: &str) -> WinrecResult<Option<WindowRect>> {
    let mut position = None;
    let mut size = None;

    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Position:") {
            if position.is_some() {
                break;
            }
            let coords = rest.split_whitespace().next().unwrap_or_default();
            position = Some(parse_pair(coords, ',')?);
        } else if let Some(rest) = line.strip_prefix("Geometry:") {
            size = Some(parse_pair(rest.trim(), 'x')?);
            break;
        }
    }

    match (position, size) {
        (Some((x, y)), Some((w, h))) => Ok(Some(WindowRect::new(x, y, w, h))),
        (None, None) => Ok(None),
        _ => Err(WinrecError::probe(format!(
            "Incomplete xdotool geometry output: {output:?}"
        ))),
    }
}

fn parse_display_geometry(output: &str) -> WinrecResult<ScreenBounds> {
    let mut parts = output.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next()) {
        (Some(Ok(width)), Some(Ok(height))) => Ok(ScreenBounds::new(width, height)),
        _ => Err(WinrecError::probe(format!(
            "Unexpected xdotool getdisplaygeometry output: {output:?}"
        ))),
    }
}

fn parse_pair(text: &str, separator: char) -> WinrecResult<(i32, i32)> {
    let (a, b) = text
        .split_once(separator)
        .ok_or_else(|| WinrecError::probe(format!("Malformed xdotool pair: {text:?}")))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| WinrecError::probe(format!("Malformed xdotool number {v:?}: {e}")))
    };
    Ok((parse(a)?, parse(b)?))
}

fn escape_regex(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
