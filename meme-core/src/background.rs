//! Board background: a solid color or a two-stop linear gradient.
//!
//! Backgrounds are described with CSS syntax, the same strings the palette
//! swatches carry:
//!
//! ```text
//! #3498db
//! linear-gradient(135deg, #667eea 0%, #764ba2 100%)
//! linear-gradient(to right, rgb(255, 0, 0), gold)
//! ```

use crate::error::{CoreError, CoreResult};

/// Background used when nothing else is known.
pub const DEFAULT_BACKGROUND: &str = "#3498db";

/// CSS default gradient direction ("to bottom").
const DEFAULT_GRADIENT_ANGLE: f32 = 180.0;

/// A parsed background descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Flat fill.
    Solid(String),
    /// Two-stop linear gradient across the whole board.
    LinearGradient {
        /// CSS angle in degrees (0 = towards the top, 90 = towards the right).
        angle: f32,
        /// Start color.
        from: String,
        /// End color.
        to: String,
    },
}

impl Default for Background {
    fn default() -> Self {
        Self::Solid(DEFAULT_BACKGROUND.to_string())
    }
}

impl Background {
    /// Parse a descriptor, degrading instead of failing.
    ///
    /// A malformed gradient falls back to its first color, and anything
    /// unusable falls back to [`DEFAULT_BACKGROUND`].
    #[must_use]
    pub fn parse(descriptor: &str) -> Self {
        match Self::try_parse(descriptor) {
            Ok(background) => background,
            Err(err) => {
                tracing::warn!("{err}; using fallback background");
                gradient_args(descriptor)
                    .and_then(|args| args.into_iter().find_map(|a| stop_color(&a)))
                    .map_or_else(Self::default, Self::Solid)
            }
        }
    }

    /// Parse a descriptor strictly.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBackground`] for empty input, markup
    /// characters, or a gradient without two color stops.
    pub fn try_parse(descriptor: &str) -> CoreResult<Self> {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidBackground("empty descriptor".into()));
        }
        if trimmed.contains(['<', '>', '"', ';']) {
            return Err(CoreError::InvalidBackground(format!(
                "unexpected characters in {trimmed:?}"
            )));
        }

        let Some(args) = gradient_args(trimmed) else {
            return Ok(Self::Solid(trimmed.to_string()));
        };

        let mut args = args.into_iter().peekable();
        let mut angle = DEFAULT_GRADIENT_ANGLE;
        if let Some(first) = args.peek() {
            if let Some(parsed) = parse_direction(first) {
                angle = parsed;
                args.next();
            }
        }

        let stops: Vec<String> = args.filter_map(|a| stop_color(&a)).collect();
        match stops.as_slice() {
            [from, .., to] => Ok(Self::LinearGradient {
                angle,
                from: from.clone(),
                to: to.clone(),
            }),
            _ => Err(CoreError::InvalidBackground(format!(
                "gradient needs two color stops: {trimmed:?}"
            ))),
        }
    }

    /// Canonical descriptor string (what gets persisted).
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            Self::Solid(color) => color.clone(),
            Self::LinearGradient { angle, from, to } => {
                format!("linear-gradient({angle}deg, {from}, {to})")
            }
        }
    }

    /// Gradient line endpoints as fractions of the board box:
    /// `(x1, y1, x2, y2)`. Solid fills return `None`.
    #[must_use]
    pub fn gradient_endpoints(&self) -> Option<(f32, f32, f32, f32)> {
        let Self::LinearGradient { angle, .. } = self else {
            return None;
        };
        let (sin, cos) = angle.to_radians().sin_cos();
        let (dx, dy) = (sin / 2.0, -cos / 2.0);
        // Snap so axis-aligned angles give exact 0/0.5/1.
        let snap = |v: f32| (v * 10_000.0).round() / 10_000.0;
        Some((snap(0.5 - dx), snap(0.5 - dy), snap(0.5 + dx), snap(0.5 + dy)))
    }

    /// A representative single color (the solid color or the first stop).
    #[must_use]
    pub fn primary_color(&self) -> &str {
        match self {
            Self::Solid(color) | Self::LinearGradient { from: color, .. } => color,
        }
    }
}

/// Arguments inside `linear-gradient(...)`, split on top-level commas.
fn gradient_args(descriptor: &str) -> Option<Vec<String>> {
    let trimmed = descriptor.trim();
    let prefix = "linear-gradient(";
    if !trimmed
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    {
        return None;
    }
    let rest = &trimmed[prefix.len()..];
    let inner = rest.strip_suffix(')').unwrap_or(rest);

    let mut args = Vec::new();
    let mut depth = 0_u32;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    Some(args)
}

/// Parse a gradient direction argument into a CSS angle.
fn parse_direction(arg: &str) -> Option<f32> {
    let lower = arg.trim().to_ascii_lowercase();
    if let Some(deg) = lower.strip_suffix("deg") {
        return deg.trim().parse().ok();
    }
    if let Some(turn) = lower.strip_suffix("turn") {
        return turn.trim().parse::<f32>().ok().map(|t| t * 360.0);
    }
    let side = lower.strip_prefix("to ")?;
    let angle = match side.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["top"] => 0.0,
        ["right"] => 90.0,
        ["bottom"] => 180.0,
        ["left"] => 270.0,
        ["top", "right"] | ["right", "top"] => 45.0,
        ["bottom", "right"] | ["right", "bottom"] => 135.0,
        ["bottom", "left"] | ["left", "bottom"] => 225.0,
        ["top", "left"] | ["left", "top"] => 315.0,
        _ => return None,
    };
    Some(angle)
}

/// The color part of a color stop (`"#fff 30%"` -> `"#fff"`).
fn stop_color(arg: &str) -> Option<String> {
    let arg = arg.trim();
    if arg.is_empty() || parse_direction(arg).is_some() {
        return None;
    }
    let color = match arg.rfind(')') {
        Some(end) => &arg[..=end],
        None => arg.split_whitespace().next().unwrap_or(arg),
    };
    Some(color.to_string())
}
