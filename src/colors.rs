use palette::Srgb;

use crate::error::{LightError, Result};

pub type Color = Srgb<u8>;

const NAMED_COLORS: [(&str, [u8; 3]); 13] = [
    ("white", [0xFF, 0xFF, 0xFF]),
    ("red", [0xFF, 0x00, 0x00]),
    ("orange", [0xFF, 0x20, 0x00]),
    ("yellow", [0xFF, 0x92, 0x00]),
    ("ferngreen", [0xAA, 0xFF, 0x00]),
    ("green", [0x00, 0xFF, 0x00]),
    ("seagreen", [0x0E, 0xFF, 0x1E]),
    ("cyan", [0x00, 0xFF, 0xDD]),
    ("lavender", [0x44, 0x33, 0xFA]),
    ("blue", [0x00, 0x00, 0xFF]),
    ("violet", [0x99, 0x00, 0xFF]),
    ("magenta", [0xFE, 0x00, 0xAE]),
    ("pink", [0xFF, 0x00, 0x16]),
];

pub fn named_color(name: &str) -> Option<Color> {
    let name = name.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, [r, g, b])| Srgb::new(*r, *g, *b))
}

/// All palette entries sorted by name.
pub fn palette() -> Vec<(&'static str, Color)> {
    let mut entries: Vec<_> = NAMED_COLORS
        .iter()
        .map(|(name, [r, g, b])| (*name, Srgb::new(*r, *g, *b)))
        .collect();
    entries.sort_by_key(|(name, _)| *name);
    entries
}

pub fn is_color_literal(input: &str) -> bool {
    input.starts_with('#') || named_color(input).is_some()
}

/// Resolves a color name (case-insensitive) or a `#`-prefixed hex code.
pub fn resolve_color(input: &str) -> Result<Color> {
    if input.starts_with('#') {
        return input
            .parse::<Color>()
            .map_err(|_| LightError::InvalidColor(input.to_string()));
    }

    named_color(input).ok_or_else(|| LightError::InvalidColor(input.to_string()))
}

/// Resolves every entry, dropping the invalid ones. Fails only if nothing is left.
pub fn parse_color_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Color>> {
    let colors: Vec<Color> = inputs
        .iter()
        .filter_map(|input| match resolve_color(input.as_ref()) {
            Ok(color) => Some(color),
            Err(err) => {
                log::debug!("Dropping color: {err}");
                None
            }
        })
        .collect();

    if colors.is_empty() {
        return Err(LightError::NoValidColors(
            inputs.iter().map(|s| s.as_ref().to_string()).collect(),
        ));
    }

    Ok(colors)
}

pub fn to_hex(color: Color) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

pub fn default_colors() -> Vec<Color> {
    vec![Srgb::new(0xFE, 0x00, 0xAE), Srgb::new(0x00, 0xFF, 0xDD)]
}

/// Non-empty list of colors with a wrapping cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorSequence {
    colors: Vec<Color>,
    index: usize,
}

impl ColorSequence {
    pub fn new(colors: Vec<Color>) -> Option<ColorSequence> {
        if colors.is_empty() {
            return None;
        }

        Some(ColorSequence { colors, index: 0 })
    }

    pub fn or_default(colors: Vec<Color>) -> ColorSequence {
        ColorSequence::new(colors).unwrap_or_else(|| ColorSequence {
            colors: default_colors(),
            index: 0,
        })
    }

    pub fn single(color: Color) -> ColorSequence {
        ColorSequence {
            colors: vec![color],
            index: 0,
        }
    }

    pub fn current(&self) -> Color {
        self.colors[self.index]
    }

    pub fn advance(&mut self) -> Color {
        self.index = (self.index + 1) % self.colors.len();
        self.current()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }
}
