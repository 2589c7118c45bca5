use std::collections::HashMap;
use std::fmt;

/// RGB colour packed as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const fn from_rgb(hex: u32) -> Self {
        Self(hex & 0x00FF_FFFF)
    }

    pub const fn rgb(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Background used for the local user's own lines.
pub const OWN_MESSAGE_COLOR: Color = Color::from_rgb(0xCFEFFF);

pub const DEFAULT_PALETTE: [Color; 20] = [
    Color::from_rgb(0xFAD7A0),
    Color::from_rgb(0xE6E6FA),
    Color::from_rgb(0xD6EAF8),
    Color::from_rgb(0xD5DBDB),
    Color::from_rgb(0xA9DFBF),
    Color::from_rgb(0xA3E4D7),
    Color::from_rgb(0xAED6F1),
    Color::from_rgb(0xF5B7B1),
    Color::from_rgb(0xF9E79F),
    Color::from_rgb(0xF5CBA7),
    Color::from_rgb(0xFDEBD0),
    Color::from_rgb(0xD2B4DE),
    Color::from_rgb(0xD0ECE7),
    Color::from_rgb(0xE5E7E9),
    Color::from_rgb(0xCCD1D1),
    Color::from_rgb(0xF9EBEA),
    Color::from_rgb(0xF2F3F4),
    Color::from_rgb(0xFADBD8),
    Color::from_rgb(0xEAF2F8),
    Color::from_rgb(0xFEF9E7),
];

/// Fixed, non-empty list of colours handed out to senders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Builds a palette, returning `None` for an empty colour list.
    pub fn new(colors: Vec<Color>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    fn len(&self) -> usize {
        self.colors.len()
    }

    fn get(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }
}

/// First-seen-order mapping from nickname to palette colour.
///
/// Assignments never change once made. After every palette entry has been
/// handed out the cursor wraps, so two senders may share a colour.
#[derive(Debug, Clone, Default)]
pub struct ColorAssignment {
    palette: Palette,
    assigned: HashMap<String, Color>,
    next_index: usize,
}

impl ColorAssignment {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
            next_index: 0,
        }
    }

    pub fn color_for(&mut self, nickname: &str) -> Color {
        if let Some(color) = self.assigned.get(nickname) {
            return *color;
        }

        let color = self.palette.get(self.next_index);
        self.next_index = (self.next_index + 1) % self.palette.len();
        self.assigned.insert(nickname.to_string(), color);
        color
    }

    /// Returns the colour already assigned to `nickname`, if any.
    pub fn peek(&self, nickname: &str) -> Option<Color> {
        self.assigned.get(nickname).copied()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}
