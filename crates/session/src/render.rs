use crate::color::Color;

/// Which sequence a rendered line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Live,
    History,
}

/// Presentation-ready chat row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub section: Section,
    pub from: String,
    pub body: String,
    pub background: Color,
    /// Sent by the local user under the current nickname.
    pub own: bool,
    /// Historical line from someone else, drawn with de-emphasised text.
    pub muted: bool,
}

impl ChatLine {
    pub fn text(&self) -> String {
        format!("{}: {}", self.from, self.body)
    }
}
