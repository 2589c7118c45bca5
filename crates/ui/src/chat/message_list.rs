use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::rc::Rc;

use charla_session::ChatLine;
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, v_flex, v_virtual_list};

use crate::chat::scroll_manager::ScrollManager;

const DEFAULT_CONTENT_WIDTH: Pixels = px(680.);
const LIST_HORIZONTAL_PADDING: Pixels = px(16.);
const CONTENT_WIDTH_CHANGE_EPSILON: f32 = 1.0;
const BUBBLE_MAX_WIDTH: Pixels = px(540.);
const BUBBLE_PADDING_X: Pixels = px(14.);
const BUBBLE_PADDING_Y: Pixels = px(8.);
const ESTIMATED_TEXT_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;

/// Bubbles use fixed light backgrounds, so text stays dark in every theme.
const LINE_TEXT_COLOR: u32 = 0x1F2328;
const MUTED_TEXT_COLOR: u32 = 0x6C757D;

pub const EMPTY_LIST_LABEL: &str = "Todavía no hay mensajes";

struct RowHeight {
    layout_hash: u64,
    height: Pixels,
    measured: bool,
}

/// Renders the session's projected lines: live messages, then history.
pub struct MessageList {
    lines: Vec<ChatLine>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    row_heights: HashMap<usize, RowHeight>,
    scroll_manager: ScrollManager,
    content_width: Option<Pixels>,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            lines: Vec::new(),
            item_sizes: Rc::new(Vec::new()),
            row_heights: HashMap::new(),
            scroll_manager: ScrollManager::new(),
            content_width: None,
        }
    }

    pub fn set_lines(&mut self, lines: Vec<ChatLine>, cx: &mut Context<Self>) {
        let grew = lines.len() > self.lines.len();
        self.lines = lines;
        self.rebuild_item_sizes();

        if grew {
            self.scroll_manager.request_scroll_to_bottom_if_following();
        }

        cx.notify();
    }

    pub fn request_scroll_to_bottom(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.request_scroll_to_bottom();
        cx.notify();
    }

    fn update_content_width(&mut self, cx: &mut Context<Self>) {
        let list_width = self.scroll_manager.bounds().size.width;
        if list_width <= Pixels::ZERO {
            return;
        }

        let next_width = max_pixels(px(1.), list_width - LIST_HORIZONTAL_PADDING * 2);
        let width_changed = self.content_width.is_none_or(|current| {
            (f32::from(current) - f32::from(next_width)).abs() > CONTENT_WIDTH_CHANGE_EPSILON
        });

        if width_changed {
            self.content_width = Some(next_width);
            for entry in self.row_heights.values_mut() {
                entry.measured = false;
            }
            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn rebuild_item_sizes(&mut self) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let mut sizes = Vec::with_capacity(self.lines.len());

        for (index, line) in self.lines.iter().enumerate() {
            let next_hash = layout_hash(line);
            let estimated = estimate_line_height(line, content_width);
            let entry = self.row_heights.entry(index).or_insert(RowHeight {
                layout_hash: next_hash,
                height: estimated,
                measured: false,
            });

            if entry.layout_hash != next_hash {
                entry.layout_hash = next_hash;
                entry.height = estimated;
                entry.measured = false;
            } else if !entry.measured {
                entry.height = estimated;
            }

            sizes.push(size(px(0.), entry.height));
        }

        let line_count = self.lines.len();
        self.row_heights.retain(|index, _| *index < line_count);
        self.item_sizes = Rc::new(sizes);
    }

    fn measure_visible_rows(
        &mut self,
        visible_range: Range<usize>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let available_space = size(
            AvailableSpace::Definite(content_width),
            AvailableSpace::MinContent,
        );
        let mut updated = false;

        for index in visible_range {
            let Some(line) = self.lines.get(index).cloned() else {
                continue;
            };

            let mut row = render_line(&line);
            let measured = row.layout_as_root(available_space, window, cx).height;
            let Some(entry) = self.row_heights.get_mut(&index) else {
                continue;
            };
            if !entry.measured || pixels_changed(entry.height, measured) {
                entry.height = measured;
                updated = true;
            }
            entry.measured = true;
        }

        if updated {
            self.rebuild_item_sizes();
            cx.notify();
        }
    }
}

fn render_line(line: &ChatLine) -> AnyElement {
    let text_color = if line.muted {
        MUTED_TEXT_COLOR
    } else {
        LINE_TEXT_COLOR
    };

    h_flex()
        .w_full()
        .when(line.own, |row| row.justify_end())
        .child(
            div()
                .max_w(BUBBLE_MAX_WIDTH)
                .px(BUBBLE_PADDING_X)
                .py(BUBBLE_PADDING_Y)
                .rounded_lg()
                .bg(rgb(line.background.rgb()))
                .child(
                    Label::new(line.text())
                        .text_sm()
                        .text_color(rgb(text_color)),
                ),
        )
        .into_any_element()
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.update_content_width(cx);
        self.scroll_manager.sync();

        if self.lines.is_empty() {
            let theme = cx.theme();
            return v_flex()
                .size_full()
                .items_center()
                .justify_center()
                .child(
                    Label::new(EMPTY_LIST_LABEL)
                        .text_sm()
                        .text_color(theme.foreground.opacity(0.55)),
                )
                .into_any_element();
        }

        v_flex()
            .size_full()
            .min_h_0()
            .child(
                v_virtual_list(
                    cx.entity().clone(),
                    "message-list",
                    self.item_sizes.clone(),
                    |this, visible_range, window, cx| {
                        this.update_content_width(cx);
                        this.measure_visible_rows(visible_range.clone(), window, cx);
                        visible_range
                            .filter_map(|index| this.lines.get(index).map(render_line))
                            .collect::<Vec<_>>()
                    },
                )
                .size_full()
                .px_4()
                .py_3()
                .gap_2()
                .track_scroll(self.scroll_manager.handle()),
            )
            .into_any_element()
    }
}

fn layout_hash(line: &ChatLine) -> u64 {
    let mut hasher = DefaultHasher::new();
    line.section.hash(&mut hasher);
    line.own.hash(&mut hasher);
    line.from.hash(&mut hasher);
    line.body.hash(&mut hasher);
    hasher.finish()
}

fn estimate_line_height(line: &ChatLine, content_width: Pixels) -> Pixels {
    let bubble_width = min_pixels(content_width, BUBBLE_MAX_WIDTH);
    let text_width = max_pixels(px(1.), bubble_width - BUBBLE_PADDING_X * 2);
    estimate_text_height(&line.text(), text_width) + BUBBLE_PADDING_Y * 2
}

fn estimate_text_height(content: &str, width: Pixels) -> Pixels {
    let chars_per_line = (f32::from(width) / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;
    let line_count: usize = content
        .lines()
        .map(|line| line.chars().count().max(1).div_ceil(chars_per_line))
        .sum();

    ESTIMATED_TEXT_LINE_HEIGHT * line_count.max(1)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

fn pixels_changed(a: Pixels, b: Pixels) -> bool {
    (f32::from(a) - f32::from(b)).abs() > 0.5
}

#[cfg(test)]
mod tests {
    use charla_session::{Color, Section};

    use super::*;

    fn line(from: &str, body: &str) -> ChatLine {
        ChatLine {
            section: Section::Live,
            from: from.to_string(),
            body: body.to_string(),
            background: Color(0xFAD7A0),
            own: false,
            muted: false,
        }
    }

    #[test]
    fn long_bodies_wrap_into_taller_rows() {
        let short = estimate_line_height(&line("ana", "hola"), DEFAULT_CONTENT_WIDTH);
        let long = estimate_line_height(&line("ana", &"palabra ".repeat(80)), DEFAULT_CONTENT_WIDTH);

        assert_eq!(short, ESTIMATED_TEXT_LINE_HEIGHT + BUBBLE_PADDING_Y * 2);
        assert!(long > short);
    }

    #[test]
    fn layout_hash_tracks_visible_content_only() {
        let base = line("ana", "hola");
        let mut recoloured = base.clone();
        recoloured.background = Color(0xFEF9E7);
        let mut moved = base.clone();
        moved.section = Section::History;

        assert_eq!(layout_hash(&base), layout_hash(&recoloured));
        assert_ne!(layout_hash(&base), layout_hash(&moved));
        assert_ne!(layout_hash(&base), layout_hash(&line("ana", "chau")));
    }
}
