use gpui::{Bounds, Pixels, point, px};
use gpui_component::VirtualListScrollHandle;

/// Distance from the tail that still counts as "at the bottom".
const FOLLOW_THRESHOLD: f32 = 24.0;
/// Offset changes below this are treated as layout jitter.
const SCROLL_EPSILON: f32 = 1.0;

/// One frame's view of the list scroll position.
///
/// GPUI scrolls down with negative Y offsets, so `offset + max` reaches 0 at the tail.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSample {
    pub offset: f32,
    pub max: f32,
}

impl ScrollSample {
    pub fn new(offset: f32, max: f32) -> Self {
        Self { offset, max }
    }

    pub fn is_near_bottom(&self) -> bool {
        self.max <= 0.0 || (self.offset + self.max).abs() <= FOLLOW_THRESHOLD
    }
}

/// Decides whether the list keeps pinning itself to the newest line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowState {
    following: bool,
    pending: bool,
    last: ScrollSample,
}

impl Default for FollowState {
    fn default() -> Self {
        Self {
            following: true,
            pending: false,
            last: ScrollSample::default(),
        }
    }
}

impl FollowState {
    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Unconditional jump to the tail, used after the local user sends.
    pub fn request(&mut self) {
        self.pending = true;
        self.following = true;
    }

    /// Jump only if the user has not scrolled away to read older lines.
    pub fn request_if_following(&mut self) {
        if self.following || self.last.is_near_bottom() {
            self.pending = true;
        }
    }

    pub fn observe(&mut self, sample: ScrollSample) {
        let offset_delta = sample.offset - self.last.offset;
        let content_changed = (sample.max - self.last.max).abs() > SCROLL_EPSILON;
        let scrolled_up = offset_delta > SCROLL_EPSILON && !content_changed;
        let scrolled_down = offset_delta < -SCROLL_EPSILON && !content_changed;

        if self.pending || (content_changed && self.last.is_near_bottom()) {
            self.following = true;
        } else if self.following {
            if scrolled_up {
                self.following = false;
            }
        } else if scrolled_down && sample.is_near_bottom() {
            self.following = true;
        }

        self.last = sample;
    }

    /// Consumes the pending request; true when the caller should pin to the tail.
    pub fn take_scroll(&mut self) -> bool {
        let should_scroll = self.following || self.pending;
        self.pending = false;
        should_scroll
    }
}

/// Binds [`FollowState`] to the list's scroll handle.
pub struct ScrollManager {
    scroll_handle: VirtualListScrollHandle,
    follow: FollowState,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            follow: FollowState::default(),
        }
    }

    pub fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.follow.request();
    }

    pub fn request_scroll_to_bottom_if_following(&mut self) {
        self.follow.request_if_following();
    }

    pub fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }

    /// Samples the handle, then pins to the tail if follow mode asks for it.
    pub fn sync(&mut self) -> bool {
        let offset = self.scroll_handle.offset();
        let max = self.scroll_handle.max_offset().height;
        self.follow
            .observe(ScrollSample::new(f32::from(offset.y), f32::from(max)));

        if !self.follow.take_scroll() {
            return false;
        }

        let target_y = if max > Pixels::ZERO { -max } else { px(0.) };
        self.scroll_handle.set_offset(point(offset.x, target_y));
        true
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}
