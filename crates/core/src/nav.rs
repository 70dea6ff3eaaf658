//! Header scroll-direction tracking.
//!
//! The sticky header hides while the page scrolls down and reappears on the
//! way back up. Deciding which is a pure function of two offsets and whether
//! the mobile menu is open; the caller samples offsets on its own cadence.

/// Direction the page moved between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Unchanged,
}

impl ScrollDirection {
    /// CSS class reflecting this direction on the header element.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            ScrollDirection::Up => Some("scroll-up"),
            ScrollDirection::Down => Some("scroll-down"),
            ScrollDirection::Unchanged => None,
        }
    }
}

/// Compare two scroll offsets. An open menu pins the header.
pub fn scroll_direction(previous: f64, current: f64, menu_open: bool) -> ScrollDirection {
    if menu_open || current == previous {
        ScrollDirection::Unchanged
    } else if current > previous {
        ScrollDirection::Down
    } else {
        ScrollDirection::Up
    }
}

/// Last observed offset, fed one sample at a time.
#[derive(Debug, Clone, Default)]
pub struct HeaderState {
    last_offset: f64,
    menu_open: bool,
}

impl HeaderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// Flip the mobile menu and return the new state.
    pub fn toggle_menu(&mut self) -> bool {
        self.menu_open = !self.menu_open;
        self.menu_open
    }

    /// Record a new offset and report the movement since the last one.
    ///
    /// Negative offsets (overscroll bounce) are clamped to zero.
    pub fn observe(&mut self, offset: f64) -> ScrollDirection {
        let offset = offset.max(0.0);
        let direction = scroll_direction(self.last_offset, offset, self.menu_open);
        self.last_offset = offset;
        direction
    }
}
