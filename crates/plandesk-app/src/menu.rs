// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(top: i32, left: i32, width: i32, height: i32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    pub const fn contains(&self, top: i32, left: i32) -> bool {
        top >= self.top && top < self.bottom() && left >= self.left && left < self.right()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Visible area the menu must fit in. `scroll_offset` converts between
/// viewport coordinates and document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
    pub scroll_offset: i32,
}

/// Menu origin in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuPosition {
    pub top: i32,
    pub left: i32,
}

/// First placement: level with the trigger, just past its right edge.
pub fn initial_position(trigger: Rect, viewport: Viewport, gap: i32) -> MenuPosition {
    MenuPosition {
        top: trigger.top + viewport.scroll_offset,
        left: trigger.right() + gap,
    }
}

/// Post-layout correction once the menu's own size is known. A menu running
/// past the bottom edge moves up by the overflow plus `margin`; one running
/// past the right edge flips to the trigger's left side.
pub fn corrected_position(
    position: MenuPosition,
    menu: Size,
    trigger: Rect,
    viewport: Viewport,
    gap: i32,
    margin: i32,
) -> MenuPosition {
    let measured = Rect::new(
        position.top - viewport.scroll_offset,
        position.left,
        menu.width,
        menu.height,
    );
    let mut corrected = position;

    let overflow_bottom = measured.bottom() - viewport.height;
    if overflow_bottom > 0 {
        corrected.top -= overflow_bottom + margin;
    }

    if measured.right() > viewport.width {
        corrected.left = trigger.left - menu.width - gap;
    }

    corrected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMenu {
    pub row_index: usize,
    pub trigger: Rect,
    pub position: MenuPosition,
}

/// At most one menu is open per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuState {
    open: Option<OpenMenu>,
}

impl MenuState {
    /// Opens the menu for `row_index`, replacing whatever was open. Returns
    /// the row whose menu was displaced, if any.
    pub fn open(&mut self, row_index: usize, trigger: Rect, position: MenuPosition) -> Option<usize> {
        let previous = self.open.map(|menu| menu.row_index);
        self.open = Some(OpenMenu {
            row_index,
            trigger,
            position,
        });
        previous.filter(|row| *row != row_index)
    }

    pub fn close(&mut self) -> bool {
        self.open.take().is_some()
    }

    pub fn settle(&mut self, menu: Size, viewport: Viewport, gap: i32, margin: i32) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        let corrected = corrected_position(open.position, menu, open.trigger, viewport, gap, margin);
        let changed = corrected != open.position;
        open.position = corrected;
        changed
    }

    pub const fn current(&self) -> Option<OpenMenu> {
        self.open
    }

    pub fn active_row_index(&self) -> Option<usize> {
        self.open.map(|menu| menu.row_index)
    }

    pub const fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
