// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

const PAGE_WINDOW: usize = 2;
const MAX_VISIBLE_PAGES: usize = PAGE_WINDOW * 2 + 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    pub page: usize,
    pub total_pages: usize,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Slices one page out of `records`. Out-of-range pages are clamped and an
/// empty record set yields an empty first page.
pub fn paginate<T>(records: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total = total_pages(records.len(), page_size);
    let page = page.clamp(1, total.max(1));
    let start = (page - 1).saturating_mul(page_size).min(records.len());
    let end = start.saturating_add(page_size).min(records.len());
    Page {
        rows: &records[start..end],
        page,
        total_pages: total,
    }
}

/// Page numbers to offer around `current`: at most five, contiguous, and
/// shifted so they stay inside `[1, total]`.
pub fn visible_pages(current: usize, total: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let span = MAX_VISIBLE_PAGES.min(total);
    let start = current
        .saturating_sub(PAGE_WINDOW)
        .max(1)
        .min(total + 1 - span);
    (start..start + span).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    current_page: usize,
    items_per_page: usize,
}

impl PaginationState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    pub const fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_pages(total_items, self.items_per_page)
    }

    /// Returns true when the page actually moved.
    pub fn set_page(&mut self, page: usize, total_items: usize) -> bool {
        let clamped = page.clamp(1, self.total_pages(total_items).max(1));
        let changed = clamped != self.current_page;
        self.current_page = clamped;
        changed
    }

    pub fn next(&mut self, total_items: usize) -> bool {
        self.set_page(self.current_page.saturating_add(1), total_items)
    }

    pub fn prev(&mut self, total_items: usize) -> bool {
        self.set_page(self.current_page.saturating_sub(1), total_items)
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.items_per_page = items_per_page.max(1);
        self.current_page = 1;
    }

    pub fn clamp(&mut self, total_items: usize) {
        self.set_page(self.current_page, total_items);
    }
}
