//! Page selection and sheet navigation for N-up imposition

use crate::layout::{GridLayout, create_grid_layout};
use crate::range::{format_page_ranges, parse_page_range};
use crate::types::*;

/// Which source pages go out, how many per sheet, and which sheet is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpositionSelection {
    source_page_count: u32,
    /// Strictly increasing, within `1..=source_page_count`
    selected: Vec<u32>,
    pages_per_sheet: usize,
    orientation: Orientation,
    current_sheet: usize,
}

impl ImpositionSelection {
    /// Every page selected, one page per sheet, portrait
    pub fn new(source_page_count: u32) -> Self {
        Self {
            source_page_count,
            selected: (1..=source_page_count).collect(),
            pages_per_sheet: 1,
            orientation: Orientation::Portrait,
            current_sheet: 0,
        }
    }

    pub fn source_page_count(&self) -> u32 {
        self.source_page_count
    }

    pub fn selected_pages(&self) -> &[u32] {
        &self.selected
    }

    pub fn pages_per_sheet(&self) -> usize {
        self.pages_per_sheet
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn current_sheet(&self) -> usize {
        self.current_sheet
    }

    pub fn is_selected(&self, page: u32) -> bool {
        self.selected.binary_search(&page).is_ok()
    }

    /// Canonical range text for the current selection
    pub fn range_text(&self) -> String {
        format_page_ranges(&self.selected)
    }

    pub fn grid(&self) -> GridLayout {
        create_grid_layout(self.pages_per_sheet, self.orientation)
    }

    // -- Selection ------------------------------------------------------------

    /// Replace the selection with the pages named by `input`
    pub fn apply_range(&mut self, input: &str) {
        self.set_selected(parse_page_range(input, self.source_page_count));
    }

    pub fn select_all(&mut self) {
        self.set_selected((1..=self.source_page_count).collect());
    }

    pub fn select_none(&mut self) {
        self.set_selected(Vec::new());
    }

    /// Flip one page in or out of the selection. Out-of-range pages are
    /// ignored.
    pub fn toggle_page(&mut self, page: u32) {
        if page == 0 || page > self.source_page_count {
            return;
        }
        match self.selected.binary_search(&page) {
            Ok(index) => {
                self.selected.remove(index);
            }
            Err(index) => self.selected.insert(index, page),
        }
        self.clamp_sheet();
    }

    fn set_selected(&mut self, pages: Vec<u32>) {
        self.selected = pages;
        self.clamp_sheet();
    }

    // -- Layout ---------------------------------------------------------------

    /// Change pages per sheet. Zero is treated as one. Resets to the first
    /// sheet.
    pub fn set_pages_per_sheet(&mut self, pages_per_sheet: usize) {
        self.pages_per_sheet = pages_per_sheet.max(1);
        self.current_sheet = 0;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    // -- Sheets ---------------------------------------------------------------

    /// Number of output sheets; zero when nothing is selected
    pub fn total_sheets(&self) -> usize {
        self.selected.len().div_ceil(self.pages_per_sheet)
    }

    pub fn next_sheet(&mut self) -> usize {
        self.set_sheet(self.current_sheet.saturating_add(1))
    }

    pub fn previous_sheet(&mut self) -> usize {
        self.set_sheet(self.current_sheet.saturating_sub(1))
    }

    /// Jump to a sheet, clamped to the valid range. Returns the sheet shown.
    pub fn set_sheet(&mut self, index: usize) -> usize {
        self.current_sheet = index.min(self.total_sheets().saturating_sub(1));
        self.current_sheet
    }

    /// Source pages on the sheet currently shown
    pub fn current_chunk(&self) -> &[u32] {
        self.chunks().nth(self.current_sheet).unwrap_or(&[])
    }

    /// Source pages of every sheet, in output order
    pub fn chunks(&self) -> std::slice::Chunks<'_, u32> {
        self.selected.chunks(self.pages_per_sheet)
    }

    fn clamp_sheet(&mut self) {
        self.set_sheet(self.current_sheet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_selects_everything() {
        let selection = ImpositionSelection::new(5);
        assert_eq!(selection.selected_pages(), &[1, 2, 3, 4, 5]);
        assert_eq!(selection.range_text(), "1-5");
        assert_eq!(selection.total_sheets(), 5);
    }

    #[test]
    fn test_chunks_and_sheet_count() {
        let mut selection = ImpositionSelection::new(10);
        selection.set_pages_per_sheet(4);

        assert_eq!(selection.total_sheets(), 3);
        selection.set_sheet(99);
        assert_eq!(selection.current_sheet(), 2);
        assert_eq!(selection.current_chunk(), &[9, 10]);
    }

    #[test]
    fn test_pages_per_sheet_resets_sheet() {
        let mut selection = ImpositionSelection::new(10);
        selection.set_pages_per_sheet(2);
        selection.next_sheet();
        selection.next_sheet();
        assert_eq!(selection.current_sheet(), 2);

        selection.set_pages_per_sheet(4);
        assert_eq!(selection.current_sheet(), 0);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut selection = ImpositionSelection::new(3);
        assert_eq!(selection.previous_sheet(), 0);
        selection.next_sheet();
        selection.next_sheet();
        assert_eq!(selection.next_sheet(), 2);
    }

    #[test]
    fn test_empty_selection() {
        let mut selection = ImpositionSelection::new(4);
        selection.next_sheet();
        selection.select_none();

        assert_eq!(selection.total_sheets(), 0);
        assert_eq!(selection.current_sheet(), 0);
        assert!(selection.current_chunk().is_empty());
        assert_eq!(selection.next_sheet(), 0);
    }

    #[test]
    fn test_toggle_keeps_order() {
        let mut selection = ImpositionSelection::new(6);
        selection.apply_range("5, 1");
        selection.toggle_page(3);
        selection.toggle_page(5);
        selection.toggle_page(9);

        assert_eq!(selection.selected_pages(), &[1, 3]);
        assert!(selection.is_selected(3));
        assert!(!selection.is_selected(5));
    }

    #[test]
    fn test_shrinking_selection_clamps_sheet() {
        let mut selection = ImpositionSelection::new(8);
        selection.set_sheet(7);
        selection.apply_range("1-3");
        assert_eq!(selection.current_sheet(), 2);
    }
}
