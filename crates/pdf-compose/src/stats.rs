use crate::selection::ImpositionSelection;
use crate::types::*;

/// Calculate statistics for an imposition selection
pub fn calculate_statistics(selection: &ImpositionSelection) -> ImpositionStatistics {
    let selected_pages = selection.selected_pages().len();
    let pages_per_sheet = selection.pages_per_sheet();
    let output_sheets = selection.total_sheets();

    let pages_on_last_sheet = match selected_pages % pages_per_sheet {
        0 if selected_pages > 0 => pages_per_sheet,
        remainder => remainder,
    };
    let cells_per_sheet = selection.grid().cell_count();

    ImpositionStatistics {
        source_pages: selection.source_page_count() as usize,
        selected_pages,
        pages_per_sheet,
        output_sheets,
        pages_on_last_sheet,
        empty_cells: output_sheets * cells_per_sheet - selected_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_last_sheet() {
        let mut selection = ImpositionSelection::new(10);
        selection.set_pages_per_sheet(4);
        let stats = calculate_statistics(&selection);

        assert_eq!(stats.output_sheets, 3);
        assert_eq!(stats.pages_on_last_sheet, 2);
        assert_eq!(stats.empty_cells, 2);
    }

    #[test]
    fn test_grid_larger_than_count() {
        // Three pages per sheet still use a 2x2 grid
        let mut selection = ImpositionSelection::new(3);
        selection.set_pages_per_sheet(3);
        let stats = calculate_statistics(&selection);

        assert_eq!(stats.output_sheets, 1);
        assert_eq!(stats.pages_on_last_sheet, 3);
        assert_eq!(stats.empty_cells, 1);
    }

    #[test]
    fn test_empty_selection() {
        let mut selection = ImpositionSelection::new(5);
        selection.select_none();
        let stats = calculate_statistics(&selection);

        assert_eq!(stats.source_pages, 5);
        assert_eq!(stats.output_sheets, 0);
        assert_eq!(stats.pages_on_last_sheet, 0);
        assert_eq!(stats.empty_cells, 0);
    }
}
