//! Keyboard and paste handling for the entry grid.
//!
//! The navigator only computes coordinates. Resolving a coordinate to a
//! focusable control is up to the presentation layer, which answers through
//! the `focusable` predicate.

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::cart::QuantityStore;
use crate::domain::services::variant_index::{CellState, VariantIndex};
use crate::domain::value_objects::parse_quantity;

/// A quantity input. Single-option products use `Index`, two-option
/// products use `Grid` (row = first option, col = second option).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Index(usize),
    Grid { row: usize, col: usize },
}

impl Cell {
    /// The cell `steps` further along the primary entry direction (down).
    fn advance(self, steps: usize) -> Option<Cell> {
        match self {
            Cell::Index(i) => i.checked_add(steps).map(Cell::Index),
            Cell::Grid { row, col } => row.checked_add(steps).map(|row| Cell::Grid { row, col }),
        }
    }
}

/// Key names as reported by the browser (`KeyboardEvent.key`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    #[serde(other)]
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "cell", rename_all = "snake_case")]
pub enum Navigation {
    /// Focus and select the contents of this cell.
    Move(Cell),
    /// Key consumed, focus stays put.
    Stay,
    /// Not a navigation key; normal text editing applies.
    Unhandled,
}

pub fn navigate(from: Cell, key: NavKey, focusable: impl Fn(Cell) -> bool) -> Navigation {
    let target = match (from, key) {
        (Cell::Index(i), NavKey::ArrowUp) => i.checked_sub(1).map(Cell::Index),
        (Cell::Index(i), NavKey::ArrowDown | NavKey::Enter) => i.checked_add(1).map(Cell::Index),
        (Cell::Index(_), _) => return Navigation::Unhandled,
        (Cell::Grid { row, col }, NavKey::ArrowUp) => row.checked_sub(1).map(|row| Cell::Grid { row, col }),
        (Cell::Grid { row, col }, NavKey::ArrowDown | NavKey::Enter) => row.checked_add(1).map(|row| Cell::Grid { row, col }),
        (Cell::Grid { row, col }, NavKey::ArrowLeft) => col.checked_sub(1).map(|col| Cell::Grid { row, col }),
        (Cell::Grid { row, col }, NavKey::ArrowRight) => col.checked_add(1).map(|col| Cell::Grid { row, col }),
        (Cell::Grid { .. }, NavKey::Other) => return Navigation::Unhandled,
    };

    if let Some(cell) = target.filter(|&c| focusable(c)) {
        return Navigation::Move(cell);
    }

    // Bottom of a column wraps to the top of the next one.
    if let (Cell::Grid { col, .. }, NavKey::ArrowDown | NavKey::Enter) = (from, key) {
        if let Some(top) = col.checked_add(1).map(|col| Cell::Grid { row: 0, col }).filter(|&c| focusable(c)) {
            return Navigation::Move(top);
        }
    }
    Navigation::Stay
}

/// Navigation against the cells of an indexed product.
pub fn navigate_index(index: &VariantIndex, from: Cell, key: NavKey) -> Navigation {
    navigate(from, key, |cell| index.is_focusable(cell))
}

/// Applies clipboard text starting at `start`, one line per cell going down.
///
/// Unparsable or negative lines are skipped without touching the cell, a
/// `0` clears it. Lines that land past the last option value, on a missing
/// variant or on an out-of-stock variant are ignored. Returns the number of
/// cells written.
pub fn paste(store: &mut QuantityStore, index: &VariantIndex, start: Cell, text: &str) -> usize {
    let mut written = 0;
    for (offset, line) in text.split('\n').enumerate() {
        let Some(qty) = parse_quantity(line.trim_end_matches('\r')) else { continue };
        let Some(cell) = start.advance(offset) else { break };
        if let CellState::Open(variant) = index.cell(cell) {
            store.set_or_remove(variant.id.clone(), qty);
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::fixtures::{option, socks, tee, variant};
    use crate::domain::aggregates::product::Product;
    use crate::domain::value_objects::{ProductId, VariantId};
    use rust_decimal::Decimal;

    fn full_grid(rows: usize, cols: usize) -> impl Fn(Cell) -> bool {
        move |cell| matches!(cell, Cell::Grid { row, col } if row < rows && col < cols)
    }

    #[test]
    fn test_grid_arrow_keys() {
        let grid = full_grid(3, 3);
        let at = Cell::Grid { row: 1, col: 1 };
        assert_eq!(navigate(at, NavKey::ArrowUp, &grid), Navigation::Move(Cell::Grid { row: 0, col: 1 }));
        assert_eq!(navigate(at, NavKey::ArrowDown, &grid), Navigation::Move(Cell::Grid { row: 2, col: 1 }));
        assert_eq!(navigate(at, NavKey::ArrowLeft, &grid), Navigation::Move(Cell::Grid { row: 1, col: 0 }));
        assert_eq!(navigate(at, NavKey::ArrowRight, &grid), Navigation::Move(Cell::Grid { row: 1, col: 2 }));
        assert_eq!(navigate(at, NavKey::Other, &grid), Navigation::Unhandled);
        assert_eq!(navigate(Cell::Grid { row: 0, col: 0 }, NavKey::ArrowUp, &grid), Navigation::Stay);
        assert_eq!(navigate(Cell::Grid { row: 0, col: 2 }, NavKey::ArrowRight, &grid), Navigation::Stay);
    }

    #[test]
    fn test_enter_wraps_to_next_column() {
        let grid = full_grid(4, 3);
        assert_eq!(
            navigate(Cell::Grid { row: 3, col: 0 }, NavKey::Enter, &grid),
            Navigation::Move(Cell::Grid { row: 0, col: 1 })
        );
        assert_eq!(
            navigate(Cell::Grid { row: 3, col: 1 }, NavKey::ArrowDown, &grid),
            Navigation::Move(Cell::Grid { row: 0, col: 2 })
        );
        assert_eq!(navigate(Cell::Grid { row: 3, col: 2 }, NavKey::Enter, &grid), Navigation::Stay);
    }

    #[test]
    fn test_arrow_up_never_wraps() {
        let grid = full_grid(2, 2);
        assert_eq!(navigate(Cell::Grid { row: 0, col: 1 }, NavKey::ArrowUp, &grid), Navigation::Stay);
    }

    #[test]
    fn test_single_option_keys() {
        let list = |cell: Cell| matches!(cell, Cell::Index(i) if i < 3);
        assert_eq!(navigate(Cell::Index(0), NavKey::Enter, list), Navigation::Move(Cell::Index(1)));
        assert_eq!(navigate(Cell::Index(1), NavKey::ArrowUp, list), Navigation::Move(Cell::Index(0)));
        assert_eq!(navigate(Cell::Index(2), NavKey::ArrowDown, list), Navigation::Stay);
        assert_eq!(navigate(Cell::Index(0), NavKey::ArrowUp, list), Navigation::Stay);
        assert_eq!(navigate(Cell::Index(1), NavKey::ArrowRight, list), Navigation::Unhandled);
    }

    #[test]
    fn test_grid_focus_walks_through_stocked_out_cells() {
        // L / Red is out of stock but keeps its input; XL / Blue does not exist.
        let index = VariantIndex::build(&tee()).unwrap();
        assert_eq!(
            navigate_index(&index, Cell::Grid { row: 1, col: 0 }, NavKey::Enter),
            Navigation::Move(Cell::Grid { row: 2, col: 0 })
        );
        assert_eq!(
            navigate_index(&index, Cell::Grid { row: 2, col: 0 }, NavKey::Enter),
            Navigation::Move(Cell::Grid { row: 3, col: 0 })
        );
        assert_eq!(
            navigate_index(&index, Cell::Grid { row: 2, col: 1 }, NavKey::ArrowDown),
            Navigation::Stay
        );
    }

    #[test]
    fn test_single_option_skips_out_of_stock_rows() {
        // sock-m is out of stock and renders no input.
        let index = VariantIndex::build(&socks()).unwrap();
        assert_eq!(navigate_index(&index, Cell::Index(0), NavKey::Enter), Navigation::Stay);
        assert_eq!(navigate_index(&index, Cell::Index(2), NavKey::ArrowUp), Navigation::Stay);
    }

    #[test]
    fn test_coordinates_at_the_numeric_limit() {
        let all = |_: Cell| true;
        let edge = Cell::Grid { row: usize::MAX, col: usize::MAX };
        assert_eq!(navigate(edge, NavKey::ArrowRight, all), Navigation::Stay);
        assert_eq!(navigate(edge, NavKey::Enter, all), Navigation::Stay);
        assert_eq!(navigate(Cell::Grid { row: usize::MAX, col: 0 }, NavKey::ArrowDown, all), Navigation::Move(Cell::Grid { row: 0, col: 1 }));
        assert_eq!(navigate(Cell::Index(usize::MAX), NavKey::ArrowDown, all), Navigation::Stay);
    }

    fn open_column(rows: &[&str]) -> Product {
        Product {
            id: ProductId::new("p"),
            title: "Cap".into(),
            options: vec![option("Size", rows), option("Color", &["Black"])],
            variants: rows
                .iter()
                .map(|r| variant(&format!("cap-{r}"), Decimal::ONE, Some(50), &[("Size", *r), ("Color", "Black")]))
                .collect(),
            media: vec![],
        }
    }

    #[test]
    fn test_paste_skips_invalid_lines() {
        let index = VariantIndex::build(&open_column(&["S", "M", "L", "XL"])).unwrap();
        let mut store = QuantityStore::new();
        store.set(VariantId::new("cap-L"), "7");
        let written = paste(&mut store, &index, Cell::Grid { row: 0, col: 0 }, "3\n5\nabc\n2");
        assert_eq!(written, 3);
        assert_eq!(store.get(&VariantId::new("cap-S")), 3);
        assert_eq!(store.get(&VariantId::new("cap-M")), 5);
        assert_eq!(store.get(&VariantId::new("cap-L")), 7);
        assert_eq!(store.get(&VariantId::new("cap-XL")), 2);
    }

    #[test]
    fn test_paste_crlf_and_bounds() {
        let index = VariantIndex::build(&open_column(&["S", "M"])).unwrap();
        let mut store = QuantityStore::new();
        let written = paste(&mut store, &index, Cell::Grid { row: 1, col: 0 }, "4\r\n6\r\n8\r\n");
        assert_eq!(written, 1);
        assert_eq!(store.get(&VariantId::new("cap-M")), 4);
        assert_eq!(store.total(), 4);
    }

    #[test]
    fn test_paste_zero_clears_and_negative_is_ignored() {
        let index = VariantIndex::build(&open_column(&["S", "M"])).unwrap();
        let mut store = QuantityStore::new();
        store.set(VariantId::new("cap-S"), "3");
        store.set(VariantId::new("cap-M"), "3");
        paste(&mut store, &index, Cell::Grid { row: 0, col: 0 }, "0\n-2");
        assert_eq!(store.get(&VariantId::new("cap-S")), 0);
        assert_eq!(store.get(&VariantId::new("cap-M")), 3);
    }

    #[test]
    fn test_paste_is_positional_over_sparse_rows() {
        // Rows map to option values, not to existing variants: M / Blue is
        // out of stock and XL / Blue is missing, both lines are dropped.
        let index = VariantIndex::build(&tee()).unwrap();
        let mut store = QuantityStore::new();
        paste(&mut store, &index, Cell::Grid { row: 0, col: 1 }, "1\n2\n3\n4");
        assert_eq!(store.get(&VariantId::new("v-s-blue")), 1);
        assert_eq!(store.get(&VariantId::new("v-l-blue")), 3);
        assert_eq!(store.total(), 4);

        let mut store = QuantityStore::new();
        paste(&mut store, &index, Cell::Grid { row: 1, col: 0 }, "2\n9\n1");
        assert_eq!(store.get(&VariantId::new("v-m-red")), 2);
        assert_eq!(store.get(&VariantId::new("v-l-red")), 0);
        assert_eq!(store.get(&VariantId::new("v-xl-red")), 1);
    }

    #[test]
    fn test_single_option_paste() {
        let index = VariantIndex::build(&socks()).unwrap();
        let mut store = QuantityStore::new();
        paste(&mut store, &index, Cell::Index(2), "5\n6\n7");
        assert_eq!(store.get(&VariantId::new("sock-l")), 5);
        assert_eq!(store.get(&VariantId::new("sock-xl")), 6);
        assert_eq!(store.len(), 2);
    }
}
