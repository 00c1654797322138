use crate::database::models::StockLevels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    /// Goods leave with an order; never drops below zero
    Decrement,
    /// Goods come back from a cancelled or deleted order
    Restore,
}

/// Move `qty` units of `unit_type` in or out of a product's stock.
///
/// The first unit option with a matching `unit_type` and the product total
/// both move; a unit type the product does not offer only moves the total.
pub fn apply(levels: &mut StockLevels, unit_type: &str, qty: i32, movement: StockMovement) {
    let shift = |current: i32| match movement {
        StockMovement::Decrement => current.saturating_sub(qty).max(0),
        StockMovement::Restore => current.saturating_add(qty),
    };

    if let Some(option) = levels.unit_options.0.iter_mut().find(|o| o.unit_type == unit_type) {
        option.stock = shift(option.stock);
    }
    levels.stock = shift(levels.stock);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UnitOption;
    use sqlx::types::Json;

    fn levels() -> StockLevels {
        StockLevels {
            stock: 20,
            unit_options: Json(vec![
                UnitOption { unit_type: "Gói".into(), price: 15000.0, stock: 12 },
                UnitOption { unit_type: "Thùng".into(), price: 300000.0, stock: 8 },
            ]),
        }
    }

    #[test]
    fn decrement_moves_unit_and_total() {
        let mut l = levels();
        apply(&mut l, "Gói", 5, StockMovement::Decrement);
        assert_eq!(l.stock, 15);
        assert_eq!(l.unit_options[0].stock, 7);
        assert_eq!(l.unit_options[1].stock, 8);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let mut l = levels();
        apply(&mut l, "Thùng", 50, StockMovement::Decrement);
        assert_eq!(l.stock, 0);
        assert_eq!(l.unit_options[1].stock, 0);
    }

    #[test]
    fn restore_adds_back() {
        let mut l = levels();
        apply(&mut l, "Thùng", 3, StockMovement::Restore);
        assert_eq!(l.stock, 23);
        assert_eq!(l.unit_options[1].stock, 11);
    }

    #[test]
    fn unknown_unit_only_moves_total() {
        let mut l = levels();
        apply(&mut l, "Lốc", 4, StockMovement::Decrement);
        assert_eq!(l.stock, 16);
        assert_eq!(l.unit_options[0].stock, 12);
        assert_eq!(l.unit_options[1].stock, 8);
    }
}
