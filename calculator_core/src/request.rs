use serde_json::{Map, Value};

use crate::inventory::InventoryRow;

/// Inventory as sent to the bridge: item name to quantity.
pub type InventoryMap = Map<String, Value>;

/// One calculation as entered in the form. Target fields are passed through
/// untouched; the bridge rejects malformed quantities itself.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculationRequest {
    pub target_item: String,
    pub target_quantity: String,
    pub inventory: InventoryMap,
}

impl CalculationRequest {
    /// Rows with a blank name are skipped. Unparsable quantities count as 0.
    /// When two rows share a name the later row's quantity wins.
    pub fn encode<'a, I>(target_item: &str, target_quantity: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a InventoryRow>,
    {
        let mut inventory = InventoryMap::new();
        for row in rows {
            let name = row.name.trim();
            if name.is_empty() {
                continue;
            }
            inventory.insert(name.to_string(), Value::from(parse_quantity(&row.quantity)));
        }
        Self {
            target_item: target_item.to_string(),
            target_quantity: target_quantity.to_string(),
            inventory,
        }
    }

    pub fn inventory_json(&self) -> String {
        Value::Object(self.inventory.clone()).to_string()
    }

    pub fn quantity_of(&self, name: &str) -> Option<f64> {
        self.inventory.get(name).and_then(Value::as_f64)
    }
}

pub fn parse_quantity(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<InventoryRow> {
        pairs
            .iter()
            .map(|(name, quantity)| InventoryRow::new(*name, *quantity))
            .collect()
    }

    #[test]
    fn blank_names_are_skipped() {
        let rows = rows(&[("", "5"), ("   ", "7"), ("Wood", "3")]);
        let request = CalculationRequest::encode("Chair", "2", &rows);
        assert_eq!(request.inventory.len(), 1);
        assert_eq!(request.quantity_of("Wood"), Some(3.0));
    }

    #[test]
    fn unparsable_quantity_becomes_zero() {
        let rows = rows(&[("Wood", "lots"), ("Stone", ""), ("Clay", "NaN")]);
        let request = CalculationRequest::encode("Chair", "2", &rows);
        assert_eq!(request.quantity_of("Wood"), Some(0.0));
        assert_eq!(request.quantity_of("Stone"), Some(0.0));
        assert_eq!(request.quantity_of("Clay"), Some(0.0));
    }

    #[test]
    fn later_duplicate_overwrites_earlier() {
        let rows = rows(&[("Wood", "3"), ("Stone", "1"), ("Wood", "8.5")]);
        let request = CalculationRequest::encode("Chair", "2", &rows);
        assert_eq!(request.inventory.len(), 2);
        assert_eq!(request.quantity_of("Wood"), Some(8.5));
    }

    #[test]
    fn names_are_trimmed_and_quantities_tolerate_padding() {
        let rows = rows(&[("  Bronze Ingot ", " 20 ")]);
        let request = CalculationRequest::encode("Warehouse", "1", &rows);
        assert_eq!(request.quantity_of("Bronze Ingot"), Some(20.0));
    }

    #[test]
    fn target_fields_pass_through_verbatim() {
        let empty: Vec<InventoryRow> = Vec::new();
        let request = CalculationRequest::encode(" Half-timber Warehouse ", "two", &empty);
        assert_eq!(request.target_item, " Half-timber Warehouse ");
        assert_eq!(request.target_quantity, "two");
        assert!(request.inventory.is_empty());
    }

    #[test]
    fn inventory_json_keeps_row_order() {
        let rows = rows(&[("Wood", "3"), ("Iron Ingot", "10")]);
        let request = CalculationRequest::encode("Chair", "2", &rows);
        assert_eq!(request.inventory_json(), r#"{"Wood":3.0,"Iron Ingot":10.0}"#);
    }
}
