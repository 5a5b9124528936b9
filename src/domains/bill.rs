//! Restaurant bill interpreter.
//!
//! Line items are validated against a fixed menu and price ceiling, split
//! into food and drink buckets, and taxed at the bucket's rate.

use serde::{Deserialize, Serialize};

use crate::engine::{Interpreter, Node, Result, unexpected, validation};

/// Highest total a single line item may reach, in euros.
pub const MAX_ITEM_PRICE: f64 = 50.0;
/// Tax rate applied to food.
pub const FOOD_TAX_RATE: f64 = 0.07;
/// Tax rate applied to drinks.
pub const DRINK_TAX_RATE: f64 = 0.19;

/// Tax bucket of a menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Taxed at [`FOOD_TAX_RATE`].
    Food,
    /// Taxed at [`DRINK_TAX_RATE`].
    Drink,
}

const MENU: [(&str, Category); 6] = [
    ("burger", Category::Food),
    ("fries", Category::Food),
    ("salad", Category::Food),
    ("soda", Category::Drink),
    ("shake", Category::Drink),
    ("water", Category::Drink),
];

/// Look up an item on the menu, ignoring case.
pub fn classify(item: &str) -> Option<Category> {
    MENU.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(item))
        .map(|(_, category)| *category)
}

/// One line of a bill, as written.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItem {
    /// `item: quantity * price`
    WithQuantity {
        /// Item name as written
        item: String,
        /// Number of units
        quantity: f64,
        /// Unit price
        price: f64,
    },
    /// `item: value`
    Simple {
        /// Item name as written
        item: String,
        /// Line total
        value: f64,
    },
}

impl LineItem {
    fn from_node(node: Node) -> Result<Self> {
        match node {
            Node::Branch { rule, children } if rule == "line_item_with_quantity" => {
                let [item, quantity, price] = expect_children::<3>(&rule, children)?;
                Ok(LineItem::WithQuantity {
                    item: item.into_text()?,
                    quantity: quantity.into_number()?,
                    price: price.into_number()?,
                })
            }
            Node::Branch { rule, children } if rule == "line_item_simple" => {
                let [item, value] = expect_children::<2>(&rule, children)?;
                Ok(LineItem::Simple {
                    item: item.into_text()?,
                    value: value.into_number()?,
                })
            }
            other => Err(unexpected("line item", other.describe())),
        }
    }
}

fn expect_children<const N: usize>(rule: &str, children: Vec<Node>) -> Result<[Node; N]> {
    let found = children.len();
    children
        .try_into()
        .map_err(|_| unexpected(format!("{} with {} children", rule, N), format!("{} children", found)))
}

/// Totals of an interpreted bill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillSummary {
    /// Sum of food line totals before tax
    pub net_food_cost: f64,
    /// Sum of drink line totals before tax
    pub net_drink_cost: f64,
    /// Food tax plus drink tax
    pub total_tax: f64,
    /// Net costs plus all taxes
    pub final_bill: f64,
}

/// Running food and drink totals for one bill.
#[derive(Debug, Default)]
pub struct BillInterpreter {
    net_food_cost: f64,
    net_drink_cost: f64,
}

impl BillInterpreter {
    /// Create an interpreter with zeroed accumulators.
    pub fn new() -> Self {
        Self::default()
    }

    /// `item: quantity * price`
    pub fn line_item_with_quantity(&mut self, item: &str, quantity: f64, price: f64) -> Result<()> {
        self.validate_and_classify(item, quantity * price)
    }

    /// `item: value`
    pub fn line_item_simple(&mut self, item: &str, value: f64) -> Result<()> {
        self.validate_and_classify(item, value)
    }

    fn validate_and_classify(&mut self, item: &str, total: f64) -> Result<()> {
        let name = item.to_lowercase();
        let category = classify(&name)
            .ok_or_else(|| validation(format!("Item '{}' is not on the menu.", name)))?;

        if !total.is_finite() || total < 0.0 {
            return Err(validation(format!(
                "Item '{}' has an invalid price ({}).",
                name, total
            )));
        }
        if total > MAX_ITEM_PRICE {
            return Err(validation(format!(
                "Item '{}' with price €{:.2} exceeds the maximum of €{:.2}.",
                name, total, MAX_ITEM_PRICE
            )));
        }

        tracing::debug!(item = %name, ?category, total, "line item accepted");
        match category {
            Category::Food => self.net_food_cost += total,
            Category::Drink => self.net_drink_cost += total,
        }
        Ok(())
    }

    /// Close the bill: apply taxes to the accumulated totals.
    pub fn bill(&self) -> BillSummary {
        let food_tax = self.net_food_cost * FOOD_TAX_RATE;
        let drink_tax = self.net_drink_cost * DRINK_TAX_RATE;
        let final_bill = self.net_food_cost + self.net_drink_cost + food_tax + drink_tax;

        BillSummary {
            net_food_cost: self.net_food_cost,
            net_drink_cost: self.net_drink_cost,
            total_tax: food_tax + drink_tax,
            final_bill,
        }
    }
}

impl Interpreter for BillInterpreter {
    type Output = BillSummary;

    fn interpret(&mut self, root: Node) -> Result<BillSummary> {
        *self = Self::default();

        for child in root.into_branch("bill")? {
            match LineItem::from_node(child)? {
                LineItem::WithQuantity { item, quantity, price } => {
                    self.line_item_with_quantity(&item, quantity, price)?
                }
                LineItem::Simple { item, value } => self.line_item_simple(&item, value)?,
            }
        }

        Ok(self.bill())
    }
}
