//! Structured Ticket Model

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Full structured ticket as produced by the POS
///
/// Sequences keep the order they were recorded in; the renderer never sorts them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StructuredTicket {
    /// Terminal identifier
    pub terminal: String,
    /// Cashier login
    pub login_user: String,
    /// Business date
    pub date: NaiveDateTime,
    /// Display time (already formatted, e.g. "14:30")
    pub time: String,
    pub payment_date: NaiveDateTime,
    pub payment_time: String,
    /// Party size tag
    pub tag_pax: String,
    pub line_items: Vec<LineItem>,
    pub discounts: Vec<NamedAmount>,
    pub services: Vec<NamedAmount>,
    pub taxes: Vec<NamedAmount>,
    pub payments: Vec<Payment>,
}

/// Ordered product line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LineItem {
    pub name: String,
    /// Fractional quantities are allowed (weighed goods)
    pub quantity: f64,
    /// Unit price
    pub price: Decimal,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: f64, price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }
}

/// Named amount used for discounts, service charges and taxes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NamedAmount {
    pub name: String,
    pub amount: Decimal,
}

impl NamedAmount {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Tender applied to the ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Payment {
    /// Tender name (e.g. "Cash", "Visa")
    pub name: String,
    pub tendered: Decimal,
    /// Change returned to the customer
    pub change: Decimal,
    pub payment_information: PaymentInfo,
}

/// Reference data attached to a payment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PaymentInfo {
    pub ref_no: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_serializes_pascal_case_names() {
        let ticket = StructuredTicket {
            terminal: "Terminal 1".to_string(),
            line_items: vec![LineItem::new("Burger", 2.0, Decimal::from_str("5.00").unwrap())],
            payments: vec![Payment {
                name: "Cash".to_string(),
                payment_information: PaymentInfo {
                    ref_no: "123456".to_string(),
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&ticket).unwrap();
        assert_eq!(value["Terminal"], "Terminal 1");
        assert_eq!(value["LineItems"][0]["Name"], "Burger");
        assert_eq!(value["LineItems"][0]["Price"], "5.00");
        assert_eq!(value["Payments"][0]["PaymentInformation"]["RefNo"], "123456");
    }

    #[test]
    fn test_deserialize_partial_record() {
        let json = r#"{
            "Terminal": "T2",
            "Date": "2024-08-12T14:30:00",
            "LineItems": [{"Name": "Rice", "Quantity": 0.5, "Price": 3.2}]
        }"#;

        let ticket: StructuredTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.terminal, "T2");
        assert_eq!(ticket.line_items.len(), 1);
        assert_eq!(ticket.line_items[0].quantity, 0.5);
        assert_eq!(ticket.line_items[0].price, Decimal::from_str("3.2").unwrap());
        assert!(ticket.payments.is_empty());
    }
}
