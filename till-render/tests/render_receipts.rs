// till-render/tests/render_receipts.rs
// Built-in layouts rendered end to end

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{LineItem, NamedAmount, Payment, PaymentInfo, PrintReadyFields, StructuredTicket};
use till_render::templates::{PRINT_READY_RECEIPT, TICKET_SUMMARY};
use till_render::{ReceiptRenderer, RenderError};

const WANT_TICKET_SUMMARY: &str = "
Terminal    : Terminal 1
Cashier     : login user test
Date        : 12/08/2024 14:30
Bill        : 12/08/2024 14:31
[Cover: 4]

#Ticket Orders#
Name: Burger 2.00 5.00
Name: Fries 1.00 2.50


#Ticket.Discounts#
Discount: Promo 10% | Amount: -1.00


#Ticket.Services#
Service: Service Charge | Amount: 1.50


#Ticket.Taxes#
Tax: GST | Amount: 0.35


#Ticket.Payments#
Tendered: Cash | Amount: 9.00
Change: 0.15
RefNo: 123456

";

const WANT_PRINT_READY: &str = "
<C10>CURRY VILLAGE
<C10>BANANA LEAF P/L
<C>8 LIM TECK KIM ROAD
<C>TEL : 6226 2562
<F>-
<C10>Receipt No: 1000
<J00>Date: |12/08/2024 10:15
test entities
<F>-
<J00> Qty Items|Price  Amount
test orders
<F>=
<EB>
test discounts
<J10>Total:|test total ticket
test payment details
<DB>
<F>=
<C10>THANK YOU
";

fn create_test_ticket() -> StructuredTicket {
    let date = NaiveDate::from_ymd_opt(2024, 8, 12)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap();

    StructuredTicket {
        terminal: "Terminal 1".to_string(),
        login_user: "login user test".to_string(),
        date,
        time: "14:30".to_string(),
        payment_date: date,
        payment_time: "14:31".to_string(),
        tag_pax: "4".to_string(),
        line_items: vec![
            LineItem::new("Burger", 2.0, Decimal::new(500, 2)),
            LineItem::new("Fries", 1.0, Decimal::new(25, 1)),
        ],
        discounts: vec![NamedAmount::new("Promo 10%", Decimal::new(-10, 1))],
        services: vec![NamedAmount::new("Service Charge", Decimal::new(15, 1))],
        taxes: vec![NamedAmount::new("GST", Decimal::new(35, 2))],
        payments: vec![Payment {
            name: "Cash".to_string(),
            tendered: Decimal::new(90, 1),
            change: Decimal::new(15, 2),
            payment_information: PaymentInfo {
                ref_no: "123456".to_string(),
            },
        }],
    }
}

fn create_test_fields() -> PrintReadyFields {
    PrintReadyFields {
        ticket_no: "1000".to_string(),
        date: "12/08/2024".to_string(),
        time: "10:15".to_string(),
        entities: "test entities".to_string(),
        orders: "test orders".to_string(),
        discounts: "test discounts".to_string(),
        ticket_total: "test total ticket".to_string(),
        payment_details: "test payment details".to_string(),
    }
}

#[test]
fn test_ticket_summary_layout() {
    let doc = ReceiptRenderer::new()
        .render_ticket(TICKET_SUMMARY, &create_test_ticket())
        .unwrap();
    assert_eq!(doc.as_str(), WANT_TICKET_SUMMARY);
}

#[test]
fn test_print_ready_layout() {
    let doc = ReceiptRenderer::new()
        .render_print_ready(PRINT_READY_RECEIPT, &create_test_fields())
        .unwrap();
    assert_eq!(doc.as_str(), WANT_PRINT_READY);
}

#[test]
fn test_line_items_keep_input_order() {
    let mut ticket = create_test_ticket();
    ticket.line_items.reverse();

    let doc = ReceiptRenderer::new()
        .render_ticket("{{range .LineItems}}{{.Name}};{{end}}", &ticket)
        .unwrap();
    assert_eq!(doc.as_str(), "Fries;Burger;");
}

#[test]
fn test_rendering_is_deterministic() {
    let renderer = ReceiptRenderer::new();
    let ticket = create_test_ticket();

    let first = renderer.render_ticket(TICKET_SUMMARY, &ticket).unwrap();
    let second = renderer.render_ticket(TICKET_SUMMARY, &ticket).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_wrong_record_shape_is_binding_error() {
    // print-ready slots have no Terminal / LineItems
    let err = till_render::render(TICKET_SUMMARY, &create_test_fields(), Some(&till_render::Functions::builtin()))
        .unwrap_err();
    assert!(matches!(err, RenderError::Binding(_)));
}

#[test]
fn test_malformed_layout_is_syntax_error() {
    let err = ReceiptRenderer::new()
        .render_ticket("{{range .LineItems}}{{.Name}}", &create_test_ticket())
        .unwrap_err();
    assert!(err.is_syntax());
}

#[test]
fn test_concurrent_renders() {
    let renderer = ReceiptRenderer::new();
    let ticket = create_test_ticket();
    let fields = create_test_fields();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let renderer = &renderer;
                let ticket = &ticket;
                let fields = &fields;
                scope.spawn(move || {
                    if i % 2 == 0 {
                        renderer.render_ticket(TICKET_SUMMARY, ticket).unwrap().into_string()
                    } else {
                        renderer
                            .render_print_ready(PRINT_READY_RECEIPT, fields)
                            .unwrap()
                            .into_string()
                    }
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let want = if i % 2 == 0 { WANT_TICKET_SUMMARY } else { WANT_PRINT_READY };
            assert_eq!(handle.join().unwrap(), want);
        }
    });
}
