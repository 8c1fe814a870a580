//! Built-in layouts

/// Structured ticket listing bound against [`StructuredTicket`](shared::StructuredTicket)
pub const TICKET_SUMMARY: &str = r#"
Terminal    : {{.Terminal}}
Cashier     : {{.LoginUser}}
Date        : {{FormatDate .Date "02/01/2006"}} {{.Time}}
Bill        : {{FormatDate .PaymentDate "02/01/2006"}} {{.PaymentTime}}
[Cover: {{.TagPax}}]

#Ticket Orders#
{{range .LineItems}}Name: {{.Name}} {{FormatDecimal .Quantity 2}} {{FormatDecimal .Price 2}}
{{end}}

#Ticket.Discounts#
{{range .Discounts}}Discount: {{.Name}} | Amount: {{FormatDecimal .Amount 2}}
{{end}}

#Ticket.Services#
{{range .Services}}Service: {{.Name}} | Amount: {{FormatDecimal .Amount 2}}
{{end}}

#Ticket.Taxes#
{{range .Taxes}}Tax: {{.Name}} | Amount: {{FormatDecimal .Amount 2}}
{{end}}

#Ticket.Payments#
{{range .Payments}}Tendered: {{.Name}} | Amount: {{FormatDecimal .Tendered 2}}
Change: {{FormatDecimal .Change 2}}
RefNo: {{.PaymentInformation.RefNo}}
{{end}}
"#;

/// Receipt skeleton bound against [`PrintReadyFields`](shared::PrintReadyFields)
///
/// The `<C10>`, `<F>-`, `<J00>` markers are printer-side layout directives and
/// pass through untouched.
pub const PRINT_READY_RECEIPT: &str = r#"
<C10>CURRY VILLAGE
<C10>BANANA LEAF P/L
<C>8 LIM TECK KIM ROAD
<C>TEL : 6226 2562
<F>-
<C10>Receipt No: {{.TicketNo}}
<J00>Date: |{{.Date}} {{.Time}}
{{.Entities}}
<F>-
<J00> Qty Items|Price  Amount
{{.Orders}}
<F>=
<EB>
{{.Discounts}}
<J10>Total:|{{.TicketTotal}}
{{.PaymentDetails}}
<DB>
<F>=
<C10>THANK YOU
"#;
