//! Invoice and packing slip documents.
//!
//! An order is first laid out as positioned text runs and rules
//! (`PageLayout`), then rendered to PDF by the `pdf` module.

mod pdf;
mod words;

pub use pdf::{render_pdf, PdfError};
pub use words::amount_in_words;

use crate::config::BusinessConfig;
use crate::db::{Invoice, OrderDetail};
use crate::utils::{display_date, format_rupees};

const MM_PER_INCH: f32 = 25.4;

/// US letter, in millimetres
pub const LETTER: (f32, f32) = (8.5 * MM_PER_INCH, 11.0 * MM_PER_INCH);
/// 3x2 inch label, in millimetres
pub const PACKING_SLIP: (f32, f32) = (3.0 * MM_PER_INCH, 2.0 * MM_PER_INCH);

const SLIP_MAX_PRODUCTS: usize = 5;
const SLIP_MAX_ACCESSORIES: usize = 3;
const SLIP_NAME_CHARS: usize = 20;
const SLIP_ACCESSORY_CHARS: usize = 15;

fn inch(value: f32) -> f32 {
    value * MM_PER_INCH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// One drawing instruction; coordinates in mm from the bottom-left corner
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        weight: Weight,
        align: Align,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Vec<Element>>,
}

impl PageLayout {
    fn new(title: impl Into<String>, (width, height): (f32, f32)) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            pages: vec![Vec::new()],
        }
    }

    /// Every text run in drawing order
    pub fn texts(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flatten()
            .filter_map(|element| match element {
                Element::Text { text, .. } => Some(text.as_str()),
                Element::Rule { .. } => None,
            })
            .collect()
    }

    fn current(&mut self) -> &mut Vec<Element> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, weight: Weight, align: Align) {
        let text = text.into();
        self.current().push(Element::Text {
            text,
            x,
            y,
            size,
            weight,
            align,
        });
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32) {
        self.current().push(Element::Rule { x1, x2, y });
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
    }
}

/// Vertical cursor over a letter page that starts a new page near the bottom
struct Cursor {
    y: f32,
    top: f32,
    bottom: f32,
}

impl Cursor {
    fn down(&mut self, layout: &mut PageLayout, step: f32) {
        self.y -= step;
        if self.y < self.bottom {
            layout.new_page();
            self.y = self.top;
        }
    }
}

/// Lay out a one-page (or longer) letter invoice for an order
pub fn invoice_layout(detail: &OrderDetail, invoice: &Invoice, business: &BusinessConfig) -> PageLayout {
    let mut layout = PageLayout::new(format!("Invoice {}", invoice.invoice_number), LETTER);
    let center = LETTER.0 / 2.0;
    let (left, right, amount_x) = (inch(0.5), inch(8.0), inch(7.5));

    // Header
    layout.text(&business.name, center, inch(10.2), 18.0, Weight::Bold, Align::Center);
    let mut y = inch(10.0);
    layout.text(&business.contact, center, y, 9.0, Weight::Regular, Align::Center);
    for line in &business.address {
        y -= inch(0.15);
        layout.text(line, center, y, 9.0, Weight::Regular, Align::Center);
    }
    if let Some(gstin) = &business.gstin {
        y -= inch(0.15);
        layout.text(format!("GSTIN: {}", gstin), center, y, 9.0, Weight::Bold, Align::Center);
    }

    layout.text(
        format!("Invoice: {}", invoice.invoice_number),
        left,
        inch(9.2),
        12.0,
        Weight::Bold,
        Align::Left,
    );
    layout.text(
        format!("Date: {}", invoice.date_display()),
        right,
        inch(9.2),
        12.0,
        Weight::Bold,
        Align::Right,
    );

    // Customer and order blocks
    let customer = &detail.customer;
    layout.text("Customer Details:", left, inch(8.9), 10.0, Weight::Bold, Align::Left);
    layout.text(format!("Name: {}", customer.name), left, inch(8.7), 10.0, Weight::Regular, Align::Left);
    layout.text(format!("Phone: {}", customer.phone), left, inch(8.55), 10.0, Weight::Regular, Align::Left);
    if let Some(alt) = &customer.secondary_phone {
        layout.text(format!("Alt Phone: {}", alt), left, inch(8.4), 10.0, Weight::Regular, Align::Left);
    }

    let order = &detail.order;
    let block = inch(4.5);
    layout.text("Order Details:", block, inch(8.9), 10.0, Weight::Bold, Align::Left);
    layout.text(
        format!("Order ID: #{}", order.transaction_id),
        block,
        inch(8.7),
        10.0,
        Weight::Regular,
        Align::Left,
    );
    layout.text(
        format!("Delivery: {}", display_date(&order.delivery_date)),
        block,
        inch(8.55),
        10.0,
        Weight::Regular,
        Align::Left,
    );
    layout.text(
        format!("Return: {}", display_date(&order.return_date)),
        block,
        inch(8.4),
        10.0,
        Weight::Regular,
        Align::Left,
    );

    // Items by product code only
    let mut cursor = Cursor {
        y: inch(8.0),
        top: inch(10.2),
        bottom: inch(1.0),
    };
    layout.text("Sr.", left, cursor.y, 10.0, Weight::Bold, Align::Left);
    layout.text("Product Code", inch(1.2), cursor.y, 10.0, Weight::Bold, Align::Left);
    layout.text("Amount", amount_x, cursor.y, 10.0, Weight::Bold, Align::Right);
    layout.rule(left, right, cursor.y - inch(0.1));
    cursor.down(&mut layout, inch(0.3));

    for (index, item) in detail.items.iter().enumerate() {
        layout.text((index + 1).to_string(), left, cursor.y, 10.0, Weight::Regular, Align::Left);
        layout.text(&item.product_code, inch(1.2), cursor.y, 10.0, Weight::Regular, Align::Left);
        layout.text(format_rupees(item.price), amount_x, cursor.y, 10.0, Weight::Regular, Align::Right);
        cursor.down(&mut layout, inch(0.25));
    }

    if !detail.extra_charges.is_empty() {
        cursor.down(&mut layout, inch(0.1));
        layout.text("Extra Charges:", left, cursor.y, 10.0, Weight::Bold, Align::Left);
        cursor.down(&mut layout, inch(0.25));
        for extra in &detail.extra_charges {
            layout.text(&extra.description, inch(1.0), cursor.y, 10.0, Weight::Regular, Align::Left);
            layout.text(format_rupees(extra.amount), amount_x, cursor.y, 10.0, Weight::Regular, Align::Right);
            cursor.down(&mut layout, inch(0.25));
        }
    }

    if !detail.accessories.is_empty() {
        cursor.down(&mut layout, inch(0.1));
        layout.text("Accessories:", left, cursor.y, 10.0, Weight::Bold, Align::Left);
        cursor.down(&mut layout, inch(0.25));
        for accessory in &detail.accessories {
            layout.text(&accessory.accessory_name, inch(1.0), cursor.y, 10.0, Weight::Regular, Align::Left);
            if let Some(remarks) = &accessory.remarks {
                layout.text(format!("({})", remarks), inch(4.0), cursor.y, 10.0, Weight::Regular, Align::Left);
            }
            cursor.down(&mut layout, inch(0.25));
        }
    }

    // Total
    cursor.down(&mut layout, inch(0.2));
    layout.rule(left, right, cursor.y);
    cursor.down(&mut layout, inch(0.3));
    layout.text("TOTAL AMOUNT:", inch(5.0), cursor.y, 12.0, Weight::Bold, Align::Left);
    layout.text(format_rupees(order.total_amount), amount_x, cursor.y, 12.0, Weight::Bold, Align::Right);
    cursor.down(&mut layout, inch(0.3));
    layout.text(
        format!("({})", amount_in_words(order.total_amount)),
        left,
        cursor.y,
        9.0,
        Weight::Regular,
        Align::Left,
    );

    let last = layout.pages.len() - 1;
    layout.pages[last].push(Element::Text {
        text: business.footer.clone(),
        x: center,
        y: inch(0.5),
        size: 8.0,
        weight: Weight::Regular,
        align: Align::Center,
    });

    layout
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// What fits on a packing label: bill number, short customer name, dates,
/// the first few product codes and accessories
#[derive(Debug, Clone, PartialEq)]
pub struct SlipContent {
    pub bill: String,
    pub customer: String,
    pub delivery: String,
    pub return_date: String,
    pub products: Vec<String>,
    pub accessories: Vec<String>,
}

impl SlipContent {
    pub fn from_detail(detail: &OrderDetail) -> Self {
        Self {
            bill: detail
                .invoice
                .as_ref()
                .map(|i| i.invoice_number.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            customer: truncate_chars(&detail.customer.name, SLIP_NAME_CHARS),
            delivery: display_date(&detail.order.delivery_date),
            return_date: display_date(&detail.order.return_date),
            products: detail
                .items
                .iter()
                .take(SLIP_MAX_PRODUCTS)
                .map(|item| item.product_code.clone())
                .collect(),
            accessories: detail
                .accessories
                .iter()
                .take(SLIP_MAX_ACCESSORIES)
                .map(|a| truncate_chars(&a.accessory_name, SLIP_ACCESSORY_CHARS))
                .collect(),
        }
    }
}

/// Lay out the 3x2 inch packing label stuck on the garment bag
pub fn packing_slip_layout(detail: &OrderDetail, business: &BusinessConfig) -> PageLayout {
    let slip = SlipContent::from_detail(detail);
    let mut layout = PageLayout::new(
        format!("Packing slip {}", detail.order.transaction_id),
        PACKING_SLIP,
    );
    let left = inch(0.1);

    layout.text(&business.name, PACKING_SLIP.0 / 2.0, inch(1.85), 8.0, Weight::Bold, Align::Center);

    let mut y = inch(1.7);
    for (line, step) in [
        (format!("Bill: {}", slip.bill), 0.15),
        (format!("Customer: {}", slip.customer), 0.15),
        (format!("Delivery: {}", slip.delivery), 0.12),
        (format!("Return: {}", slip.return_date), 0.15),
    ] {
        layout.text(line, left, y, 6.0, Weight::Regular, Align::Left);
        y -= inch(step);
    }

    layout.text("Products:", left, y, 6.0, Weight::Bold, Align::Left);
    y -= inch(0.12);
    for code in &slip.products {
        layout.text(format!("- {}", code), left, y, 5.0, Weight::Regular, Align::Left);
        y -= inch(0.1);
    }

    if !slip.accessories.is_empty() {
        y -= inch(0.05);
        layout.text("Accessories:", left, y, 5.0, Weight::Bold, Align::Left);
        y -= inch(0.1);
        for name in &slip.accessories {
            layout.text(format!("- {}", name), left, y, 5.0, Weight::Regular, Align::Left);
            y -= inch(0.1);
        }
    }

    layout
}

/// Download name of an invoice PDF
pub fn invoice_file_name(invoice: &Invoice) -> String {
    format!("Invoice_{}.pdf", invoice.invoice_number)
}

/// Download name of a packing slip PDF
pub fn packing_slip_file_name(detail: &OrderDetail) -> String {
    format!("PackingSlip_{}.pdf", detail.order.transaction_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Customer, Order, OrderAccessory, OrderExtraCharge, OrderItemDetail};

    fn item(code: &str, price: f64) -> OrderItemDetail {
        OrderItemDetail {
            id: format!("item-{}", code),
            product_id: format!("product-{}", code),
            product_code: code.to_string(),
            product_name: format!("Garment {}", code),
            price,
            image_path: None,
        }
    }

    fn accessory(name: &str, remarks: Option<&str>) -> OrderAccessory {
        OrderAccessory {
            id: format!("acc-{}", name),
            order_id: "order-1".to_string(),
            accessory_name: name.to_string(),
            remarks: remarks.map(str::to_string),
        }
    }

    fn detail(items: Vec<OrderItemDetail>) -> OrderDetail {
        OrderDetail {
            order: Order {
                id: "order-1".to_string(),
                transaction_id: "3F9A1C0B".to_string(),
                customer_id: "cust-1".to_string(),
                staff_id: "staff-1".to_string(),
                delivery_date: "2025-05-01".to_string(),
                return_date: "2025-05-03".to_string(),
                status: "pending".to_string(),
                total_amount: 4300.0,
                notes: None,
                created_at: "2025-04-28T10:00:00+00:00".to_string(),
                updated_at: "2025-04-28T10:00:00+00:00".to_string(),
            },
            customer: Customer {
                id: "cust-1".to_string(),
                name: "Meera Shah of Ranjitsagar Road".to_string(),
                phone: "9876543210".to_string(),
                secondary_phone: Some("9000000000".to_string()),
                email: None,
                address: None,
                created_at: "2025-04-28T10:00:00+00:00".to_string(),
            },
            staff_name: "Riya".to_string(),
            staff_role: "staff".to_string(),
            items,
            accessories: vec![
                accessory("Dupatta with golden border", Some("red")),
                accessory("Safa", None),
                accessory("Mojari", None),
                accessory("Kalgi", None),
            ],
            extra_charges: vec![OrderExtraCharge {
                id: "extra-1".to_string(),
                order_id: "order-1".to_string(),
                description: "Alteration".to_string(),
                amount: 300.0,
                remarks: None,
            }],
            invoice: Some(invoice()),
        }
    }

    fn invoice() -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            invoice_number: "INV-00007".to_string(),
            order_id: "order-1".to_string(),
            generated_at: "2025-04-28T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_invoice_layout_lists_order_lines() {
        let business = BusinessConfig::default();
        let layout = invoice_layout(
            &detail(vec![item("LH-01", 1500.0), item("SH-01", 2500.0)]),
            &invoice(),
            &business,
        );
        let texts = layout.texts();

        assert_eq!(layout.pages.len(), 1);
        assert_eq!(texts[0], "NERAA RENTAL HOUSE");
        for expected in [
            "Invoice: INV-00007",
            "Date: 28-04-2025",
            "Name: Meera Shah of Ranjitsagar Road",
            "Alt Phone: 9000000000",
            "Order ID: #3F9A1C0B",
            "Delivery: 01-05-2025",
            "Return: 03-05-2025",
            "LH-01",
            "Rs. 2,500.00",
            "Alteration",
            "(red)",
            "Rs. 4,300.00",
            "(Four Thousand Three Hundred Rupees Only)",
            "Thank you for choosing NERAA RENTAL HOUSE!",
        ] {
            assert!(texts.contains(&expected), "missing {:?}", expected);
        }
        assert!(!texts.iter().any(|t| t.starts_with("GSTIN")));
    }

    #[test]
    fn test_long_invoices_continue_on_new_pages() {
        let items = (1..=40).map(|i| item(&format!("LH-{:02}", i), 100.0)).collect();
        let layout = invoice_layout(&detail(items), &invoice(), &BusinessConfig::default());

        assert!(layout.pages.len() > 1);
        for page in &layout.pages {
            for element in page {
                if let Element::Text { y, .. } = element {
                    assert!(*y > 0.0 && *y < LETTER.1);
                }
            }
        }
    }

    #[test]
    fn test_packing_slip_truncates_and_limits() {
        let items = (1..=7).map(|i| item(&format!("LH-{:02}", i), 100.0)).collect();
        let layout = packing_slip_layout(&detail(items), &BusinessConfig::default());
        let texts = layout.texts();

        assert!(texts.contains(&"Bill: INV-00007"));
        assert!(texts.contains(&"Customer: Meera Shah of Ranjit"));
        assert_eq!(texts.iter().filter(|t| t.starts_with("- LH-")).count(), 5);
        assert!(texts.contains(&"- Dupatta with go"));
        assert!(!texts.contains(&"- Kalgi"));
        assert_eq!(layout.width, PACKING_SLIP.0);
    }

    #[test]
    fn test_file_names() {
        let detail = detail(vec![item("LH-01", 1500.0)]);
        assert_eq!(invoice_file_name(&invoice()), "Invoice_INV-00007.pdf");
        assert_eq!(packing_slip_file_name(&detail), "PackingSlip_3F9A1C0B.pdf");
    }
}
