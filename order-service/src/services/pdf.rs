//! Order document renderer.
//!
//! Lays a persisted order out on A4 pages with printpdf's built-in Helvetica.
//! Positions are tracked in millimetres from the top of the page and flipped
//! when drawn.

use crate::models::{CompanyProfile, LineItem, Order};
use crate::services::metrics::PDF_RENDER_DURATION;
use crate::services::money::{format_currency, format_date};
use crate::services::phone::format_phone_display;
use crate::services::totals::compute_totals;
use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;
const RIGHT: f32 = PAGE_W - MARGIN;
/// Lowest baseline for body content; the page footer sits below it.
const BOTTOM: f32 = PAGE_H - 22.0;
const PT_TO_MM: f32 = 0.352_778;
const BODY_SIZE: f32 = 10.0;
const LINE_H: f32 = 5.0;

const LOGO_BOX_W: f32 = 40.0;
const LOGO_BOX_H: f32 = 20.0;
const LOGO_DPI: f32 = 300.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF backend failure: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// A rendered order document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Copy of `order` with every line total and section total derived from the
/// rows. Stored totals are never printed.
pub fn printable_order(order: &Order) -> Order {
    let mut order = order.clone();
    order.services.iter_mut().for_each(LineItem::recompute);
    order.products.iter_mut().for_each(LineItem::recompute);
    order.expenses.iter_mut().for_each(LineItem::recompute);
    order.totals = compute_totals(&order.services, &order.products, &order.expenses);
    order
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Weight {
    Regular,
    Bold,
}

/// Approximate Helvetica advance width in em units.
fn glyph_em(c: char) -> f32 {
    match c {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | 'I' => 0.278,
        'f' | 't' | 'r' | '(' | ')' | '-' | '/' => 0.333,
        'm' | 'M' | 'W' => 0.833,
        'w' => 0.722,
        c if c.is_ascii_digit() => 0.556,
        c if c.is_uppercase() => 0.667,
        _ => 0.556,
    }
}

/// Estimated rendered width of `text` in millimetres.
fn text_width(text: &str, size: f32, weight: Weight) -> f32 {
    let em: f32 = text.chars().map(glyph_em).sum();
    let factor = match weight {
        Weight::Regular => 1.0,
        Weight::Bold => 1.06,
    };
    em * size * PT_TO_MM * factor
}

/// Greedy word wrap to `max_width` millimetres. Explicit newlines are kept and
/// words wider than a line are split.
fn wrap_text(text: &str, max_width: f32, size: f32, weight: Weight) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size, weight) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut piece = String::new();
            for ch in word.chars() {
                piece.push(ch);
                if text_width(&piece, size, weight) > max_width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(ch);
                }
            }
            current = piece;
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Company name wrapped so it ends before the right-aligned `date`.
fn trade_name_lines(name: &str, x: f32, date: &str) -> Vec<String> {
    let width = RIGHT - x - text_width(date, BODY_SIZE, Weight::Regular) - 5.0;
    wrap_text(name, width, 16.0, Weight::Bold)
}

/// Largest size with the image's aspect ratio that fits the box, in mm.
fn fit_within(px_w: u32, px_h: u32, box_w: f32, box_h: f32) -> (f32, f32) {
    if px_w == 0 || px_h == 0 {
        return (0.0, 0.0);
    }
    let ratio = px_w as f32 / px_h as f32;
    if box_w / box_h > ratio {
        (box_h * ratio, box_h)
    } else {
        (box_w, box_w / ratio)
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

struct Canvas {
    doc: PdfDocumentReference,
    layers: Vec<PdfLayerReference>,
    current: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Cursor, mm from the top of the page.
    y: f32,
}

impl Canvas {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let current = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layers: vec![current.clone()],
            current,
            regular,
            bold,
            y: MARGIN,
        })
    }

    fn new_page(&mut self) {
        let name = format!("Layer {}", self.layers.len() + 1);
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), name);
        self.current = self.doc.get_page(page).get_layer(layer);
        self.layers.push(self.current.clone());
        self.y = MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y + height > BOTTOM {
            self.new_page();
        }
    }

    fn font(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }

    /// Draw one line of text with its baseline at `baseline` (mm from top).
    fn text_at(&self, text: &str, size: f32, x: f32, baseline: f32, weight: Weight, align: Align) {
        let width = text_width(text, size, weight);
        let left = match align {
            Align::Left => x,
            Align::Right => x - width,
            Align::Center => x - width / 2.0,
        };
        self.current
            .use_text(text, size, Mm(left), Mm(PAGE_H - baseline), self.font(weight));
    }

    /// Write a line at the cursor and move down.
    fn line(&mut self, text: &str, size: f32, weight: Weight) {
        self.ensure_space(LINE_H);
        self.y += LINE_H;
        self.text_at(text, size, MARGIN, self.y, weight, Align::Left);
    }

    fn labeled(&mut self, label: &str, value: &str) {
        self.ensure_space(LINE_H);
        self.y += LINE_H;
        self.text_at(label, BODY_SIZE, MARGIN, self.y, Weight::Bold, Align::Left);
        let offset = text_width(label, BODY_SIZE, Weight::Bold) + 2.0;
        self.text_at(value, BODY_SIZE, MARGIN + offset, self.y, Weight::Regular, Align::Left);
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    fn rule(&mut self) {
        self.ensure_space(3.0);
        self.y += 3.0;
        let y = PAGE_H - self.y;
        self.current.set_outline_color(rgb(0.6, 0.6, 0.6));
        self.current.set_outline_thickness(0.4);
        self.current.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(RIGHT), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Filled band from the cursor down `height` mm; the cursor is not moved.
    fn band(&self, height: f32, color: Color) {
        self.current.set_fill_color(color);
        self.current.add_rect(Rect::new(
            Mm(MARGIN),
            Mm(PAGE_H - self.y - height),
            Mm(RIGHT),
            Mm(PAGE_H - self.y),
        ));
        self.current.set_fill_color(rgb(0.0, 0.0, 0.0));
    }

    fn image(&self, image: &image_crate::DynamicImage, x: f32, top: f32, box_w: f32, box_h: f32) -> f32 {
        let (w_px, h_px) = (image.width(), image.height());
        let (w_mm, h_mm) = fit_within(w_px, h_px, box_w, box_h);
        if w_mm <= 0.0 {
            return 0.0;
        }
        let native_w = w_px as f32 / LOGO_DPI * 25.4;
        let native_h = h_px as f32 / LOGO_DPI * 25.4;

        Image::from_dynamic_image(image).add_to_layer(
            self.current.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(PAGE_H - top - h_mm)),
                scale_x: Some(w_mm / native_w),
                scale_y: Some(h_mm / native_h),
                dpi: Some(LOGO_DPI),
                ..Default::default()
            },
        );
        w_mm
    }

    fn finish(self) -> Result<(Vec<u8>, usize), RenderError> {
        let total = self.layers.len();
        for (i, layer) in self.layers.iter().enumerate() {
            let label = format!("Página {} de {}", i + 1, total);
            let width = text_width(&label, 8.0, Weight::Regular);
            layer.use_text(
                label,
                8.0,
                Mm(PAGE_W / 2.0 - width / 2.0),
                Mm(12.0),
                &self.regular,
            );
        }
        let bytes = self.doc.save_to_bytes()?;
        Ok((bytes, total))
    }
}

struct Column {
    title: &'static str,
    /// Left edge for left-aligned columns, right edge otherwise.
    x: f32,
    width: f32,
    align: Align,
}

fn draw_table(canvas: &mut Canvas, heading: &str, columns: &[Column], rows: &[Vec<String>]) {
    canvas.ensure_space(LINE_H * 3.0);
    canvas.gap(2.0);
    canvas.line(heading, 11.0, Weight::Bold);
    canvas.gap(1.5);

    canvas.band(LINE_H + 1.0, rgb(0.9, 0.9, 0.9));
    let header_baseline = canvas.y + LINE_H - 0.8;
    for column in columns {
        canvas.text_at(column.title, 9.0, column.x, header_baseline, Weight::Bold, column.align);
    }
    canvas.gap(LINE_H + 1.0);

    for row in rows {
        let cells: Vec<Vec<String>> = columns
            .iter()
            .zip(row)
            .map(|(column, cell)| match column.align {
                Align::Left => wrap_text(cell, column.width, 9.0, Weight::Regular),
                _ => vec![cell.clone()],
            })
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(1) as f32 * 4.5 + 1.0;
        canvas.ensure_space(height);

        for (column, lines) in columns.iter().zip(&cells) {
            for (i, line) in lines.iter().enumerate() {
                let baseline = canvas.y + 4.5 * (i as f32 + 1.0);
                canvas.text_at(line, 9.0, column.x, baseline, Weight::Regular, column.align);
            }
        }
        canvas.gap(height);
    }
}

fn subtotal(canvas: &mut Canvas, label: &str, value: rust_decimal::Decimal) {
    canvas.ensure_space(LINE_H);
    canvas.gap(LINE_H);
    let text = format!("{label}: {}", format_currency(value));
    canvas.text_at(&text, BODY_SIZE, RIGHT, canvas.y, Weight::Bold, Align::Right);
    canvas.gap(1.5);
}

/// Builds order documents.
#[derive(Clone)]
pub struct DocumentRenderer {
    http: reqwest::Client,
    logo_timeout: Duration,
    signatory: Option<String>,
}

impl DocumentRenderer {
    pub fn new(logo_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            logo_timeout,
            signatory: None,
        }
    }

    /// Name printed under the company signature line.
    pub fn with_signatory(mut self, signatory: impl Into<String>) -> Self {
        let signatory = signatory.into();
        self.signatory = (!signatory.trim().is_empty()).then_some(signatory);
        self
    }

    /// Fetch the company logo (if any) and render.
    pub async fn render(
        &self,
        order: &Order,
        company: Option<&CompanyProfile>,
    ) -> Result<RenderedDocument, RenderError> {
        let logo = match company.and_then(|c| c.logo_url.as_deref()) {
            Some(url) if !url.trim().is_empty() => self.fetch_logo(url).await,
            _ => None,
        };
        self.render_with_logo(order, company, logo.as_deref())
    }

    /// Download logo bytes. Any failure yields `None`.
    async fn fetch_logo(&self, url: &str) -> Option<Vec<u8>> {
        let request = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            response.bytes().await
        };
        match tokio::time::timeout(self.logo_timeout, request).await {
            Ok(Ok(bytes)) => Some(bytes.to_vec()),
            Ok(Err(e)) => {
                warn!(url, error = %e, "Logo download failed; rendering without logo");
                None
            }
            Err(_) => {
                warn!(url, "Logo download timed out; rendering without logo");
                None
            }
        }
    }

    /// Render with already-loaded logo bytes. Undecodable bytes are ignored.
    #[instrument(skip_all, fields(order_id = %order.id, number = %order.number))]
    pub fn render_with_logo(
        &self,
        order: &Order,
        company: Option<&CompanyProfile>,
        logo: Option<&[u8]>,
    ) -> Result<RenderedDocument, RenderError> {
        let started = Instant::now();
        let order = &printable_order(order);

        let logo = logo.and_then(|bytes| match image_crate::load_from_memory(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "Logo could not be decoded; rendering without logo");
                None
            }
        });

        let title = format!("OS {}", order.number);
        let mut canvas = Canvas::new(&title)?;

        self.header(&mut canvas, order, company, logo.as_ref());
        banner(&mut canvas, order);
        client_block(&mut canvas, order);
        equipment_block(&mut canvas, order);
        item_tables(&mut canvas, order);
        grand_total(&mut canvas, order);
        terms(&mut canvas, order);
        self.signatures(&mut canvas, company);

        let (bytes, pages) = canvas.finish()?;
        PDF_RENDER_DURATION.observe(started.elapsed().as_secs_f64());
        debug!(pages, size = bytes.len(), "Order document rendered");

        Ok(RenderedDocument {
            file_name: order.document_file_name(),
            bytes,
            pages,
        })
    }

    fn header(
        &self,
        canvas: &mut Canvas,
        order: &Order,
        company: Option<&CompanyProfile>,
        logo: Option<&image_crate::DynamicImage>,
    ) {
        let top = canvas.y;
        let logo_w = logo
            .map(|image| canvas.image(image, MARGIN, top, LOGO_BOX_W, LOGO_BOX_H))
            .unwrap_or(0.0);
        let x = if logo_w > 0.0 { MARGIN + logo_w + 5.0 } else { MARGIN };

        let date = format!("Data: {}", format_date(&order.date));
        canvas.text_at(&date, BODY_SIZE, RIGHT, top + 6.0, Weight::Regular, Align::Right);

        let mut baseline = top + 6.0;
        if let Some(company) = company {
            for (i, line) in trade_name_lines(&company.trade_name, x, &date).iter().enumerate() {
                if i > 0 {
                    baseline += 6.5;
                }
                canvas.text_at(line, 16.0, x, baseline, Weight::Bold, Align::Left);
            }
            let details = [
                company.tax_id.as_deref().map(|v| format!("CNPJ: {v}")),
                company.address.clone(),
                company.phone.as_deref().map(|v| format!("Tel: {}", format_phone_display(v))),
            ];
            for detail in details.into_iter().flatten().filter(|d| !d.trim().is_empty()) {
                baseline += 4.5;
                canvas.text_at(&detail, 9.0, x, baseline, Weight::Regular, Align::Left);
            }
        }

        let logo_bottom = if logo_w > 0.0 { top + LOGO_BOX_H } else { top };
        canvas.y = baseline.max(logo_bottom) + 2.0;
        canvas.rule();
    }

    fn signatures(&self, canvas: &mut Canvas, company: Option<&CompanyProfile>) {
        canvas.ensure_space(30.0);
        canvas.gap(22.0);

        let half = (CONTENT_W - 10.0) / 2.0;
        let y = PAGE_H - canvas.y;
        canvas.current.set_outline_color(rgb(0.0, 0.0, 0.0));
        canvas.current.set_outline_thickness(0.3);
        for left in [MARGIN, MARGIN + half + 10.0] {
            canvas.current.add_line(Line {
                points: vec![
                    (Point::new(Mm(left), Mm(y)), false),
                    (Point::new(Mm(left + half), Mm(y)), false),
                ],
                is_closed: false,
            });
        }

        let company_name = self
            .signatory
            .clone()
            .or_else(|| company.map(|c| c.trade_name.clone()).filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| "Responsável técnico".to_string());
        let baseline = canvas.y + 5.0;
        canvas.text_at(&company_name, 9.0, MARGIN + half / 2.0, baseline, Weight::Regular, Align::Center);
        canvas.text_at(
            "Assinatura do cliente",
            9.0,
            MARGIN + half + 10.0 + half / 2.0,
            baseline,
            Weight::Regular,
            Align::Center,
        );
        canvas.y = baseline;
    }
}

fn banner(canvas: &mut Canvas, order: &Order) {
    canvas.gap(4.0);
    canvas.ensure_space(12.0);
    canvas.band(11.0, rgb(0.85, 0.92, 1.0));
    let text = format!("ORDEM DE SERVIÇO Nº {}", order.number);
    canvas.text_at(&text, 14.0, PAGE_W / 2.0, canvas.y + 7.5, Weight::Bold, Align::Center);
    canvas.gap(11.0);
    canvas.ensure_space(LINE_H);
    canvas.gap(LINE_H);
    let status = format!("Status: {}", order.status.label());
    canvas.text_at(&status, 9.0, RIGHT, canvas.y, Weight::Regular, Align::Right);
}

fn client_block(canvas: &mut Canvas, order: &Order) {
    canvas.gap(2.0);
    canvas.line("CLIENTE", 11.0, Weight::Bold);
    match &order.client {
        Some(client) => {
            canvas.labeled("Nome:", &client.name);
            canvas.labeled("Telefone:", &format_phone_display(&client.phone));
            if let Some(email) = client.email.as_deref().filter(|e| !e.is_empty()) {
                canvas.labeled("Email:", email);
            }
        }
        None => canvas.labeled("Nome:", "-"),
    }
}

fn equipment_block(canvas: &mut Canvas, order: &Order) {
    let Some(equipment) = &order.equipment else {
        return;
    };
    canvas.gap(3.0);
    canvas.line("EQUIPAMENTO", 11.0, Weight::Bold);
    canvas.labeled("Tipo:", &equipment.kind);
    let optional = [
        ("Marca:", &equipment.brand),
        ("Modelo:", &equipment.model),
        ("Nº de série:", &equipment.serial_number),
    ];
    for (label, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            canvas.labeled(label, value);
        }
    }
}

fn item_tables(canvas: &mut Canvas, order: &Order) {
    if !order.services.is_empty() {
        let columns = [
            Column { title: "Serviço", x: MARGIN, width: 105.0, align: Align::Left },
            Column { title: "Valor Unit.", x: 155.0, width: 30.0, align: Align::Right },
            Column { title: "Total", x: RIGHT, width: 30.0, align: Align::Right },
        ];
        let rows: Vec<Vec<String>> = order
            .services
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    format_currency(s.unit_value),
                    format_currency(s.total_value),
                ]
            })
            .collect();
        draw_table(canvas, "SERVIÇOS", &columns, &rows);
        subtotal(canvas, "Subtotal Serviços", order.totals.total_services);
    }

    if !order.products.is_empty() {
        let columns = [
            Column { title: "Produto", x: MARGIN, width: 85.0, align: Align::Left },
            Column { title: "Qtd", x: 122.0, width: 12.0, align: Align::Right },
            Column { title: "Valor Unit.", x: 155.0, width: 30.0, align: Align::Right },
            Column { title: "Total", x: RIGHT, width: 30.0, align: Align::Right },
        ];
        let rows: Vec<Vec<String>> = order
            .products
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.quantity.to_string(),
                    format_currency(p.unit_value),
                    format_currency(p.total_value),
                ]
            })
            .collect();
        draw_table(canvas, "PRODUTOS", &columns, &rows);
        subtotal(canvas, "Subtotal Produtos", order.totals.total_products);
    }

    if !order.expenses.is_empty() {
        let columns = [
            Column { title: "Descrição", x: MARGIN, width: 130.0, align: Align::Left },
            Column { title: "Valor", x: RIGHT, width: 30.0, align: Align::Right },
        ];
        let rows: Vec<Vec<String>> = order
            .expenses
            .iter()
            .map(|e| vec![e.description.clone(), format_currency(e.value)])
            .collect();
        draw_table(canvas, "DESPESAS", &columns, &rows);
        subtotal(canvas, "Subtotal Despesas", order.totals.total_expenses);
    }
}

fn grand_total(canvas: &mut Canvas, order: &Order) {
    canvas.gap(3.0);
    canvas.ensure_space(10.0);
    canvas.band(9.0, rgb(0.93, 0.93, 0.93));
    let text = format!("TOTAL GERAL: {}", format_currency(order.totals.grand_total));
    canvas.text_at(&text, 12.0, RIGHT - 2.0, canvas.y + 6.3, Weight::Bold, Align::Right);
    canvas.gap(9.0);
}

fn terms(canvas: &mut Canvas, order: &Order) {
    canvas.gap(3.0);
    if !order.payment_method.trim().is_empty() {
        canvas.labeled("Forma de pagamento:", &order.payment_method);
    }
    if let Some(warranty) = order.warranty.as_deref().filter(|w| !w.trim().is_empty()) {
        canvas.labeled("Garantia:", warranty);
    }
    if let Some(notes) = order.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        canvas.gap(2.0);
        canvas.line("Observações:", BODY_SIZE, Weight::Bold);
        for line in wrap_text(notes, CONTENT_W, BODY_SIZE, Weight::Regular) {
            canvas.line(&line, BODY_SIZE, Weight::Regular);
        }
    }
}
