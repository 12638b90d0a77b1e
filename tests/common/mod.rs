#![allow(dead_code)]

use lopdf::{Document, Object, Stream, dictionary};
use rust_xlsxwriter::Workbook;

/// Builds an `.xlsx` workbook whose sheets hold the given rows as text; the
/// first row of each sheet is its header.
pub fn workbook_bytes(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("sheet name accepted");
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row_idx as u32, col_idx as u16, *value)
                    .expect("cell written");
            }
        }
    }
    workbook.save_to_buffer().expect("workbook serialized")
}

/// Builds a PDF with `pages` pages. Every page carries a `/Marker` entry
/// `<label>-p<n>` so page order can be checked after a merge. The media box
/// sits on the page tree root and is inherited by the pages.
pub fn pdf_bytes(label: &str, pages: usize) -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let mut kids = Vec::with_capacity(pages);
    for index in 1..=pages {
        let marker = format!("{label}-p{index}");
        let content = format!("BT /F1 12 Tf 72 720 Td ({marker}) Tj ET");
        let content_id = document.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Marker" => Object::string_literal(marker),
        });
        kids.push(Object::Reference(page_id));
    }

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    document.save_to(&mut output).expect("PDF serialized");
    output
}

/// Page markers of a PDF in page order.
pub fn page_markers(bytes: &[u8]) -> Vec<String> {
    let document = Document::load_mem(bytes).expect("PDF loaded");
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let page = document.get_dictionary(page_id).expect("page dictionary");
            let marker = page
                .get(b"Marker")
                .and_then(Object::as_str)
                .expect("page marker");
            String::from_utf8_lossy(marker).into_owned()
        })
        .collect()
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes)
        .expect("PDF loaded")
        .get_pages()
        .len()
}
