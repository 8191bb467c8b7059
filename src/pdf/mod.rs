//! PDF inspection built on lopdf

pub mod info;

pub use info::{
    extract_pdf_info, format_pdf_date, DocumentMetadata, PageDimensions, PdfInfoReport,
};
