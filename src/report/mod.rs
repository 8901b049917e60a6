pub mod analysis;
pub mod html;
pub mod pdf;
pub mod text;

pub use analysis::{IsolateAnalysis, ResultPaths};
pub use html::HtmlTemplate;
pub use pdf::{compose_pdf_report, PdfRequest, WeasyprintRenderer};
pub use text::{compose_text_report, write_text_report};
