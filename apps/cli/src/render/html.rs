//! Markdown + CSS → standalone HTML page.
//!
//! Markdown conversion uses pulldown-cmark with smart punctuation, so quotes
//! and dashes come out typographic the way a printed résumé expects.

use pulldown_cmark::{html, Options, Parser};

use crate::document::Document;
use crate::layout::line_height::apply_line_height;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Renders the document with `line_height` substituted into its stylesheet.
    ///
    /// The title was checked when the `Document` was built, so this cannot fail.
    pub fn render_at(&self, doc: &Document, line_height: f64) -> String {
        let css = apply_line_height(&doc.css, line_height);
        wrap_page(&doc.title, &css, &markdown_to_html(&doc.markdown))
    }
}

pub(crate) fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

fn wrap_page(title: &str, css: &str, body: &str) -> String {
    format!(
        "<html lang='en'><head><meta charset='UTF-8'><title>{title} - Resume</title>\
         <style>{css}</style></head><body><div id='resume'>{body}</div></body></html>",
        title = html_escape(title),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
