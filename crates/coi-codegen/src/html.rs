//! HTML page template.
//!
//! The host toolchain wraps the compiled module in this page; `{{script}}`
//! marks where it injects the loader. Title, description and language come
//! from the program's `app { }` block.

use coi_parser::ast::AppConfig;

/// Generate the page template for an app.
pub fn generate_template(app: &AppConfig) -> String {
    let lang = if app.lang.is_empty() { "en" } else { &app.lang };
    let title = if app.title.is_empty() {
        "Coi App"
    } else {
        &app.title
    };

    let mut out = String::from("<!DOCTYPE html>\n");
    out.push_str(&format!("<html lang=\"{}\">\n", escape_attr(lang)));
    out.push_str("<head>\n");
    out.push_str("    <meta charset=\"utf-8\">\n");
    out.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0, viewport-fit=cover\">\n",
    );
    out.push_str(&format!("    <title>{}</title>\n", escape_text(title)));
    if !app.description.is_empty() {
        out.push_str(&format!(
            "    <meta name=\"description\" content=\"{}\">\n",
            escape_attr(&app.description)
        ));
    }
    out.push_str("    <link rel=\"stylesheet\" href=\"app.css\">\n");
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str("{{script}}\n");
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
