use axum::response::Html;

use crate::model::Book;
use crate::session::SessionIndicator;

pub(crate) fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub(crate) fn layout(title: &str, indicator: &SessionIndicator, body: &str) -> Html<String> {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "  <title>{} | Videlina</title>\n",
        escape(title)
    ));
    html.push_str("</head>\n<body>\n<header>\n  <nav>\n");
    for (href, label) in [
        ("/", "Home"),
        ("/library", "Library"),
        ("/upload", "Upload"),
        ("/about", "About"),
        ("/contact", "Contact"),
    ] {
        html.push_str(&format!("    <a href=\"{href}\">{label}</a>\n"));
    }
    html.push_str("  </nav>\n");
    html.push_str(&session_widget(indicator));
    html.push_str("</header>\n<main>\n");
    html.push_str(body);
    html.push_str("\n</main>\n</body>\n</html>\n");
    Html(html)
}

fn session_widget(indicator: &SessionIndicator) -> String {
    match indicator {
        SessionIndicator::Loading => {
            "  <div class=\"session\"><span class=\"spinner\">Loading...</span></div>\n".to_owned()
        }
        SessionIndicator::SignedIn { .. } => format!(
            "  <div class=\"session\"><span>{}</span>\
             <form method=\"post\" action=\"/auth/sign-out\"><button>Sign Out</button></form></div>\n",
            escape(&indicator.to_string())
        ),
        SessionIndicator::SignedOut => {
            "  <div class=\"session\"><a href=\"/auth\">Sign In</a></div>\n".to_owned()
        }
    }
}

pub(crate) fn notice(kind: &str, message: &str) -> String {
    format!(
        "<p class=\"notice {kind}\" role=\"status\">{}</p>\n",
        escape(message)
    )
}

pub(crate) fn book_card(book: &Book) -> String {
    let mut card = String::new();
    card.push_str(&format!(
        "<article class=\"book\" data-id=\"{}\">\n",
        escape(&book.id)
    ));
    if let Some(cover) = &book.cover_url {
        card.push_str(&format!(
            "  <img src=\"{}\" alt=\"{}\">\n",
            escape(cover),
            escape(&book.title)
        ));
    }
    card.push_str(&format!("  <h3>{}</h3>\n", escape(&book.title)));
    card.push_str(&format!(
        "  <p class=\"meta\">{} &middot; {} &middot; {}</p>\n",
        escape(&book.author),
        escape(&book.category),
        book.year
    ));
    if !book.description.is_empty() {
        card.push_str(&format!("  <p>{}</p>\n", escape(&book.description)));
    }
    if let Some(pdf) = &book.pdf_url {
        card.push_str(&format!("  <a href=\"{}\">Read</a>\n", escape(pdf)));
    }
    card.push_str("</article>\n");
    card
}

pub(crate) fn options<'a>(values: impl IntoIterator<Item = &'a str>, selected: &str) -> String {
    let mut html = String::new();
    for value in values {
        let mark = if value == selected { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{0}\"{mark}>{0}</option>",
            escape(value)
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_and_quotes() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn options_mark_the_selected_value() {
        let html = options(["All", "Kabbalah"], "Kabbalah");
        assert_eq!(
            html,
            "<option value=\"All\">All</option><option value=\"Kabbalah\" selected>Kabbalah</option>"
        );
    }

    #[test]
    fn session_widget_follows_indicator() {
        let signed_in = SessionIndicator::SignedIn {
            name: "reader".to_owned(),
        };
        assert!(session_widget(&signed_in).contains("Welcome, reader"));
        assert!(session_widget(&SessionIndicator::SignedOut).contains("Sign In"));
    }
}
