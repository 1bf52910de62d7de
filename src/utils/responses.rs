//! Responses served by the local redirect listener

use actix_web::{http::header, http::StatusCode, HttpResponse};

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Page shown in the browser once the redirect was consumed
    #[must_use]
    pub fn login_complete() -> HttpResponse {
        Self::page(
            StatusCode::OK,
            "Signed in",
            "You are signed in. You can close this window and return to the terminal.",
        )
    }

    /// Page shown when the redirect did not carry a usable token pair
    #[must_use]
    pub fn login_failed(message: &str) -> HttpResponse {
        Self::page(StatusCode::BAD_REQUEST, "Sign-in failed", message)
    }

    #[must_use]
    pub fn not_found() -> HttpResponse {
        Self::page(StatusCode::NOT_FOUND, "Not found", "Nothing to see here.")
    }

    fn page(status: StatusCode, title: &str, message: &str) -> HttpResponse {
        let body = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{}</p></body></html>",
            escape_html(message)
        );
        HttpResponse::build(status)
            .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
            .body(body)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_page_status() {
        let response = ResponseBuilder::login_failed("Failed to retrieve authentication tokens.");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(ResponseBuilder::login_complete().status(), StatusCode::OK);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }
}
