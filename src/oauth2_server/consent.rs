// ABOUTME: HTML consent page for PIN-gated authorization
// ABOUTME: Embeds the flow parameters as escaped hidden fields and an optional inline error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Momentum MCP Server Authors

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::models::AuthorizeRequest;

/// Consent page template, embedded at compile time
const CONSENT_TEMPLATE: &str = include_str!("../../templates/consent.html");

/// Render the consent page for `request`
///
/// Every interpolated value is HTML-escaped. Placeholders are substituted in a
/// single pass so values containing `{{...}}` are never expanded.
#[must_use]
pub fn render_consent_page(
    client_name: &str,
    request: &AuthorizeRequest,
    error: Option<&str>,
) -> String {
    let error_html = error.map_or_else(String::new, |message| {
        format!(r#"<p class="error">{}</p>"#, encode_text(message))
    });

    fill_template(CONSENT_TEMPLATE, |key| {
        let value = match key {
            "CLIENT_NAME" => return Some(encode_text(client_name).into_owned()),
            "ERROR" => return Some(error_html.clone()),
            "CLIENT_ID" => &request.client_id,
            "REDIRECT_URI" => &request.redirect_uri,
            "RESPONSE_TYPE" => &request.response_type,
            "STATE" => &request.state,
            "CODE_CHALLENGE" => &request.code_challenge,
            "CODE_CHALLENGE_METHOD" => &request.code_challenge_method,
            _ => return None,
        };
        Some(encode_double_quoted_attribute(value).into_owned())
    })
}

fn fill_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match lookup(key) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
