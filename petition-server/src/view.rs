//! HTML presentation

use std::fmt::Write;

use crate::model::session::CsrfToken;
use crate::model::signatures::{Signature, SignerName};

/// Error shown along a re-rendered form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Signature submission refused by storage
    SignatureRejected,
    /// Registration refused, invalid data or email taken
    RegistrationRejected,
    /// Email and password do not match any user
    InvalidCredentials,
}

impl ErrorCode {
    /// Message presented to the visitor
    pub fn message(self) -> &'static str {
        match self {
            Self::SignatureRejected => "Please fill in your name and sign before submitting.",
            Self::RegistrationRejected => {
                "Registration failed. Check your details or try another email."
            }
            Self::InvalidCredentials => "Email or password is incorrect.",
        }
    }

    /// Stable identifier, exposed to the markup
    pub fn code(self) -> &'static str {
        match self {
            Self::SignatureRejected => "signature-rejected",
            Self::RegistrationRejected => "registration-rejected",
            Self::InvalidCredentials => "invalid-credentials",
        }
    }
}

/// Page content
#[derive(Debug, Clone)]
pub enum Page {
    Petition,
    Register,
    Login,
    Thanks {
        /// Total number of signatures
        count: i64,
        /// Signature made in the current session, if it is still stored
        signature: Option<Signature>,
    },
    Signers {
        names: Vec<SignerName>,
    },
}

/// Page ready to be rendered for a visitor
#[derive(Debug, Clone)]
pub struct View {
    page: Page,
    csrf: CsrfToken,
}

impl View {
    pub fn new(page: Page, csrf: &CsrfToken) -> Self {
        Self {
            page,
            csrf: csrf.clone(),
        }
    }

    /// Renders the page, with the error box filled if the error is given
    pub fn render(&self, error: Option<ErrorCode>) -> String {
        let mut body = String::new();
        if let Some(error) = error {
            let _ = write!(
                body,
                r#"<p class="error visible" data-error="{}">{}</p>"#,
                error.code(),
                escape(error.message())
            );
        }

        let csrf = self.csrf.as_str();
        let title = match &self.page {
            Page::Petition => {
                let _ = write!(
                    body,
                    r#"<form method="post" action="/petition">
<input type="hidden" name="_csrf" value="{csrf}">
<input name="first" placeholder="First name">
<input name="last" placeholder="Last name">
<input name="signature" placeholder="Signature">
<button>Sign</button>
</form>"#
                );
                "Sign the petition"
            }

            Page::Register => {
                let _ = write!(
                    body,
                    r#"<form method="post" action="/register">
<input type="hidden" name="_csrf" value="{csrf}">
<input name="first" placeholder="First name">
<input name="last" placeholder="Last name">
<input name="email" type="email" placeholder="Email">
<input name="password" type="password" placeholder="Password">
<button>Register</button>
</form>
<p><a href="/login">Already registered? Log in</a></p>"#
                );
                "Register"
            }

            Page::Login => {
                let _ = write!(
                    body,
                    r#"<form method="post" action="/login">
<input type="hidden" name="_csrf" value="{csrf}">
<input name="email" type="email" placeholder="Email">
<input name="password" type="password" placeholder="Password">
<button>Log in</button>
</form>
<p><a href="/register">No account yet? Register</a></p>"#
                );
                "Log in"
            }

            Page::Thanks { count, signature } => {
                if let Some(signature) = signature {
                    let _ = write!(
                        body,
                        r#"<p>Thank you, {} {}! You signed on {}.</p>{}"#,
                        escape(&signature.first),
                        escape(&signature.last),
                        signature.signed_at.format("%B %-d, %Y"),
                        signature_markup(&signature.signature),
                    );
                }
                let _ = write!(
                    body,
                    r#"<p class="count">{count} people have signed the petition.</p>
<p><a href="/signers">See who signed</a></p>"#
                );
                "Thank you"
            }

            Page::Signers { names } => {
                body.push_str("<ul class=\"signers\">");
                for name in names {
                    let _ = write!(body, "<li>{}</li>", escape(&name.to_string()));
                }
                body.push_str("</ul>");
                "Signers"
            }
        };

        layout(title, &body)
    }
}

/// Page presented when a request fails for reasons the visitor cannot fix
pub fn failure() -> String {
    layout(
        "Something went wrong",
        "<p>We could not complete your request. Please try again later.</p>",
    )
}

fn signature_markup(signature: &str) -> String {
    if signature.starts_with("data:image/") {
        format!(r#"<img class="signature" src="{}">"#, escape(signature))
    } else {
        format!(r#"<p class="signature">{}</p>"#, escape(signature))
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#
    )
}

/// Escapes text for use in HTML content and attribute values
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
