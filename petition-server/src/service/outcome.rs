//! Workflow step results and their HTTP representation

use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError};
use color_eyre::Report;
use thiserror::Error;
use tracing::{error, warn};

use crate::model;
use crate::view::{self, ErrorCode, View};

/// Pages the workflow redirects to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Petition,
    Thanks,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Petition => "/petition",
            Self::Thanks => "/thanks",
        }
    }
}

/// Successful workflow step
#[derive(Debug)]
pub enum Outcome {
    /// Continue on another page
    Redirect(Route),
    /// Show the page
    Render(View),
}

impl Responder for Outcome {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse {
        match self {
            Self::Redirect(route) => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, route.path()))
                .finish(),
            Self::Render(view) => HttpResponse::Ok()
                .content_type(ContentType::html())
                .body(view.render(None)),
        }
    }
}

/// Failed workflow step
///
/// No failure changes the session - session is only updated after a step succeeds.
#[derive(Debug, Error)]
pub enum Failure {
    /// Submission refused, the form is presented again with the error
    #[error("Submission rejected: {}", code.code())]
    Rejected { view: View, code: ErrorCode },
    /// One of the collaborators failed
    #[error("Request cannot be completed: {0}")]
    Unavailable(Report),
}

impl Failure {
    pub fn rejected(view: View, code: ErrorCode) -> Self {
        warn!(code = code.code(), "Submission rejected");
        Self::Rejected { view, code }
    }

    /// Classifies storage failure - data refused by storage is a rejection, anything else means
    /// the storage is unavailable.
    pub fn storage(err: Report, view: View, code: ErrorCode) -> Self {
        if model::is_rejection(&err) {
            warn!(error = %err, "Storage refused the data");
            Self::rejected(view, code)
        } else {
            Self::Unavailable(err)
        }
    }
}

impl From<Report> for Failure {
    fn from(err: Report) -> Self {
        Self::Unavailable(err)
    }
}

impl ResponseError for Failure {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected {
                code: ErrorCode::InvalidCredentials,
                ..
            } => StatusCode::UNAUTHORIZED,
            Self::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Rejected { view, code } => view.render(Some(*code)),
            Self::Unavailable(err) => {
                error!(error = ?err, "Request failed");
                view::failure()
            }
        };

        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(body)
    }
}
