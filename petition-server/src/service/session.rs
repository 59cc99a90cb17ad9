//! Session management

use std::future::{Future, Ready, ready};
use std::pin::Pin;

use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::error::{ErrorForbidden, ErrorInternalServerError};
use actix_web::middleware::Next;
use actix_web::web::{Data, Form};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::model::session::{CsrfToken, Session, SessionKeys, SessionState};

/// Name of the cookie the session is stored in
pub const SESSION_COOKIE: &str = "petition-session";

/// Loads the visitor session from the cookie, starting a new one if there is no valid session,
/// and stores it back in the cookie whenever it changed.
pub async fn middleware<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let keys: Data<SessionKeys> = req
        .app_data()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Missing session keys"))?;

    let existing = req
        .cookie(SESSION_COOKIE)
        .and_then(|cookie| match keys.open(cookie.value()) {
            Ok(session) => Some(session),
            Err(err) => {
                debug!(error = %err, "Discarding invalid session cookie");
                None
            }
        });

    let (session, fresh) = match existing {
        Some(session) => (session, false),
        None => (keys.start().map_err(ErrorInternalServerError)?, true),
    };

    req.extensions_mut().insert(session.clone());
    let mut response = next.call(req).await?;

    let current = response.request().extensions().get::<Session>().cloned();
    let Some(current) = current else {
        return Ok(response);
    };

    if fresh || current != session {
        let token = keys.seal(&current).map_err(ErrorInternalServerError)?;
        let max_age = time::Duration::try_from(current.remaining())
            .map_err(ErrorInternalServerError)?;

        let cookie = Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .secure(keys.secure())
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .finish();

        response
            .response_mut()
            .add_cookie(&cookie)
            .map_err(ErrorInternalServerError)?;
    }

    Ok(response)
}

/// Session of the visitor making the request
///
/// Changes made through [`CurrentSession::update`] are persisted in the session cookie when the
/// response is sent.
pub struct CurrentSession {
    req: HttpRequest,
    session: Session,
}

impl CurrentSession {
    /// Current workflow state
    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Anti-forgery token of the session
    pub fn csrf(&self) -> &CsrfToken {
        &self.session.csrf
    }

    /// Transitions the session to the new state, returning it
    pub fn update(&mut self, transition: impl FnOnce(SessionState) -> SessionState) -> SessionState {
        self.session.state = transition(self.session.state);
        self.req.extensions_mut().insert(self.session.clone());
        self.session.state
    }
}

impl FromRequest for CurrentSession {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.extensions().get::<Session>().cloned();
        ready(
            session
                .map(|session| Self {
                    req: req.clone(),
                    session,
                })
                .ok_or_else(|| ErrorInternalServerError("Session middleware not installed")),
        )
    }
}

/// Form field carrying the anti-forgery token
#[derive(Debug, Deserialize)]
struct Protected<T> {
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
    #[serde(flatten)]
    form: T,
}

/// URL encoded form protected by the session anti-forgery token
///
/// Extraction fails with `403 Forbidden` when the token is missing or does not match the session,
/// so the handler never runs for a forged request.
pub struct CsrfForm<T>(pub T);

impl<T> FromRequest for CsrfForm<T>
where
    T: DeserializeOwned + 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let expected = req
            .extensions()
            .get::<Session>()
            .map(|session| session.csrf.clone());
        let form = Form::<Protected<T>>::from_request(req, payload);

        Box::pin(async move {
            let expected =
                expected.ok_or_else(|| ErrorInternalServerError("Session middleware not installed"))?;
            let Protected { csrf, form } = form.await?.into_inner();

            match csrf {
                Some(csrf) if expected.matches(&csrf) => Ok(Self(form)),
                Some(_) => {
                    warn!("Anti-forgery token mismatch");
                    Err(ErrorForbidden("Invalid anti-forgery token"))
                }
                None => {
                    warn!("Missing anti-forgery token");
                    Err(ErrorForbidden("Missing anti-forgery token"))
                }
            }
        })
    }
}
