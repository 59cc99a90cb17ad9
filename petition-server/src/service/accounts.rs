//! Registration and login

use actix_web::web::Data;
use actix_web::{get, post};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::model::Model;
use crate::model::credentials::PasswordHash;
use crate::model::users::User;
use crate::service::outcome::{Failure, Outcome, Route};
use crate::service::session::{CsrfForm, CurrentSession};
use crate::view::{ErrorCode, Page, View};

/// Submitted registration
#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    first: String,
    #[serde(default)]
    last: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Submitted login credentials
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[get("/register")]
async fn registration(session: CurrentSession) -> Outcome {
    Outcome::Render(View::new(Page::Register, session.csrf()))
}

/// Registers a new user and logs them in
///
/// Registering does not sign the petition, so the visitor continues to the petition.
#[post("/register")]
#[instrument(skip_all)]
async fn register(
    model: Data<Model>,
    mut session: CurrentSession,
    CsrfForm(form): CsrfForm<RegistrationForm>,
) -> Result<Outcome, Failure> {
    let RegistrationForm {
        first,
        last,
        email,
        password,
    } = form;

    let view = View::new(Page::Register, session.csrf());
    if password.is_empty() {
        return Err(Failure::rejected(view, ErrorCode::RegistrationRejected));
    }

    let password = PasswordHash::create(password).await?;
    let user_id = User::new(first, last, email)
        .create(model.db(), &password)
        .await
        .map_err(|err| Failure::storage(err, view, ErrorCode::RegistrationRejected))?;

    let state = session.update(|state| state.authenticated(user_id));
    info!(%user_id, ?state, "User registered");

    Ok(Outcome::Redirect(Route::Petition))
}

#[get("/login")]
async fn login_form(session: CurrentSession) -> Outcome {
    Outcome::Render(View::new(Page::Login, session.csrf()))
}

/// Logs the user in
///
/// Returning signers go straight to the thanks page, everyone else to the petition. Unknown email
/// and wrong password are indistinguishable for the visitor.
#[post("/login")]
#[instrument(skip_all)]
async fn login(
    model: Data<Model>,
    mut session: CurrentSession,
    CsrfForm(form): CsrfForm<LoginForm>,
) -> Result<Outcome, Failure> {
    let LoginForm { email, password } = form;
    let user = User::authenticate(model.db(), model.placeholder(), &email, password).await?;
    let Some(user_id) = user else {
        info!("Login with invalid credentials");
        let view = View::new(Page::Login, session.csrf());
        return Err(Failure::rejected(view, ErrorCode::InvalidCredentials));
    };

    let state = session.update(|state| state.authenticated(user_id));
    info!(%user_id, ?state, "User logged in");

    match state.signature() {
        Some(_) => Ok(Outcome::Redirect(Route::Thanks)),
        None => Ok(Outcome::Redirect(Route::Petition)),
    }
}
