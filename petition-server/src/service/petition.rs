//! Petition signing

use actix_web::web::Data;
use actix_web::{get, post};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::model::Model;
use crate::model::signatures::Signature;
use crate::service::outcome::{Failure, Outcome, Route};
use crate::service::session::{CsrfForm, CurrentSession};
use crate::view::{ErrorCode, Page, View};

/// Submitted signature
#[derive(Debug, Deserialize)]
pub struct SignatureForm {
    #[serde(default)]
    first: String,
    #[serde(default)]
    last: String,
    #[serde(default)]
    signature: String,
}

/// Petition form, unless the petition is already signed in this session
#[get("/petition")]
async fn petition(session: CurrentSession) -> Outcome {
    match session.state().signature() {
        Some(_) => Outcome::Redirect(Route::Thanks),
        None => Outcome::Render(View::new(Page::Petition, session.csrf())),
    }
}

/// Signs the petition
#[post("/petition")]
#[instrument(skip_all)]
async fn sign(
    model: Data<Model>,
    mut session: CurrentSession,
    CsrfForm(form): CsrfForm<SignatureForm>,
) -> Result<Outcome, Failure> {
    let SignatureForm {
        first,
        last,
        signature,
    } = form;

    let signature_id = Signature::new(first, last, signature)
        .create(model.db())
        .await
        .map_err(|err| {
            let view = View::new(Page::Petition, session.csrf());
            Failure::storage(err, view, ErrorCode::SignatureRejected)
        })?;

    let state = session.update(|state| state.signed(signature_id));
    info!(%signature_id, ?state, "Petition signed");

    Ok(Outcome::Redirect(Route::Thanks))
}
