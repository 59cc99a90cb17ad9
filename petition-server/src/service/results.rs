//! Petition results, available only after signing

use actix_web::get;
use actix_web::web::Data;
use tracing::{instrument, warn};

use crate::model::Model;
use crate::model::signatures::Signature;
use crate::service::outcome::{Failure, Outcome, Route};
use crate::service::session::CurrentSession;
use crate::view::{Page, View};

/// Thanks page with the signature made in this session
#[get("/thanks")]
#[instrument(skip_all)]
async fn thanks(model: Data<Model>, session: CurrentSession) -> Result<Outcome, Failure> {
    let Some(signature_id) = session.state().signature() else {
        return Ok(Outcome::Redirect(Route::Petition));
    };

    let db = model.db();
    // Independent reads, the count may or may not include signatures made in between
    let count = Signature::count(db).await?;
    let signature = signature_id.fetch(db).await?;
    if signature.is_none() {
        warn!(%signature_id, "Session refers to a missing signature");
    }

    let page = Page::Thanks { count, signature };
    Ok(Outcome::Render(View::new(page, session.csrf())))
}

/// List of everyone who signed
#[get("/signers")]
#[instrument(skip_all)]
async fn signers(model: Data<Model>, session: CurrentSession) -> Result<Outcome, Failure> {
    if session.state().signature().is_none() {
        return Ok(Outcome::Redirect(Route::Petition));
    }

    let names = Signature::names(model.db()).await?;
    Ok(Outcome::Render(View::new(
        Page::Signers { names },
        session.csrf(),
    )))
}
