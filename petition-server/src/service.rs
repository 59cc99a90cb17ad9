//! Utilities for services building

use actix_web::http::header;
use actix_web::web::{self, Data, FormConfig, ServiceConfig};
use actix_web::{get, middleware};


mod accounts;
mod outcome;
mod petition;
mod results;
mod session;

use crate::model::Model;
use crate::model::session::SessionKeys;
use outcome::{Outcome, Route};

/// Submitted signatures are image data URLs, way bigger than the default form limit
const FORM_LIMIT: usize = 1024 * 1024;

/// Entry point redirecting to the petition
#[get("/")]
async fn index() -> Outcome {
    Outcome::Redirect(Route::Petition)
}

/// Returns configuration function for the ActixWeb services
pub fn configure(model: Model, keys: SessionKeys) -> impl Fn(&mut ServiceConfig) + Clone {
    let keys = Data::new(keys);
    let model = Data::new(model);

    move |cfg: &mut ServiceConfig| {
        let workflow = web::scope("")
            .wrap(middleware::from_fn(session::middleware))
            .wrap(middleware::DefaultHeaders::new().add((header::X_FRAME_OPTIONS, "deny")))
            .service(index)
            .service(petition::petition)
            .service(petition::sign)
            .service(results::thanks)
            .service(results::signers)
            .service(accounts::registration)
            .service(accounts::register)
            .service(accounts::login_form)
            .service(accounts::login);

        cfg.app_data(model.clone())
            .app_data(keys.clone())
            .app_data(FormConfig::default().limit(FORM_LIMIT))
            .service(workflow);
    }
}
