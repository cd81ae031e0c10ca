//! `GET /auth/error?error=<tag>`: the only HTML the gateway renders.

use axum::extract::Query;
use axum::response::Html;
use serde::Deserialize;

use crate::api::route_class::SIGN_IN_PATH;

const REDIRECT_DELAY_SECS: u32 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ErrorParams {
    pub error: Option<String>,
}

/// Human-readable message for an error tag.
pub fn describe(tag: Option<&str>) -> &'static str {
    match tag {
        Some("missing_code") => "The sign-in link was incomplete. Please sign in again.",
        Some("exchange_error") => {
            "This sign-in link has expired or was already used. Please sign in again."
        }
        Some("callback_error") => {
            "We could not reach the sign-in service. Please try again in a moment."
        }
        _ => "Something went wrong while signing you in.",
    }
}

pub async fn show(Query(params): Query<ErrorParams>) -> Html<String> {
    let message = describe(params.error.as_deref());
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{REDIRECT_DELAY_SECS};url={SIGN_IN_PATH}\">\n\
         <title>Sign-in problem | {app}</title>\n\
         </head>\n\
         <body>\n\
         <h1>Sign-in problem</h1>\n\
         <p>{message}</p>\n\
         <p>Redirecting to <a href=\"{SIGN_IN_PATH}\">sign in</a> in {REDIRECT_DELAY_SECS} seconds.</p>\n\
         </body>\n\
         </html>\n",
        app = crate::config::APP_NAME,
    ))
}
