use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::auth::{Principal, Role};
use crate::session::VisitorSession;

use super::extract::Viewer;
use super::state::App;
use super::Result;

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

/// An identity token posted either by the sign-in script as JSON or by a plain form.
#[derive(Debug)]
pub struct SignInRequest {
    token: String,
    from_form: bool,
}

#[axum::async_trait]
impl FromRequest<App> for SignInRequest {
    type Rejection = Response;

    async fn from_request(request: Request, state: &App) -> Result<Self, Self::Rejection> {
        let is_json = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<TokenBody>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;

            Ok(SignInRequest {
                token: body.token,
                from_form: false,
            })
        } else {
            let Form(body) = Form::<TokenBody>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;

            Ok(SignInRequest {
                token: body.token,
                from_form: true,
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct SignedInBody {
    email: String,
    name: String,
    photo_url: String,
    role: Role,
}

impl From<Principal> for SignedInBody {
    fn from(principal: Principal) -> Self {
        Self {
            email: principal.user.email,
            name: principal.user.name,
            photo_url: principal.user.photo_url,
            role: principal.role,
        }
    }
}

#[tracing::instrument(skip_all)]
pub async fn signin(State(app): State<App>, session: Session, request: SignInRequest) -> Result<Response> {
    let principal = app
        .authenticator
        .signin(&request.token, &app.database)
        .await?;

    VisitorSession::new(session).sign_in(&principal).await?;
    tracing::info!(email = %principal.user.email, role = ?principal.role, "signed in");

    let response = if request.from_form {
        Redirect::to("/").into_response()
    } else {
        Json(SignedInBody::from(principal)).into_response()
    };

    Ok(response)
}

pub async fn signout(viewer: Viewer) -> Result<Redirect> {
    if let Some(signed) = viewer.0 {
        signed.session.sign_out().await?;
        tracing::info!(email = %signed.principal.user.email, "signed out");
    }

    Ok(Redirect::to("/"))
}
