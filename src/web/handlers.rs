//! Request handlers.

use super::render::{gate_page, workflow_page, ResultPane, WorkflowView};
use super::{AppState, SESSION_COOKIE};
use crate::gate::GateError;
use crate::session::{Session, SessionId};
use crate::workflow::{GenerationError, Submission, Upload};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

/// Email gate form body.
#[derive(Debug, Deserialize)]
pub(super) struct SubscribeForm {
    #[serde(default)]
    email: String,
}

/// Resolves the caller's session, issuing a cookie when a new one is started.
async fn session_for(state: &AppState, jar: CookieJar) -> (Arc<Session>, CookieJar) {
    let known = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<SessionId>().ok());
    let (session, created) = state.sessions.get_or_create(known).await;

    let jar = if created {
        let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        jar.add(cookie)
    } else {
        jar
    };
    (session, jar)
}

/// Renders the workflow stage from the session's stored inputs.
async fn render_workflow(session: &Session, result: ResultPane<'_>) -> String {
    let state = session.state().await;
    workflow_page(&WorkflowView {
        prompt: state.prompt(),
        uploaded: state.uploaded(),
        has_credential: state.credential().is_some(),
        result,
    })
}

pub(super) async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (session, jar) = session_for(&state, jar).await;
    let unlocked = session.state().await.is_unlocked();

    let html = if unlocked {
        render_workflow(&session, ResultPane::Idle).await
    } else {
        gate_page("", None)
    };
    (jar, Html(html)).into_response()
}

pub(super) async fn subscribe(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SubscribeForm>,
) -> Response {
    let (session, jar) = session_for(&state, jar).await;

    match state.gate.submit_email(&session, &form.email).await {
        // Full refresh: the next GET renders the workflow instead of the gate
        Ok(_) => (jar, Redirect::to("/")).into_response(),
        Err(e) => {
            let status = match e {
                GateError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                GateError::Registration(_) => StatusCode::BAD_GATEWAY,
            };
            let html = gate_page(&form.email, Some(&e.to_string()));
            (status, jar, Html(html)).into_response()
        }
    }
}

pub(super) async fn generate(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let (session, jar) = session_for(&state, jar).await;
    if !session.state().await.is_unlocked() {
        return (jar, Redirect::to("/")).into_response();
    }

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(message) => {
            let html = render_workflow(&session, ResultPane::Errors(vec![message])).await;
            return (StatusCode::BAD_REQUEST, jar, Html(html)).into_response();
        }
    };

    match state.workflow.generate_for_session(&session, submission).await {
        Ok(image) => {
            let html = render_workflow(&session, ResultPane::Image(&image)).await;
            (jar, Html(html)).into_response()
        }
        Err(GenerationError::Locked) => (jar, Redirect::to("/")).into_response(),
        Err(e) => {
            let status = match e {
                GenerationError::MissingInputs(_) | GenerationError::UnsupportedImage(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                GenerationError::InProgress => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            };
            let html = render_workflow(&session, ResultPane::Errors(e.messages())).await;
            (status, jar, Html(html)).into_response()
        }
    }
}

pub(super) async fn healthz() -> &'static str {
    "ok"
}

/// Collects the generate form's fields. Unknown fields are ignored.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, String> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Could not read the form: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "prompt" => {
                submission.prompt = field
                    .text()
                    .await
                    .map_err(|e| format!("Could not read the prompt: {}", e))?;
            }
            "api_key" => {
                let key = field
                    .text()
                    .await
                    .map_err(|e| format!("Could not read the API key: {}", e))?;
                submission.credential = Some(key);
            }
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Could not read the uploaded image: {}", e))?;
                submission.upload = Some(Upload {
                    data: data.to_vec(),
                    file_name: file_name.filter(|n| !n.is_empty()),
                });
            }
            _ => {}
        }
    }

    Ok(submission)
}
