//! Reference authentication endpoints.
//!
//! The dispatch core does not mandate a login mechanism; these are
//! ordinary routes built from the pipeline's primitives, registered by
//! services that want the conventional `__auth__`/`__logout__` pair.

use std::sync::Arc;

use axum::http::Method;

use crate::auth::descriptor::Authorization;
use crate::auth::users::UserDirectory;
use crate::error::HttpError;
use crate::request::{mandatory_check, ParseMode};
use crate::routing::{Reply, ServiceRoutes};

/// Register `POST /api/__auth__` and `POST /api/__logout__` against the
/// given user directory.
pub fn register(routes: &mut ServiceRoutes, directory: Arc<dyn UserDirectory>) {
    routes.route(
        Method::POST,
        "__auth__",
        ParseMode::Json,
        None,
        "Authenticate a user and open a session.",
        move |ctx| {
            let directory = directory.clone();
            Box::pin(async move {
                mandatory_check(&ctx.data, &["username", "password"])?;
                let username = ctx.data.require_str("username")?;
                let password = ctx.data.require_str("password")?;

                let user = directory.get_user(username).await?;
                let Some(user) = user else {
                    return Err(HttpError::Unauthorized("User does not found".into()));
                };
                if !user.check_password(password) {
                    return Err(HttpError::Unauthorized("Invalid password".into()));
                }

                ctx.session.set_user(user.session_user());

                Ok(Reply::json(serde_json::json!({
                    "username": user.username,
                    "roles": user.roles,
                    "additional": user.additional_info,
                })))
            })
        },
    );

    routes.route(
        Method::POST,
        "__logout__",
        ParseMode::Json,
        Some(Authorization::any_user()),
        "Close the current session.",
        |ctx| {
            Box::pin(async move {
                // `clear_session: false` keeps the session but drops the user.
                if ctx.data.bool_or("clear_session", true) {
                    ctx.session.mark_for_removal();
                } else {
                    ctx.session.clear_user();
                }
                Ok(Reply::empty())
            })
        },
    );
}
