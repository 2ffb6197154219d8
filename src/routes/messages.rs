use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Conversation, Id, NewMessage, UserMessage};
use crate::routes::AppState;

/// Strip reply prefixes so "Re: Re: Order #5" threads with "Order #5".
pub fn normalize_subject(subject: &str) -> String {
    let mut s = subject.trim();
    // get() keeps multi-byte subjects from landing mid-character
    while s.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
        s = s[3..].trim_start();
    }
    s.trim().to_string()
}

/// A message is visible to a viewer unless deleted for everyone, or deleted
/// on the user side and the viewer is that user.
fn visible_to(msg: &UserMessage, is_admin: bool) -> bool {
    if msg.deleted_for_everyone {
        return false;
    }
    is_admin || !msg.deleted_for_user
}

/// Whether the viewer is the recipient of an unread message.
fn unread_for(msg: &UserMessage, is_admin: bool) -> bool {
    !msg.seen && (msg.from_admin != is_admin)
}

#[utoipa::path(
    post,
    path = "/api/v1/messages",
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message sent", body = UserMessage),
        (status = 400, description = "Admin sender without a target user")
    )
)]
pub async fn send_message(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewMessage>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let from_admin = auth.is_admin();
    // admins pick the thread's user; users always write on their own thread
    let user_id = if from_admin {
        payload.user_id.ok_or(ApiError::BadRequest)?
    } else {
        auth.user_id()?
    };
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_message(&auth.user_id()?.to_string()) {
            return Ok(HttpResponse::TooManyRequests()
                .json(serde_json::json!({"error": "rate limited"})));
        }
    }
    if from_admin {
        // sending to an unknown user is a 404, not a silent orphan thread
        data.repo.get_user(user_id).await?;
    }
    let msg = data
        .repo
        .create_message(user_id, from_admin, &payload.subject, &payload.body)
        .await?;
    Ok(HttpResponse::Created().json(msg))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/conversations",
    responses((status = 200, description = "Threads grouped by user and normalized subject", body = [Conversation]))
)]
pub async fn list_conversations(
    auth: Auth,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let is_admin = auth.is_admin();
    let scope = if is_admin { None } else { Some(auth.user_id()?) };
    let messages = data.repo.list_messages(scope).await?;

    // group by (user, normalized subject), preserving first-seen order
    let mut order: Vec<(Id, String)> = Vec::new();
    let mut threads: HashMap<(Id, String), Vec<UserMessage>> = HashMap::new();
    for msg in messages {
        if !visible_to(&msg, is_admin) {
            continue;
        }
        let key = (msg.user_id, normalize_subject(&msg.subject));
        if !threads.contains_key(&key) {
            order.push(key.clone());
        }
        threads.entry(key).or_default().push(msg);
    }

    let mut conversations: Vec<Conversation> = order
        .into_iter()
        .filter_map(|key| {
            let msgs = threads.remove(&key)?;
            let unread_count = msgs.iter().filter(|m| unread_for(m, is_admin)).count();
            let last_message = msgs.last().cloned()?;
            Some(Conversation {
                user_id: key.0,
                subject: key.1,
                message_count: msgs.len(),
                unread_count,
                last_message,
            })
        })
        .collect();
    conversations.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    Ok(HttpResponse::Ok().json(conversations))
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct ThreadQuery {
    pub subject: String,
    /// Which user's thread; admins only, others always see their own.
    pub user_id: Option<Id>,
}

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    params(ThreadQuery),
    responses((status = 200, description = "One thread, oldest first", body = [UserMessage]))
)]
pub async fn get_thread(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<ThreadQuery>,
) -> Result<HttpResponse, ApiError> {
    let is_admin = auth.is_admin();
    let user_id = if is_admin {
        query.user_id.ok_or(ApiError::BadRequest)?
    } else {
        auth.user_id()?
    };
    let wanted = normalize_subject(&query.subject);
    let thread: Vec<UserMessage> = data
        .repo
        .list_messages(Some(user_id))
        .await?
        .into_iter()
        .filter(|m| visible_to(m, is_admin) && normalize_subject(&m.subject) == wanted)
        .collect();
    Ok(HttpResponse::Ok().json(thread))
}

pub async fn mark_seen(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let msg = data.repo.get_message(id).await?;
    let is_admin = auth.is_admin();
    if !is_admin && msg.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    // only the recipient's read state changes; senders cannot mark their
    // own messages seen on the other side
    if msg.from_admin == is_admin {
        return Err(ApiError::Forbidden);
    }
    let msg = data.repo.mark_message_seen(id).await?;
    Ok(HttpResponse::Ok().json(msg))
}

#[derive(serde::Deserialize)]
pub struct DeleteQuery {
    /// "me" (default) hides the message for the user side; "everyone"
    /// removes it from both views.
    pub scope: Option<String>,
}

pub async fn delete_message(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let msg = data.repo.get_message(id).await?;
    let is_admin = auth.is_admin();
    if !is_admin && msg.user_id != auth.user_id()? {
        return Err(ApiError::Forbidden);
    }
    let scope = query.scope.as_deref().unwrap_or("me");
    let msg = match scope {
        "everyone" => {
            // only your own messages can be unsent for both sides
            if msg.from_admin != is_admin {
                return Err(ApiError::Forbidden);
            }
            data.repo.delete_message_for_everyone(id).await?
        }
        "me" => {
            if is_admin {
                return Err(ApiError::BadRequest);
            }
            data.repo.delete_message_for_user(id).await?
        }
        _ => return Err(ApiError::BadRequest),
    };
    Ok(HttpResponse::Ok().json(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn subject_normalization_strips_stacked_prefixes() {
        assert_eq!(normalize_subject("Order #5"), "Order #5");
        assert_eq!(normalize_subject("Re: Order #5"), "Order #5");
        assert_eq!(normalize_subject("RE: re: Order #5"), "Order #5");
        assert_eq!(normalize_subject("  Re:Re:  hi  "), "hi");
    }

    #[test]
    fn multibyte_subjects_pass_through() {
        assert_eq!(normalize_subject("éé"), "éé");
        assert_eq!(normalize_subject("Re: éé"), "éé");
        assert_eq!(normalize_subject("注文 #5"), "注文 #5");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_subject("Re: RE: something");
        assert_eq!(normalize_subject(&once), once);
    }

    #[test]
    fn bare_re_collapses_to_empty() {
        assert_eq!(normalize_subject("Re:"), "");
        assert_eq!(normalize_subject("re: re:"), "");
    }

    fn msg(from_admin: bool, seen: bool, for_user: bool, for_all: bool) -> UserMessage {
        UserMessage {
            id: 1,
            user_id: 1,
            from_admin,
            subject: "s".into(),
            body: "b".into(),
            seen,
            deleted_for_user: for_user,
            deleted_for_everyone: for_all,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn deleted_for_everyone_hidden_from_both_sides() {
        let m = msg(false, false, false, true);
        assert!(!visible_to(&m, false));
        assert!(!visible_to(&m, true));
    }

    #[test]
    fn deleted_for_user_still_visible_to_admin() {
        let m = msg(false, false, true, false);
        assert!(!visible_to(&m, false));
        assert!(visible_to(&m, true));
    }

    #[test]
    fn unread_counts_only_for_recipient() {
        let from_admin = msg(true, false, false, false);
        assert!(unread_for(&from_admin, false)); // user is the recipient
        assert!(!unread_for(&from_admin, true));
        let from_user = msg(false, false, false, false);
        assert!(unread_for(&from_user, true));
        assert!(!unread_for(&from_user, false));
    }
}
