use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::domain::{Actor, Role};
use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Caller identity, forwarded by the authentication gateway in front of the
/// service.
pub struct Identity(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(Identity)
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let id = header(headers, ACTOR_ID_HEADER)?
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthorized(format!("{} is not a valid UUID", ACTOR_ID_HEADER)))?;
    let display_name = header(headers, ACTOR_NAME_HEADER)?.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::Unauthorized(format!("{} is empty", ACTOR_NAME_HEADER)));
    }
    let role = header(headers, ACTOR_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(AppError::Unauthorized)?;

    Ok(Actor {
        id,
        display_name,
        role,
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, name: &str, role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers.insert(ACTOR_NAME_HEADER, HeaderValue::from_str(name).unwrap());
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        headers
    }

    #[test]
    fn builds_actor_from_gateway_headers() {
        let id = Uuid::new_v4();
        let actor = actor_from_headers(&headers(&id.to_string(), "Mary Njeri", "admin")).unwrap();
        assert_eq!(actor, Actor::admin(id, "Mary Njeri"));
    }

    #[test]
    fn rejects_missing_or_malformed_identity() {
        assert!(matches!(
            actor_from_headers(&HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            actor_from_headers(&headers("not-a-uuid", "Mary", "admin")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            actor_from_headers(&headers(&Uuid::new_v4().to_string(), "Mary", "owner")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            actor_from_headers(&headers(&Uuid::new_v4().to_string(), "  ", "customer")),
            Err(AppError::Unauthorized(_))
        ));
    }
}
