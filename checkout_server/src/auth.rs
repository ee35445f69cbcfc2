//! Customer identity extraction.
//!
//! The server sits behind an authenticating reverse proxy, which attaches the caller's identity as
//! `X-Shop-User-*` headers. This module turns those headers into a [`CustomerProfile`]; requests without a
//! valid identity are refused with a 401 before any handler runs.

use std::str::FromStr;

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use checkout_engine::db_types::{CustomerProfile, Owner, OwnerKind};
use futures::future::{ready, Ready};
use shop_common::parse_boolean_flag;

use crate::errors::ServerError;

pub const USER_KIND_HEADER: &str = "x-shop-user-type";
pub const ADMIN_HEADER: &str = "x-shop-admin";
pub const USER_ID_HEADER: &str = "x-shop-user-id";
pub const USER_NAME_HEADER: &str = "x-shop-user-name";
pub const USER_EMAIL_HEADER: &str = "x-shop-user-email";

/// The identity of the customer making the request, as asserted by the upstream auth proxy.
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer(pub CustomerProfile);

impl AuthenticatedCustomer {
    pub fn profile(&self) -> &CustomerProfile {
        &self.0
    }

    pub fn owner(&self) -> &Owner {
        &self.0.owner
    }
}

impl FromRequest for AuthenticatedCustomer {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(customer_from_headers(req.headers()))
    }
}

/// An authenticated caller with the proxy's storefront-admin assertion. Routes under `/admin` extract this
/// instead of [`AuthenticatedCustomer`].
#[derive(Debug, Clone)]
pub struct AdminUser(pub CustomerProfile);

impl FromRequest for AdminUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(admin_from_headers(req.headers()))
    }
}

fn admin_from_headers(headers: &HeaderMap) -> Result<AdminUser, ServerError> {
    let customer = customer_from_headers(headers)?;
    let is_admin = parse_boolean_flag(optional_header(headers, ADMIN_HEADER), false);
    if !is_admin {
        return Err(ServerError::Forbidden);
    }
    Ok(AdminUser(customer.0))
}

fn customer_from_headers(headers: &HeaderMap) -> Result<AuthenticatedCustomer, ServerError> {
    let kind = required_header(headers, USER_KIND_HEADER)?;
    let kind = OwnerKind::from_str(&kind).map_err(|_| ServerError::Unauthenticated)?;
    let id = required_header(headers, USER_ID_HEADER)?;
    // the proxy only forwards name and email when the profile service has them on file
    let name = optional_header(headers, USER_NAME_HEADER).unwrap_or_default();
    let email = optional_header(headers, USER_EMAIL_HEADER).unwrap_or_default();
    let profile = CustomerProfile { owner: Owner { kind, id }, name, email };
    Ok(AuthenticatedCustomer(profile))
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, ServerError> {
    optional_header(headers, name).filter(|v| !v.is_empty()).ok_or(ServerError::Unauthenticated)
}

fn optional_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|v| v.trim().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn a_full_identity_is_extracted() {
        let req = TestRequest::default()
            .insert_header((USER_KIND_HEADER, "user"))
            .insert_header((USER_ID_HEADER, "alice"))
            .insert_header((USER_NAME_HEADER, "Alice A"))
            .insert_header((USER_EMAIL_HEADER, "alice@example.com"))
            .to_http_request();
        let customer = customer_from_headers(req.headers()).unwrap();
        assert_eq!(customer.owner(), &Owner::user("alice"));
        assert_eq!(customer.profile().name, "Alice A");
        assert_eq!(customer.profile().email, "alice@example.com");
    }

    #[test]
    fn name_and_email_are_optional() {
        let req = TestRequest::default()
            .insert_header((USER_KIND_HEADER, "Employer"))
            .insert_header((USER_ID_HEADER, "acme"))
            .to_http_request();
        let customer = customer_from_headers(req.headers()).unwrap();
        assert_eq!(customer.owner(), &Owner::employer("acme"));
        assert!(customer.profile().email.is_empty());
    }

    #[test]
    fn admin_needs_the_proxy_assertion() {
        let req = TestRequest::default()
            .insert_header((USER_KIND_HEADER, "user"))
            .insert_header((USER_ID_HEADER, "alice"))
            .to_http_request();
        assert!(matches!(admin_from_headers(req.headers()).unwrap_err(), ServerError::Forbidden));

        let req = TestRequest::default()
            .insert_header((USER_KIND_HEADER, "user"))
            .insert_header((USER_ID_HEADER, "alice"))
            .insert_header((ADMIN_HEADER, "true"))
            .to_http_request();
        let admin = admin_from_headers(req.headers()).unwrap();
        assert_eq!(admin.0.owner, Owner::user("alice"));
    }

    #[test]
    fn missing_or_garbage_identity_is_refused() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(customer_from_headers(req.headers()).unwrap_err(), ServerError::Unauthenticated));

        let req = TestRequest::default()
            .insert_header((USER_KIND_HEADER, "wizard"))
            .insert_header((USER_ID_HEADER, "alice"))
            .to_http_request();
        assert!(matches!(customer_from_headers(req.headers()).unwrap_err(), ServerError::Unauthenticated));

        let req = TestRequest::default().insert_header((USER_KIND_HEADER, "user")).to_http_request();
        assert!(matches!(customer_from_headers(req.headers()).unwrap_err(), ServerError::Unauthenticated));
    }
}
