//! Customer route handlers.
//!
//! Staff manage every customer profile; any authenticated user manages their
//! own through `/store/customers/me`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use storefront_core::{AddressId, CustomerId, Membership, UserId};

use crate::db::CustomerRepository;
use crate::db::customers::CustomerUpdate;
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::{RequireAuth, RequireStaff};
use crate::models::{Address, Customer};
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::{ValidationErrors, check_text};

const MAX_PHONE_LENGTH: usize = 255;
const MAX_ADDRESS_FIELD_LENGTH: usize = 255;

/// Customer replace body.
#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership: Option<String>,
}

/// Address create body.
#[derive(Debug, Deserialize)]
pub struct AddressPayload {
    pub street: Option<String>,
    pub city: Option<String>,
}

/// Validate a profile update. An absent membership keeps the current tier.
fn check_customer(
    payload: CustomerPayload,
    current: Membership,
) -> std::result::Result<CustomerUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let phone = check_text(&mut errors, "phone", payload.phone, MAX_PHONE_LENGTH);
    let membership = match payload.membership {
        Some(code) => errors.check("membership", code.trim().parse::<Membership>()),
        None => Some(current),
    };

    errors.finish()?;
    match (phone, membership) {
        (Some(phone), Some(membership)) => Ok(CustomerUpdate {
            phone,
            birth_date: payload.birth_date,
            membership,
        }),
        _ => Err(ValidationErrors::new()),
    }
}

async fn own_customer(state: &AppState, user_id: UserId) -> Result<Customer> {
    CustomerRepository::new(state.pool())
        .get_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `GET /store/customers`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<Vec<Customer>>> {
    Ok(Json(CustomerRepository::new(state.pool()).list().await?))
}

/// `GET /store/customers/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<CustomerId>,
) -> Result<Json<Customer>> {
    CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `PUT /store/customers/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<CustomerId>,
    JsonBody(payload): JsonBody<CustomerPayload>,
) -> Result<Json<Customer>> {
    let repo = CustomerRepository::new(state.pool());
    let customer = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    let update = check_customer(payload, customer.membership)?;
    Ok(Json(repo.update(id, &update).await?))
}

/// `GET /store/customers/me`
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Customer>> {
    Ok(Json(own_customer(&state, current.id).await?))
}

/// `PUT /store/customers/me`
#[instrument(skip(state))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(payload): JsonBody<CustomerPayload>,
) -> Result<Json<Customer>> {
    let customer = own_customer(&state, current.id).await?;

    let update = check_customer(payload, customer.membership)?;
    let customer = CustomerRepository::new(state.pool())
        .update(customer.id, &update)
        .await?;
    Ok(Json(customer))
}

/// `GET /store/customers/me/addresses`
#[instrument(skip(state))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let customer = own_customer(&state, current.id).await?;
    let addresses = CustomerRepository::new(state.pool())
        .list_addresses(customer.id)
        .await?;
    Ok(Json(addresses))
}

/// `POST /store/customers/me/addresses`
#[instrument(skip(state))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(payload): JsonBody<AddressPayload>,
) -> Result<impl IntoResponse> {
    let mut errors = ValidationErrors::new();
    let street = check_text(&mut errors, "street", payload.street, MAX_ADDRESS_FIELD_LENGTH);
    let city = check_text(&mut errors, "city", payload.city, MAX_ADDRESS_FIELD_LENGTH);
    errors.finish()?;
    let (street, city) = street.zip(city).ok_or_else(ValidationErrors::new)?;

    let customer = own_customer(&state, current.id).await?;
    let address = CustomerRepository::new(state.pool())
        .create_address(customer.id, &street, &city)
        .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

/// `DELETE /store/customers/me/addresses/{id}`
#[instrument(skip(state))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    PathParams(id): PathParams<AddressId>,
) -> Result<StatusCode> {
    let customer = own_customer(&state, current.id).await?;
    CustomerRepository::new(state.pool())
        .delete_address(customer.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_kept_when_absent() {
        let update = check_customer(
            CustomerPayload {
                phone: Some("555-0100".to_owned()),
                birth_date: None,
                membership: None,
            },
            Membership::Gold,
        )
        .unwrap();
        assert_eq!(update.membership, Membership::Gold);
        assert_eq!(update.phone, "555-0100");
    }

    #[test]
    fn test_invalid_membership() {
        let errors = check_customer(
            CustomerPayload {
                phone: Some("555-0100".to_owned()),
                birth_date: None,
                membership: Some("X".to_owned()),
            },
            Membership::Bronze,
        )
        .unwrap_err();
        assert_eq!(
            errors.get("membership").unwrap(),
            ["\"X\" is not a valid choice."]
        );
    }

    #[test]
    fn test_phone_required() {
        let errors = check_customer(
            CustomerPayload {
                phone: None,
                birth_date: None,
                membership: Some("S".to_owned()),
            },
            Membership::Bronze,
        )
        .unwrap_err();
        assert!(errors.get("phone").is_some());
    }
}
