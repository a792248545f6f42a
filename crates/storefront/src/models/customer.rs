//! Customer profile types.

use chrono::NaiveDate;
use serde::Serialize;

use storefront_core::{AddressId, CustomerId, Membership, UserId};

/// The store-side profile of a user account. Exactly one per user.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub membership: Membership,
}

/// A postal address belonging to a customer.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    #[serde(skip)]
    pub customer_id: CustomerId,
}
