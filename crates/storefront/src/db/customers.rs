//! Customer profile and address repository.

use chrono::NaiveDate;
use sqlx::PgPool;

use storefront_core::{AddressId, CustomerId, Membership, UserId};

use super::RepositoryError;
use crate::models::{Address, Customer};

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    user_id: i64,
    phone: String,
    birth_date: Option<NaiveDate>,
    membership: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(r: CustomerRow) -> Result<Self, Self::Error> {
        let membership = r.membership.trim().parse::<Membership>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid membership in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(r.id),
            user_id: UserId::new(r.user_id),
            phone: r.phone,
            birth_date: r.birth_date,
            membership,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i64,
    street: String,
    city: String,
    customer_id: i64,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Self {
            id: AddressId::new(r.id),
            street: r.street,
            city: r.city,
            customer_id: CustomerId::new(r.customer_id),
        }
    }
}

/// Fields a customer profile update replaces.
#[derive(Debug, Clone)]
pub struct CustomerUpdate {
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub membership: Membership,
}

/// Repository for customers and addresses.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All customers ordered by the owner's first and last name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT c.id, c.user_id, c.phone, c.birth_date, c.membership
            FROM store.customer c
            JOIN core."user" u ON u.id = c.user_id
            ORDER BY u.first_name, u.last_name, c.id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, user_id, phone, birth_date, membership FROM store.customer WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Get the customer profile of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, user_id, phone, birth_date, membership FROM store.customer WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Replace a customer's profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn update(
        &self,
        id: CustomerId,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            UPDATE store.customer SET phone = $2, birth_date = $3, membership = $4
            WHERE id = $1
            RETURNING id, user_id, phone, birth_date, membership
            ",
        )
        .bind(id)
        .bind(&update.phone)
        .bind(update.birth_date)
        .bind(update.membership.code())
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Addresses of a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            "SELECT id, street, city, customer_id FROM store.address WHERE customer_id = $1 ORDER BY id",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// Add an address to a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_address(
        &self,
        customer_id: CustomerId,
        street: &str,
        city: &str,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO store.address (customer_id, street, city)
            VALUES ($1, $2, $3)
            RETURNING id, street, city, customer_id
            ",
        )
        .bind(customer_id)
        .bind(street)
        .bind(city)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete one of a customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the customer's.
    pub async fn delete_address(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.address WHERE customer_id = $1 AND id = $2")
            .bind(customer_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
