use crate::domain::customers::{Customer, CustomerUpdate, NewCustomer};
use crate::domain::rentals::{RentalFilter, RentalView};
use crate::domain::types::{CustomerId, UserId};
use crate::error::{InventoryError, Result};
use crate::services::rentals::attach_balances;
use crate::storage::Repositories;
use tracing::info;

#[derive(Clone)]
pub struct CustomerService {
    repos: Repositories,
}

impl CustomerService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create(&self, user_id: &UserId, new: NewCustomer) -> Result<Customer> {
        let customer = Customer::create(user_id.clone(), new)?;
        self.repos.customers.create_customer(&customer).await?;
        info!(user_id = %user_id, customer_id = %customer.id, "Created customer");
        Ok(customer)
    }

    pub async fn get(&self, user_id: &UserId, id: &CustomerId) -> Result<Customer> {
        self.repos
            .customers
            .get_customer(user_id, id)
            .await?
            .ok_or_else(|| InventoryError::CustomerNotFound { id: id.to_string() })
    }

    pub async fn list(&self, user_id: &UserId, search: Option<&str>) -> Result<Vec<Customer>> {
        self.repos.customers.list_customers(user_id, search).await
    }

    pub async fn update(
        &self,
        user_id: &UserId,
        id: &CustomerId,
        update: CustomerUpdate,
    ) -> Result<Customer> {
        let mut customer = self.get(user_id, id).await?;
        customer.apply(update)?;
        self.repos.customers.update_customer(&customer).await?;
        Ok(customer)
    }

    pub async fn delete(&self, user_id: &UserId, id: &CustomerId) -> Result<()> {
        self.get(user_id, id).await?;

        let rentals = self.repos.rentals.count_customer_rentals(user_id, id).await?;
        let bookings = self.repos.bookings.count_customer_bookings(user_id, id).await?;
        if rentals > 0 || bookings > 0 {
            return Err(InventoryError::Conflict {
                reason: format!(
                    "customer {id} has {rentals} rental(s) and {bookings} booking(s)"
                ),
            });
        }

        if !self.repos.customers.delete_customer(user_id, id).await? {
            return Err(InventoryError::CustomerNotFound { id: id.to_string() });
        }
        info!(user_id = %user_id, customer_id = %id, "Deleted customer");
        Ok(())
    }

    pub async fn rentals(&self, user_id: &UserId, id: &CustomerId) -> Result<Vec<RentalView>> {
        self.get(user_id, id).await?;
        let filter = RentalFilter {
            customer_id: Some(*id),
            ..Default::default()
        };
        let rentals = self.repos.rentals.list_rentals(user_id, &filter).await?;
        attach_balances(&self.repos, user_id, rentals).await
    }
}
