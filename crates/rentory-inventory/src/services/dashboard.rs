use crate::domain::bookings::BookingFilter;
use crate::domain::dashboard::DashboardSummary;
use crate::domain::rentals::RentalFilter;
use crate::domain::types::{RentalId, UserId};
use crate::error::Result;
use crate::storage::Repositories;
use chrono::NaiveDate;

#[derive(Clone)]
pub struct DashboardService {
    repos: Repositories,
}

impl DashboardService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn summary(&self, user_id: &UserId, today: NaiveDate) -> Result<DashboardSummary> {
        let items = self.repos.items.count_items(user_id).await?;
        let customers = self.repos.customers.count_customers(user_id).await?;
        let rentals = self
            .repos
            .rentals
            .list_rentals(user_id, &RentalFilter::default())
            .await?;
        let bookings = self
            .repos
            .bookings
            .list_bookings(
                user_id,
                &BookingFilter {
                    starts_from: Some(today),
                    ..Default::default()
                },
            )
            .await?;

        let ids: Vec<RentalId> = rentals.iter().map(|r| r.id).collect();
        let payments = self
            .repos
            .payments
            .list_payments_for_rentals(user_id, &ids)
            .await?;

        Ok(DashboardSummary::compute(
            today, items, customers, &rentals, &bookings, &payments,
        ))
    }
}
