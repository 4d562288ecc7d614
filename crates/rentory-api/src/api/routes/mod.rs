pub mod billing;
pub mod bookings;
pub mod calendar;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod health;
pub mod items;
pub mod rentals;
