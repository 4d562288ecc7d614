pub mod availability;
pub mod bookings;
pub mod calendar;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod items;
pub mod payments;
pub mod rentals;
pub mod subscriptions;
pub mod types;

pub use availability::{Commitment, CommitmentSource, ItemAvailability};
pub use bookings::{Booking, BookingFilter, BookingUpdate, ConvertBooking, NewBooking};
pub use calendar::{CalendarDay, CalendarEntry, CalendarView, DateInput, EntryKind};
pub use customers::{Customer, CustomerUpdate, NewCustomer};
pub use dashboard::DashboardSummary;
pub use events::ScrapedEvent;
pub use items::{Item, ItemFilter, ItemUpdate, NewItem};
pub use payments::{NewPayment, Payment};
pub use rentals::{NewRental, Rental, RentalBalance, RentalFilter, RentalLine, RentalUpdate, RentalView};
pub use subscriptions::{Plan, PlanLimits, Subscription, SubscriptionStatus};
pub use types::{
    BookingId, BookingStatus, CustomerId, DateRange, ItemId, LineItem, Money, PaymentId,
    PaymentMethod, PaymentStatus, RentalId, RentalStatus, UserId,
};
