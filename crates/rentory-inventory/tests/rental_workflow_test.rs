use chrono::NaiveDate;
use chrono_tz::Tz;
use rentory_inventory::domain::{
    BookingStatus, ConvertBooking, Customer, DateInput, DateRange, Item, LineItem, NewBooking,
    NewCustomer, NewItem, NewPayment, NewRental, PaymentMethod, PaymentStatus, RentalFilter,
    RentalStatus, RentalUpdate, UserId,
};
use rentory_inventory::services::{InventorySettings, Services};
use rentory_inventory::storage::Repositories;
use rentory_inventory::InventoryError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct TestContext {
    services: Services,
    user: UserId,
    tz: Tz,
}

impl TestContext {
    fn new() -> Self {
        Self::with_settings(InventorySettings::default())
    }

    fn with_settings(settings: InventorySettings) -> Self {
        Self {
            services: Services::new(Repositories::in_memory(), settings),
            user: UserId::new("owner-1"),
            tz: chrono_tz::UTC,
        }
    }

    async fn item(&self, name: &str, quantity: i32, rate: Decimal) -> Item {
        self.services
            .items
            .create(
                &self.user,
                NewItem {
                    name: name.to_string(),
                    description: None,
                    category: Some("party".to_string()),
                    quantity,
                    daily_rate: rate,
                    image_url: None,
                },
            )
            .await
            .expect("Failed to create item")
    }

    async fn customer(&self, name: &str) -> Customer {
        self.services
            .customers
            .create(
                &self.user,
                NewCustomer {
                    name: name.to_string(),
                    email: None,
                    phone: None,
                    address: None,
                    notes: None,
                },
            )
            .await
            .expect("Failed to create customer")
    }

    fn rental_request(
        &self,
        customer: &Customer,
        start: &str,
        end: &str,
        items: Vec<LineItem>,
    ) -> NewRental {
        NewRental {
            customer_id: customer.id,
            start_date: DateInput::Date(day(start)),
            end_date: DateInput::Date(day(end)),
            items,
            total_price: None,
            advance_payment: None,
            notes: None,
        }
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn line(item: &Item, quantity: i32) -> LineItem {
    LineItem {
        item_id: item.id,
        quantity,
    }
}

#[tokio::test]
async fn test_rental_is_quoted_and_balanced() {
    let ctx = TestContext::new();
    let tent = ctx.item("Tent", 2, dec!(50)).await;
    let customer = ctx.customer("Grace Hopper").await;

    let mut request = ctx.rental_request(&customer, "2024-06-01", "2024-06-03", vec![line(&tent, 1)]);
    request.advance_payment = Some(dec!(50));

    let view = ctx
        .services
        .rentals
        .create(&ctx.user, request, ctx.tz)
        .await
        .expect("Failed to create rental");

    assert_eq!(view.rental.total_price.to_string(), "150.00", "1 tent x 50 x 3 days");
    assert_eq!(view.rental.status, RentalStatus::Reserved);
    assert_eq!(view.balance.remaining.to_string(), "100.00");
    assert_eq!(view.balance.status, PaymentStatus::Partial);

    let payment = ctx
        .services
        .rentals
        .record_payment(
            &ctx.user,
            &view.rental.id,
            NewPayment {
                amount: dec!(100),
                method: PaymentMethod::BankTransfer,
                paid_at: None,
                note: None,
            },
        )
        .await
        .expect("Failed to record payment");
    assert_eq!(payment.amount.to_string(), "100.00");

    let balance = ctx
        .services
        .rentals
        .balance(&ctx.user, &view.rental.id)
        .await
        .unwrap();
    assert!(balance.remaining.is_zero(), "Rental should be fully paid");
    assert_eq!(balance.status, PaymentStatus::Paid);

    let overpay = ctx
        .services
        .rentals
        .record_payment(
            &ctx.user,
            &view.rental.id,
            NewPayment {
                amount: dec!(0.01),
                method: PaymentMethod::Cash,
                paid_at: None,
                note: None,
            },
        )
        .await;
    assert!(
        matches!(overpay, Err(InventoryError::Overpayment { .. })),
        "Paying beyond the balance must fail"
    );
}

#[tokio::test]
async fn test_overlapping_rentals_respect_stock() {
    let ctx = TestContext::new();
    let chairs = ctx.item("Chair", 10, dec!(2)).await;
    let customer = ctx.customer("Alan Turing").await;

    ctx.services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-07-01", "2024-07-05", vec![line(&chairs, 6)]),
            ctx.tz,
        )
        .await
        .expect("First rental fits");

    // Shares 2024-07-05 with the first rental
    let clash = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-07-05", "2024-07-06", vec![line(&chairs, 5)]),
            ctx.tz,
        )
        .await;
    match clash {
        Err(InventoryError::Unavailable {
            requested,
            available,
            ..
        }) => {
            assert_eq!(requested, 5);
            assert_eq!(available, 4);
        }
        other => panic!("Expected Unavailable, got {other:?}"),
    }

    ctx.services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-07-06", "2024-07-08", vec![line(&chairs, 10)]),
            ctx.tz,
        )
        .await
        .expect("Rental after the first one ends may use the full stock");
}

#[tokio::test]
async fn test_cancelled_rental_releases_stock() {
    let ctx = TestContext::new();
    let speaker = ctx.item("Speaker", 1, dec!(40)).await;
    let customer = ctx.customer("Edsger Dijkstra").await;

    let first = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-08-10", "2024-08-10", vec![line(&speaker, 1)]),
            ctx.tz,
        )
        .await
        .unwrap();

    ctx.services
        .rentals
        .set_status(&ctx.user, &first.rental.id, RentalStatus::Cancelled)
        .await
        .unwrap();

    ctx.services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-08-10", "2024-08-10", vec![line(&speaker, 1)]),
            ctx.tz,
        )
        .await
        .expect("Cancelled rental no longer holds the speaker");
}

#[tokio::test]
async fn test_update_excludes_itself_and_requotes() {
    let ctx = TestContext::new();
    let tables = ctx.item("Table", 4, dec!(10)).await;
    let customer = ctx.customer("Barbara Liskov").await;

    let view = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-09-01", "2024-09-02", vec![line(&tables, 4)]),
            ctx.tz,
        )
        .await
        .unwrap();

    let updated = ctx
        .services
        .rentals
        .update(
            &ctx.user,
            &view.rental.id,
            RentalUpdate {
                end_date: Some(DateInput::Date(day("2024-09-04"))),
                ..Default::default()
            },
            ctx.tz,
        )
        .await
        .expect("Extending a rental must not conflict with itself");

    assert_eq!(updated.rental.period.days(), 4);
    assert_eq!(updated.rental.total_price.to_string(), "160.00");
}

#[tokio::test]
async fn test_booking_converts_into_rental() {
    let ctx = TestContext::new();
    let arch = ctx.item("Flower arch", 1, dec!(120)).await;
    let customer = ctx.customer("Katherine Johnson").await;

    let booking = ctx
        .services
        .bookings
        .create(
            &ctx.user,
            NewBooking {
                customer_id: customer.id,
                start_date: DateInput::Date(day("2024-10-12")),
                end_date: DateInput::Date(day("2024-10-13")),
                items: vec![line(&arch, 1)],
                notes: Some("Garden wedding".to_string()),
            },
            ctx.tz,
        )
        .await
        .unwrap();

    // The booking already holds the only arch
    let blocked = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-10-13", "2024-10-13", vec![line(&arch, 1)]),
            ctx.tz,
        )
        .await;
    assert!(matches!(blocked, Err(InventoryError::Unavailable { .. })));

    ctx.services.bookings.confirm(&ctx.user, &booking.id).await.unwrap();
    let rental = ctx
        .services
        .bookings
        .convert(&ctx.user, &booking.id, ConvertBooking::default())
        .await
        .expect("Converting must not conflict with the booking itself");

    assert_eq!(rental.rental.booking_id, Some(booking.id));
    assert_eq!(rental.rental.total_price.to_string(), "240.00");

    let converted = ctx.services.bookings.get(&ctx.user, &booking.id).await.unwrap();
    assert_eq!(converted.status, BookingStatus::Converted);
    assert_eq!(converted.rental_id, Some(rental.rental.id));

    let again = ctx
        .services
        .bookings
        .convert(&ctx.user, &booking.id, ConvertBooking::default())
        .await;
    assert!(matches!(again, Err(InventoryError::InvalidStateTransition { .. })));
}

#[tokio::test]
async fn test_delete_guards_and_cascade() {
    let ctx = TestContext::new();
    let lamp = ctx.item("Lamp", 3, dec!(8)).await;
    let customer = ctx.customer("Frances Allen").await;

    let view = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-11-01", "2024-11-01", vec![line(&lamp, 1)]),
            ctx.tz,
        )
        .await
        .unwrap();
    ctx.services
        .rentals
        .record_payment(
            &ctx.user,
            &view.rental.id,
            NewPayment {
                amount: dec!(4),
                method: PaymentMethod::Cash,
                paid_at: None,
                note: None,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        ctx.services.items.delete(&ctx.user, &lamp.id).await,
        Err(InventoryError::Conflict { .. })
    ));
    assert!(matches!(
        ctx.services.customers.delete(&ctx.user, &customer.id).await,
        Err(InventoryError::Conflict { .. })
    ));

    ctx.services.rentals.delete(&ctx.user, &view.rental.id).await.unwrap();
    assert!(ctx
        .services
        .rentals
        .list(&ctx.user, &RentalFilter::default())
        .await
        .unwrap()
        .is_empty());

    ctx.services.items.delete(&ctx.user, &lamp.id).await.unwrap();
    ctx.services.customers.delete(&ctx.user, &customer.id).await.unwrap();
}

#[tokio::test]
async fn test_free_plan_item_limit() {
    let ctx = TestContext::with_settings(InventorySettings {
        free_item_limit: 2,
        ..Default::default()
    });
    ctx.item("One", 1, dec!(1)).await;
    ctx.item("Two", 1, dec!(1)).await;

    let third = ctx
        .services
        .items
        .create(
            &ctx.user,
            NewItem {
                name: "Three".to_string(),
                description: None,
                category: None,
                quantity: 1,
                daily_rate: dec!(1),
                image_url: None,
            },
        )
        .await;
    assert!(matches!(
        third,
        Err(InventoryError::PlanLimitExceeded { limit: 2, .. })
    ));

    ctx.services
        .subscriptions
        .complete_checkout(&ctx.user, "cus_test", Some("sub_test".to_string()))
        .await
        .unwrap();
    ctx.item("Three", 1, dec!(1)).await;
}

#[tokio::test]
async fn test_timestamp_inputs_follow_request_timezone() {
    let ctx = TestContext::new();
    let bike = ctx.item("Bike", 1, dec!(15)).await;
    let customer = ctx.customer("Hedy Lamarr").await;

    let late_evening: DateInput =
        serde_json::from_str("\"2024-02-10T23:30:00-05:00\"").unwrap();
    let mut request = ctx.rental_request(&customer, "2024-02-10", "2024-02-10", vec![line(&bike, 1)]);
    request.start_date = late_evening;
    request.end_date = late_evening;

    let new_york: Tz = "America/New_York".parse().unwrap();
    let view = ctx
        .services
        .rentals
        .create(&ctx.user, request.clone(), new_york)
        .await
        .unwrap();
    assert_eq!(view.rental.period, DateRange::single(day("2024-02-10")));

    let utc = ctx
        .services
        .rentals
        .create(&ctx.user, request, chrono_tz::UTC)
        .await
        .unwrap();
    assert_eq!(utc.rental.period, DateRange::single(day("2024-02-11")));
}

#[tokio::test]
async fn test_period_length_is_capped() {
    let ctx = TestContext::with_settings(InventorySettings {
        max_period_days: 30,
        ..Default::default()
    });
    let bike = ctx.item("Bike", 1, dec!(15)).await;
    let customer = ctx.customer("Radia Perlman").await;

    let result = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-01-01", "2024-02-15", vec![line(&bike, 1)]),
            ctx.tz,
        )
        .await;
    assert!(matches!(result, Err(InventoryError::Validation { .. })));
}

#[tokio::test]
async fn test_duplicate_lines_cannot_overflow_quantity() {
    let ctx = TestContext::new();
    let speaker = ctx.item("Speaker", 2, dec!(20)).await;
    let customer = ctx.customer("Frances Allen").await;

    let mut request = ctx.rental_request(
        &customer,
        "2024-09-01",
        "2024-09-02",
        vec![line(&speaker, i32::MAX), line(&speaker, 2)],
    );
    request.total_price = Some(dec!(0));
    let result = ctx.services.rentals.create(&ctx.user, request, ctx.tz).await;
    assert!(
        matches!(result, Err(InventoryError::Validation { ref field, .. }) if field == "quantity"),
        "unexpected result: {result:?}"
    );

    // A single oversized line is a stock conflict, not a stored rental
    let result = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-09-01", "2024-09-02", vec![line(&speaker, i32::MAX)]),
            ctx.tz,
        )
        .await;
    assert!(matches!(result, Err(InventoryError::Unavailable { .. })));

    // Nothing was committed, so both units are still free
    for _ in 0..2 {
        ctx.services
            .rentals
            .create(
                &ctx.user,
                ctx.rental_request(&customer, "2024-09-01", "2024-09-02", vec![line(&speaker, 1)]),
                ctx.tz,
            )
            .await
            .expect("Stock should be untouched by rejected requests");
    }
}

#[tokio::test]
async fn test_amounts_beyond_storage_are_validation_errors() {
    let ctx = TestContext::new();
    let customer = ctx.customer("Barbara Liskov").await;

    let huge_rate = ctx
        .services
        .items
        .create(
            &ctx.user,
            NewItem {
                name: "Yacht".to_string(),
                description: None,
                category: None,
                quantity: 3,
                daily_rate: Decimal::MAX / dec!(2),
                image_url: None,
            },
        )
        .await;
    assert!(matches!(huge_rate, Err(InventoryError::Validation { .. })));

    // Each rate is storable, the quote for the period is not
    let crane = ctx.item("Crane", 3, dec!(5000000000)).await;
    let result = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-10-01", "2024-10-01", vec![line(&crane, 3)]),
            ctx.tz,
        )
        .await;
    assert!(
        matches!(result, Err(InventoryError::Validation { ref field, .. }) if field == "total_price"),
        "unexpected result: {result:?}"
    );

    let mut request =
        ctx.rental_request(&customer, "2024-10-01", "2024-10-01", vec![line(&crane, 1)]);
    request.total_price = Some(dec!(1));
    request.advance_payment = Some(dec!(10000000000));
    let result = ctx.services.rentals.create(&ctx.user, request, ctx.tz).await;
    assert!(matches!(result, Err(InventoryError::Validation { .. })));
}

#[tokio::test]
async fn test_concurrent_rentals_cannot_oversell() {
    let ctx = TestContext::new();
    let generator = ctx.item("Generator", 1, dec!(80)).await;
    let customer = ctx.customer("Ken Thompson").await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let services = ctx.services.clone();
        let user = ctx.user.clone();
        let request =
            ctx.rental_request(&customer, "2024-11-01", "2024-11-03", vec![line(&generator, 1)]);
        tasks.spawn(async move { services.rentals.create(&user, request, chrono_tz::UTC).await });
    }

    let mut created = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => created += 1,
            Err(InventoryError::Unavailable { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(refused, 19);
}

#[tokio::test]
async fn test_concurrent_payments_cannot_exceed_balance() {
    let ctx = TestContext::new();
    let stage = ctx.item("Stage", 1, dec!(100)).await;
    let customer = ctx.customer("Dennis Ritchie").await;
    let view = ctx
        .services
        .rentals
        .create(
            &ctx.user,
            ctx.rental_request(&customer, "2024-12-01", "2024-12-01", vec![line(&stage, 1)]),
            ctx.tz,
        )
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..10 {
        let services = ctx.services.clone();
        let user = ctx.user.clone();
        let rental_id = view.rental.id;
        tasks.spawn(async move {
            services
                .rentals
                .record_payment(
                    &user,
                    &rental_id,
                    NewPayment {
                        amount: dec!(60),
                        method: PaymentMethod::Card,
                        paid_at: None,
                        note: None,
                    },
                )
                .await
        });
    }

    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => accepted += 1,
            Err(InventoryError::Overpayment { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(accepted, 1);

    let balance = ctx
        .services
        .rentals
        .balance(&ctx.user, &view.rental.id)
        .await
        .unwrap();
    assert_eq!(balance.remaining.to_string(), "40.00");
}
