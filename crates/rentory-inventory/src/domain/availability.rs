//! Stock conflict checks for rentals and bookings

use crate::domain::bookings::Booking;
use crate::domain::items::Item;
use crate::domain::rentals::Rental;
use crate::domain::types::{BookingId, DateRange, ItemId, LineItem, RentalId};
use crate::error::{InventoryError, Result};
use serde::{Deserialize, Serialize};

/// Record a commitment comes from, used to leave the record being edited out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentSource {
    Rental(RentalId),
    Booking(BookingId),
}

/// Units of one item held over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub item_id: ItemId,
    pub quantity: i32,
    pub period: DateRange,
    pub source: CommitmentSource,
}

/// Commitments of every stock-holding rental and booking, minus `exclude`
pub fn collect_commitments(
    rentals: &[Rental],
    bookings: &[Booking],
    exclude: Option<CommitmentSource>,
) -> Vec<Commitment> {
    let from_rentals = rentals
        .iter()
        .filter(|r| r.status.holds_stock())
        .filter(|r| exclude != Some(CommitmentSource::Rental(r.id)))
        .flat_map(|r| {
            r.lines.iter().map(move |line| Commitment {
                item_id: line.item_id,
                quantity: line.quantity,
                period: r.period,
                source: CommitmentSource::Rental(r.id),
            })
        });

    let from_bookings = bookings
        .iter()
        .filter(|b| b.status.holds_stock())
        .filter(|b| exclude != Some(CommitmentSource::Booking(b.id)))
        .flat_map(|b| {
            b.lines.iter().map(move |line| Commitment {
                item_id: line.item_id,
                quantity: line.quantity,
                period: b.period,
                source: CommitmentSource::Booking(b.id),
            })
        });

    from_rentals.chain(from_bookings).collect()
}

/// Highest number of units of `item_id` committed on any single day of `range`
pub fn peak_committed(commitments: &[Commitment], item_id: ItemId, range: &DateRange) -> i32 {
    let relevant: Vec<&Commitment> = commitments
        .iter()
        .filter(|c| c.item_id == item_id && c.period.overlaps(range))
        .collect();

    if relevant.is_empty() {
        return 0;
    }

    let peak = range
        .iter_days()
        .map(|day| {
            relevant
                .iter()
                .filter(|c| c.period.contains(day))
                .map(|c| i64::from(c.quantity))
                .sum::<i64>()
        })
        .max()
        .unwrap_or(0);
    i32::try_from(peak).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemAvailability {
    pub item_id: ItemId,
    pub name: String,
    pub stock: i32,
    pub committed: i32,
    pub available: i32,
}

pub fn availability_for(item: &Item, range: &DateRange, commitments: &[Commitment]) -> ItemAvailability {
    let committed = peak_committed(commitments, item.id, range);
    ItemAvailability {
        item_id: item.id,
        name: item.name.clone(),
        stock: item.quantity,
        committed,
        available: (item.quantity - committed).max(0),
    }
}

/// Fail with `Unavailable` on the first line that does not fit in stock.
///
/// `lines` must already be normalised; every line's item must be in `items`.
pub fn ensure_available(
    items: &[Item],
    lines: &[LineItem],
    range: &DateRange,
    commitments: &[Commitment],
) -> Result<()> {
    for line in lines {
        let item = items
            .iter()
            .find(|i| i.id == line.item_id)
            .ok_or_else(|| InventoryError::ItemNotFound {
                id: line.item_id.to_string(),
            })?;

        if line.quantity > item.quantity {
            return Err(InventoryError::Unavailable {
                item_id: item.id.to_string(),
                requested: line.quantity,
                available: item.quantity,
            });
        }

        let availability = availability_for(item, range, commitments);
        if line.quantity > availability.available {
            return Err(InventoryError::Unavailable {
                item_id: item.id.to_string(),
                requested: line.quantity,
                available: availability.available,
            });
        }
    }
    Ok(())
}
