//! Seat grid built from booking rows for terminal display.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use seatbook_core::config::LayoutConfig;
use seatbook_core::types::{RequesterId, SeatNumber};

use super::model::Booking;

/// Occupancy of every seat in a layout, row by row.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    /// `rows[r][c]` holds the owner of seat `(r + 1, c)`.
    rows: Vec<Vec<Option<RequesterId>>>,
    /// Column count left of the aisle.
    aisle_after: u8,
}

impl SeatMap {
    /// Build the grid for `layout`. Seats without a booking row are shown as
    /// free; bookings outside the layout are ignored.
    pub fn from_bookings(bookings: &[Booking], layout: &LayoutConfig) -> Self {
        let owners: HashMap<&SeatNumber, Option<RequesterId>> = bookings
            .iter()
            .map(|b| (&b.seat_number, b.user_id))
            .collect();

        let rows = (1..=layout.rows)
            .map(|row| {
                (0..layout.seats_per_row)
                    .map(|col| {
                        SeatNumber::from_parts(row, col)
                            .ok()
                            .and_then(|seat| owners.get(&seat).copied().flatten())
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            aisle_after: layout.aisle_after,
        }
    }

    /// Number of claimed seats in the grid.
    pub fn occupied(&self) -> usize {
        self.rows.iter().flatten().filter(|s| s.is_some()).count()
    }

    /// Number of free seats in the grid.
    pub fn free(&self) -> usize {
        self.rows.iter().flatten().filter(|s| s.is_none()).count()
    }
}

impl fmt::Display for SeatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for (col, seat) in row.iter().enumerate() {
                f.write_str(if seat.is_some() { "x " } else { "0 " })?;
                if col + 1 == self.aisle_after as usize && col + 1 < row.len() {
                    f.write_str("  ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatbook_core::types::BookingId;

    fn booking(id: i32, seat: &str, owner: Option<i32>) -> Booking {
        Booking {
            booking_id: BookingId(id),
            airline_name: "Test Air".to_string(),
            seat_number: seat.parse().unwrap(),
            user_id: owner.map(RequesterId),
        }
    }

    fn small_layout() -> LayoutConfig {
        LayoutConfig {
            airline_name: "Test Air".to_string(),
            rows: 2,
            seats_per_row: 4,
            aisle_after: 2,
        }
    }

    #[test]
    fn test_render_marks_claimed_seats() {
        let bookings = vec![
            booking(1, "1A", Some(10)),
            booking(2, "1B", None),
            booking(3, "2D", Some(11)),
        ];
        let map = SeatMap::from_bookings(&bookings, &small_layout());
        assert_eq!(map.to_string(), "x 0   0 0 \n0 0   0 x \n");
        assert_eq!(map.occupied(), 2);
        assert_eq!(map.free(), 6);
    }

    #[test]
    fn test_ignores_bookings_outside_layout() {
        let bookings = vec![booking(1, "9A", Some(10))];
        let map = SeatMap::from_bookings(&bookings, &small_layout());
        assert_eq!(map.occupied(), 0);
    }
}
