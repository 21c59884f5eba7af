//! Free-spot matching: which spots of a layout no reservation references.
//!
//! Occupancy is by spot id only. Any reservation naming a spot occupies it,
//! whatever its booking status or stay record, and the reservation's lot id
//! is not consulted.

use std::collections::{BTreeMap, HashSet};

use parkvalet_reservations::Reservation;

use crate::category::{Category, CategoryMap};
use crate::types::{ParkingLot, Spot};

/// Spot ids referenced by a reservation set, built once per query.
struct Occupancy<'a> {
    taken: HashSet<&'a str>,
}

impl<'a> Occupancy<'a> {
    fn new(reservations: &'a [Reservation]) -> Self {
        Self {
            taken: reservations.iter().map(|r| r.spot_id.as_str()).collect(),
        }
    }

    fn free_in(&self, lot: &ParkingLot, wanted: Option<&Category>) -> Vec<Spot> {
        lot.layout
            .iter()
            .filter(|spot| !self.taken.contains(spot.id.as_str()))
            .filter(|spot| wanted.map_or(true, |c| &spot.category == c))
            .cloned()
            .collect()
    }
}

/// Free spots of one lot in layout order, optionally limited to the category
/// of the raw vehicle type `vehicle_type`.
pub fn free_spots(
    lot: &ParkingLot,
    reservations: &[Reservation],
    vehicle_type: Option<&str>,
    categories: &CategoryMap,
) -> Vec<Spot> {
    let wanted = vehicle_type.map(|raw| categories.categorize(raw));
    Occupancy::new(reservations).free_in(lot, wanted.as_ref())
}

/// Free spots of every lot, keyed by lot id. Lots without a free spot map to
/// an empty list rather than being left out.
pub fn free_spots_all_lots(
    lots: &[ParkingLot],
    reservations: &[Reservation],
    vehicle_type: Option<&str>,
    categories: &CategoryMap,
) -> BTreeMap<String, Vec<Spot>> {
    let wanted = vehicle_type.map(|raw| categories.categorize(raw));
    let occupancy = Occupancy::new(reservations);
    lots.iter()
        .map(|lot| (lot.id.clone(), occupancy.free_in(lot, wanted.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use parkvalet_reservations::{BookingStatus, Stay};

    fn spot(id: &str, category: &str) -> Spot {
        Spot {
            id: id.into(),
            position: Position { row: 0, col: 0 },
            category: Category::new(category),
        }
    }

    fn lot(id: &str, layout: Vec<Spot>) -> ParkingLot {
        ParkingLot {
            id: id.into(),
            city: "Lyon".into(),
            name: id.into(),
            layout,
            created_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn reserve(spot_id: &str, status: BookingStatus) -> Reservation {
        Reservation {
            id: format!("r-{spot_id}"),
            lot_id: "elsewhere".into(),
            spot_id: spot_id.into(),
            car_id: None,
            status,
            reserved_at: "2025-01-01T00:00:00Z".into(),
            planned_arrival: "2025-01-01T10:00:00Z".into(),
            planned_departure: "2025-01-01T18:00:00Z".into(),
            stay: Some(Stay::default()),
        }
    }

    #[test]
    fn cancelled_reservation_still_occupies() {
        let l = lot("l1", vec![spot("A", "small"), spot("B", "small")]);
        let res = vec![reserve("A", BookingStatus::Cancelled)];
        let free = free_spots(&l, &res, None, &CategoryMap::defaults());
        assert_eq!(free, vec![spot("B", "small")]);
    }

    #[test]
    fn reservation_lot_is_ignored() {
        // reserve() points at lot "elsewhere", yet spot A of l1 is taken
        let l = lot("l1", vec![spot("A", "small")]);
        let res = vec![reserve("A", BookingStatus::Booked)];
        assert!(free_spots(&l, &res, None, &CategoryMap::defaults()).is_empty());
    }

    #[test]
    fn all_lots_keeps_fully_booked_lots() {
        let lots = vec![
            lot("l1", vec![spot("A", "small")]),
            lot("l2", vec![spot("B", "large")]),
        ];
        let res = vec![reserve("A", BookingStatus::Booked)];
        let free = free_spots_all_lots(&lots, &res, None, &CategoryMap::defaults());
        assert_eq!(free.len(), 2);
        assert!(free["l1"].is_empty());
        assert_eq!(free["l2"], vec![spot("B", "large")]);
    }

    #[test]
    fn all_lots_filters_by_category() {
        let lots = vec![
            lot("l1", vec![spot("A", "small"), spot("B", "large")]),
            lot("l2", vec![spot("C", "large")]),
        ];
        let free = free_spots_all_lots(&lots, &[], Some("Cargo Van"), &CategoryMap::defaults());
        assert_eq!(free["l1"], vec![spot("B", "large")]);
        assert_eq!(free["l2"], vec![spot("C", "large")]);
    }
}
