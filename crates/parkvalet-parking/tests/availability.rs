// Free-spot matching through the public API, fed by real reservation and lot
// managers over in-memory SQLite.

use parkvalet_core::config::ParkingConfig;
use parkvalet_parking::{
    free_spots, free_spots_all_lots, Category, CategoryMap, ParkingLot, ParkingManager, Position,
    Spot,
};
use parkvalet_reservations::{BookingStatus, NewReservation, Reservation, ReservationManager, Stay};

fn spot(id: &str, category: &str, col: u32) -> Spot {
    Spot {
        id: id.into(),
        position: Position { row: 0, col },
        category: Category::new(category),
    }
}

fn three_spot_lot() -> ParkingLot {
    ParkingLot {
        id: "lot-1".into(),
        city: "Lyon".into(),
        name: "Gare".into(),
        layout: vec![spot("A", "small", 0), spot("B", "medium", 1), spot("C", "small", 2)],
        created_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn reservation_on(spot_id: &str) -> Reservation {
    Reservation {
        id: format!("res-{spot_id}"),
        lot_id: "lot-1".into(),
        spot_id: spot_id.into(),
        car_id: None,
        status: BookingStatus::Booked,
        reserved_at: "2025-01-01T00:00:00Z".into(),
        planned_arrival: "2025-01-01T10:00:00Z".into(),
        planned_departure: "2025-01-01T18:00:00Z".into(),
        stay: Some(Stay::default()),
    }
}

#[test]
fn small_filter_skips_reserved_medium_spot() {
    let lot = three_spot_lot();
    let reservations = vec![reservation_on("B")];
    let free = free_spots(&lot, &reservations, Some("Sedan"), &CategoryMap::defaults());
    let ids: Vec<_> = free.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[test]
fn no_reservations_returns_whole_layout_in_order() {
    let lot = three_spot_lot();
    assert_eq!(free_spots(&lot, &[], None, &CategoryMap::defaults()), lot.layout);
}

#[test]
fn empty_layout_is_empty_not_an_error() {
    let mut lot = three_spot_lot();
    lot.layout.clear();
    assert!(free_spots(&lot, &[reservation_on("A")], None, &CategoryMap::defaults()).is_empty());
}

#[test]
fn unknown_vehicle_type_matches_only_unknown_spots() {
    let mut lot = three_spot_lot();
    lot.layout.push(spot("D", Category::UNKNOWN, 3));
    let free = free_spots(&lot, &[], Some("Hovercraft"), &CategoryMap::defaults());
    assert_eq!(free, vec![spot("D", "unknown", 3)]);
}

#[test]
fn result_is_sound_and_complete() {
    let lot = three_spot_lot();
    let reservations = vec![reservation_on("A"), reservation_on("C"), reservation_on("Z")];
    let free = free_spots(&lot, &reservations, None, &CategoryMap::defaults());
    for s in &lot.layout {
        let reserved = reservations.iter().any(|r| r.spot_id == s.id);
        assert_eq!(free.contains(s), !reserved, "spot {}", s.id);
    }
}

#[test]
fn filtered_is_the_unfiltered_subset_with_that_category() {
    let lot = three_spot_lot();
    let map = CategoryMap::defaults();
    let reservations = vec![reservation_on("A")];
    let all = free_spots(&lot, &reservations, None, &map);
    for raw in ["Sedan", "SUV", "Cargo Van", "Bicycle"] {
        let wanted = map.categorize(raw);
        let expected: Vec<_> = all.iter().filter(|s| s.category == wanted).cloned().collect();
        assert_eq!(free_spots(&lot, &reservations, Some(raw), &map), expected, "{raw}");
    }
}

#[test]
fn booking_through_managers_removes_spot_from_free_map() {
    let parking_conn = rusqlite::Connection::open_in_memory().unwrap();
    parkvalet_parking::db::init_db(&parking_conn).unwrap();
    let parking = ParkingManager::new(parking_conn, CategoryMap::defaults(), ParkingConfig::default());

    let res_conn = rusqlite::Connection::open_in_memory().unwrap();
    parkvalet_reservations::db::init_db(&res_conn).unwrap();
    let reservations = ReservationManager::new(res_conn);

    let lot = parking.create_lot("Lyon", "Perrache", Some(2), Some(3)).unwrap();
    let target = lot.layout[4].clone();
    reservations
        .create(&NewReservation {
            lot_id: lot.id.clone(),
            spot_id: target.id.clone(),
            ..Default::default()
        })
        .unwrap();

    let lots = parking.list_lots().unwrap();
    let all = reservations.list_all().unwrap();
    let free = free_spots_all_lots(&lots, &all, None, parking.categories());
    assert_eq!(free[&lot.id].len(), 5);
    assert!(!free[&lot.id].contains(&target));

    // cancelling does not give the spot back
    reservations.cancel(&all[0].id).unwrap();
    let all = reservations.list_all().unwrap();
    let free = free_spots_all_lots(&lots, &all, None, parking.categories());
    assert!(!free[&lot.id].contains(&target));
}
