use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use parkvalet_core::types::{new_id, now_rfc3339};

use crate::error::{ReservationError, Result};
use crate::status::parse_timestamp;
use crate::types::{BookingStatus, NewReservation, Reservation, Stay};

const RESERVATION_SELECT_SQL: &str = "SELECT r.id, r.lot_id, r.spot_id, r.car_id, r.status,
            r.reserved_at, r.planned_arrival, r.planned_departure,
            s.reservation_id, s.actual_arrival, s.actual_departure
     FROM reservations r LEFT JOIN stays s ON s.reservation_id = r.id";

/// Thread-safe manager for reservations and their stay records.
///
/// Wraps a single SQLite connection in a `Mutex`.
pub struct ReservationManager {
    db: Mutex<Connection>,
}

impl ReservationManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Book a spot. Planned times default to now; the stay record starts empty.
    #[instrument(skip(self, new), fields(lot_id = %new.lot_id, spot_id = %new.spot_id))]
    pub fn create(&self, new: &NewReservation) -> Result<Reservation> {
        if new.lot_id.trim().is_empty() || new.spot_id.trim().is_empty() {
            return Err(ReservationError::InvalidInput(
                "lot_id and spot_id are required".to_string(),
            ));
        }

        let now = now_rfc3339();
        let planned_arrival = new.planned_arrival.clone().unwrap_or_else(|| now.clone());
        let planned_departure = new.planned_departure.clone().unwrap_or_else(|| now.clone());
        check_window(&planned_arrival, &planned_departure)?;

        let reservation = Reservation {
            id: new_id(),
            lot_id: new.lot_id.clone(),
            spot_id: new.spot_id.clone(),
            car_id: new.car_id.clone(),
            status: BookingStatus::Booked,
            reserved_at: now,
            planned_arrival,
            planned_departure,
            stay: Some(Stay::default()),
        };

        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO reservations
             (id, lot_id, spot_id, car_id, status, reserved_at, planned_arrival, planned_departure)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reservation.id,
                reservation.lot_id,
                reservation.spot_id,
                reservation.car_id,
                reservation.status.as_str(),
                reservation.reserved_at,
                reservation.planned_arrival,
                reservation.planned_departure,
            ],
        )?;
        tx.execute(
            "INSERT INTO stays (reservation_id) VALUES (?1)",
            params![reservation.id],
        )?;
        tx.commit()?;

        info!(reservation_id = %reservation.id, "reservation created");
        Ok(reservation)
    }

    /// Retrieve a reservation, returning `None` if it does not exist.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<Option<Reservation>> {
        let db = self.conn();
        get_row(&db, id)
    }

    /// Every reservation, oldest booking first.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<Reservation>> {
        self.query("ORDER BY r.reserved_at, r.id", &[])
    }

    #[instrument(skip(self))]
    pub fn list_for_lot(&self, lot_id: &str) -> Result<Vec<Reservation>> {
        self.query("WHERE r.lot_id = ?1 ORDER BY r.reserved_at, r.id", &[lot_id])
    }

    #[instrument(skip(self))]
    pub fn list_for_spot(&self, spot_id: &str) -> Result<Vec<Reservation>> {
        self.query("WHERE r.spot_id = ?1 ORDER BY r.reserved_at, r.id", &[spot_id])
    }

    #[instrument(skip(self))]
    pub fn list_for_car(&self, car_id: &str) -> Result<Vec<Reservation>> {
        self.query("WHERE r.car_id = ?1 ORDER BY r.reserved_at, r.id", &[car_id])
    }

    /// Reservations made for any of `car_ids` (e.g. all cars of one user).
    #[instrument(skip(self, car_ids), fields(cars = car_ids.len()))]
    pub fn list_for_cars(&self, car_ids: &[String]) -> Result<Vec<Reservation>> {
        if car_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=car_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let clause = format!("WHERE r.car_id IN ({placeholders}) ORDER BY r.reserved_at, r.id");
        let ids: Vec<&str> = car_ids.iter().map(String::as_str).collect();
        self.query(&clause, &ids)
    }

    /// Move the planned window. `None` keeps the current value.
    #[instrument(skip(self))]
    pub fn update_window(
        &self,
        id: &str,
        planned_arrival: Option<&str>,
        planned_departure: Option<&str>,
    ) -> Result<Reservation> {
        let db = self.conn();
        let mut reservation =
            get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))?;
        if let Some(a) = planned_arrival {
            reservation.planned_arrival = a.to_string();
        }
        if let Some(d) = planned_departure {
            reservation.planned_departure = d.to_string();
        }
        check_window(&reservation.planned_arrival, &reservation.planned_departure)?;

        db.execute(
            "UPDATE reservations SET planned_arrival = ?2, planned_departure = ?3 WHERE id = ?1",
            params![
                reservation.id,
                reservation.planned_arrival,
                reservation.planned_departure
            ],
        )?;
        debug!("planned window updated");
        Ok(reservation)
    }

    /// Mark the reservation cancelled. The spot stays referenced.
    #[instrument(skip(self))]
    pub fn cancel(&self, id: &str) -> Result<Reservation> {
        let db = self.conn();
        let rows = db.execute(
            "UPDATE reservations SET status = ?2 WHERE id = ?1",
            params![id, BookingStatus::Cancelled.as_str()],
        )?;
        if rows == 0 {
            return Err(ReservationError::NotFound(id.to_string()));
        }
        info!(reservation_id = id, "reservation cancelled");
        get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))
    }

    /// Permanently delete a reservation and its stay record.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute("DELETE FROM stays WHERE reservation_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM reservations WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(ReservationError::NotFound(id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop every reservation of a lot (the lot itself is going away).
    #[instrument(skip(self))]
    pub fn delete_for_lot(&self, lot_id: &str) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM stays WHERE reservation_id IN
             (SELECT id FROM reservations WHERE lot_id = ?1)",
            params![lot_id],
        )?;
        let rows = tx.execute("DELETE FROM reservations WHERE lot_id = ?1", params![lot_id])?;
        tx.commit()?;
        Ok(rows)
    }

    /// Record when the vehicle arrived (`at` defaults to now). Refused once
    /// a departure is on record.
    #[instrument(skip(self))]
    pub fn record_arrival(&self, id: &str, at: Option<&str>) -> Result<Reservation> {
        let at = at.map(String::from).unwrap_or_else(now_rfc3339);
        parse_timestamp("actual_arrival", &at)?;

        let db = self.conn();
        let reservation =
            get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))?;
        if reservation.actual_departure().is_some() {
            return Err(ReservationError::StayClosed(id.to_string()));
        }
        db.execute(
            "INSERT INTO stays (reservation_id, actual_arrival) VALUES (?1, ?2)
             ON CONFLICT(reservation_id) DO UPDATE SET actual_arrival = excluded.actual_arrival",
            params![id, at],
        )?;
        info!(reservation_id = id, "arrival recorded");
        get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))
    }

    /// Record when the vehicle left. Refused until an arrival is recorded,
    /// and for a time earlier than that arrival.
    #[instrument(skip(self))]
    pub fn record_departure(&self, id: &str, at: Option<&str>) -> Result<Reservation> {
        let at = at.map(String::from).unwrap_or_else(now_rfc3339);
        let departure = parse_timestamp("actual_departure", &at)?;

        let db = self.conn();
        let reservation =
            get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))?;
        let arrived = reservation
            .actual_arrival()
            .ok_or_else(|| ReservationError::ArrivalNotRecorded(id.to_string()))?;
        if departure < parse_timestamp("actual_arrival", arrived)? {
            return Err(ReservationError::DepartureBeforeArrival {
                id: id.to_string(),
                arrival: arrived.to_string(),
                departure: at,
            });
        }
        db.execute(
            "UPDATE stays SET actual_departure = ?2 WHERE reservation_id = ?1",
            params![id, at],
        )?;
        info!(reservation_id = id, "departure recorded");
        get_row(&db, id)?.ok_or_else(|| ReservationError::NotFound(id.to_string()))
    }

    fn query(&self, clause: &str, args: &[&str]) -> Result<Vec<Reservation>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!("{RESERVATION_SELECT_SQL} {clause}"))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_reservation)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn get_row(db: &Connection, id: &str) -> Result<Option<Reservation>> {
    Ok(db
        .query_row(
            &format!("{RESERVATION_SELECT_SQL} WHERE r.id = ?1"),
            params![id],
            row_to_reservation,
        )
        .optional()?)
}

/// Both ends must parse and departure must not precede arrival.
fn check_window(planned_arrival: &str, planned_departure: &str) -> Result<()> {
    let arrival = parse_timestamp("planned_arrival", planned_arrival)?;
    let departure = parse_timestamp("planned_departure", planned_departure)?;
    if departure < arrival {
        return Err(ReservationError::InvalidInput(
            "planned departure is before planned arrival".to_string(),
        ));
    }
    Ok(())
}

/// Map a row of RESERVATION_SELECT_SQL to a `Reservation`.
fn row_to_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reservation> {
    let status: String = row.get(4)?;
    // LEFT JOIN: a NULL stays.reservation_id means no stay row at all
    let stay_key: Option<String> = row.get(8)?;
    let stay = match stay_key {
        Some(_) => Some(Stay {
            actual_arrival: row.get(9)?,
            actual_departure: row.get(10)?,
        }),
        None => None,
    };
    Ok(Reservation {
        id: row.get(0)?,
        lot_id: row.get(1)?,
        spot_id: row.get(2)?,
        car_id: row.get(3)?,
        status: BookingStatus::from(status),
        reserved_at: row.get(5)?,
        planned_arrival: row.get(6)?,
        planned_departure: row.get(7)?,
        stay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ReservationManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        ReservationManager::new(conn)
    }

    fn booking(lot: &str, spot: &str, car: Option<&str>) -> NewReservation {
        NewReservation {
            lot_id: lot.into(),
            spot_id: spot.into(),
            car_id: car.map(String::from),
            planned_arrival: Some("2025-01-01T10:00:00Z".into()),
            planned_departure: Some("2025-01-01T18:00:00Z".into()),
        }
    }

    #[test]
    fn create_starts_with_empty_stay() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        let loaded = mgr.get(&r.id).unwrap().unwrap();
        assert_eq!(loaded.stay, Some(Stay::default()));
        assert_eq!(loaded.status, BookingStatus::Booked);
        assert_eq!(loaded, r);
    }

    #[test]
    fn missing_window_defaults_to_now() {
        let mgr = manager();
        let r = mgr
            .create(&NewReservation {
                lot_id: "lot".into(),
                spot_id: "A".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(r.planned_arrival, r.reserved_at);
        assert_eq!(r.planned_departure, r.reserved_at);
    }

    #[test]
    fn rejects_bad_input() {
        let mgr = manager();
        assert!(matches!(
            mgr.create(&booking("", "A", None)),
            Err(ReservationError::InvalidInput(_))
        ));
        let mut inverted = booking("lot", "A", None);
        inverted.planned_departure = Some("2025-01-01T09:00:00Z".into());
        assert!(matches!(
            mgr.create(&inverted),
            Err(ReservationError::InvalidInput(_))
        ));
        let mut garbage = booking("lot", "A", None);
        garbage.planned_arrival = Some("soon".into());
        assert!(matches!(
            mgr.create(&garbage),
            Err(ReservationError::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn filtered_lists() {
        let mgr = manager();
        mgr.create(&booking("lot1", "A", Some("car1"))).unwrap();
        mgr.create(&booking("lot1", "B", Some("car2"))).unwrap();
        mgr.create(&booking("lot2", "C", Some("car1"))).unwrap();
        mgr.create(&booking("lot2", "D", None)).unwrap();

        assert_eq!(mgr.list_all().unwrap().len(), 4);
        assert_eq!(mgr.list_for_lot("lot1").unwrap().len(), 2);
        assert_eq!(mgr.list_for_spot("C").unwrap().len(), 1);
        assert_eq!(mgr.list_for_car("car1").unwrap().len(), 2);
        assert_eq!(
            mgr.list_for_cars(&["car1".into(), "car2".into()]).unwrap().len(),
            3
        );
        assert!(mgr.list_for_cars(&[]).unwrap().is_empty());
        assert!(mgr.list_for_lot("nowhere").unwrap().is_empty());
    }

    #[test]
    fn list_all_is_ordered_by_booking_time() {
        let mgr = manager();
        let first = mgr.create(&booking("lot", "A", None)).unwrap();
        let second = mgr.create(&booking("lot", "B", None)).unwrap();
        let ids: Vec<_> = mgr.list_all().unwrap().into_iter().map(|r| r.id).collect();
        let pos = |id: &str| ids.iter().position(|x| x == id).unwrap();
        assert!(pos(&first.id) < pos(&second.id));
    }

    #[test]
    fn update_window_keeps_unset_end() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        let updated = mgr
            .update_window(&r.id, None, Some("2025-01-02T18:00:00Z"))
            .unwrap();
        assert_eq!(updated.planned_arrival, r.planned_arrival);
        assert_eq!(updated.planned_departure, "2025-01-02T18:00:00Z");
        assert!(matches!(
            mgr.update_window("missing", None, None),
            Err(ReservationError::NotFound(_))
        ));
    }

    #[test]
    fn cancel_sets_raw_status() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        let cancelled = mgr.cancel(&r.id).unwrap();
        assert!(cancelled.status.is_cancelled());
        assert!(matches!(
            mgr.cancel("missing"),
            Err(ReservationError::NotFound(_))
        ));
    }

    #[test]
    fn departure_requires_arrival() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        assert!(matches!(
            mgr.record_departure(&r.id, None),
            Err(ReservationError::ArrivalNotRecorded(_))
        ));

        let arrived = mgr
            .record_arrival(&r.id, Some("2025-01-01T10:05:00Z"))
            .unwrap();
        assert_eq!(arrived.actual_arrival(), Some("2025-01-01T10:05:00Z"));

        let left = mgr
            .record_departure(&r.id, Some("2025-01-01T17:50:00Z"))
            .unwrap();
        assert_eq!(left.actual_departure(), Some("2025-01-01T17:50:00Z"));
    }

    #[test]
    fn departure_cannot_precede_arrival() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        mgr.record_arrival(&r.id, Some("2025-01-01T10:05:00Z")).unwrap();

        assert!(matches!(
            mgr.record_departure(&r.id, Some("2025-01-01T09:00:00Z")),
            Err(ReservationError::DepartureBeforeArrival { .. })
        ));
        assert!(mgr.get(&r.id).unwrap().unwrap().actual_departure().is_none());

        // leaving the same instant is allowed
        let left = mgr
            .record_departure(&r.id, Some("2025-01-01T10:05:00Z"))
            .unwrap();
        assert_eq!(left.actual_departure(), Some("2025-01-01T10:05:00Z"));
    }

    #[test]
    fn completed_stay_keeps_its_arrival() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        mgr.record_arrival(&r.id, Some("2025-01-01T10:05:00Z")).unwrap();
        mgr.record_departure(&r.id, Some("2025-01-01T17:50:00Z")).unwrap();

        assert!(matches!(
            mgr.record_arrival(&r.id, Some("2025-01-01T19:00:00Z")),
            Err(ReservationError::StayClosed(_))
        ));
        let stored = mgr.get(&r.id).unwrap().unwrap();
        assert_eq!(stored.actual_arrival(), Some("2025-01-01T10:05:00Z"));
    }

    #[test]
    fn arrival_can_be_corrected_before_departure() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        mgr.record_arrival(&r.id, Some("2025-01-01T10:05:00Z")).unwrap();
        let fixed = mgr
            .record_arrival(&r.id, Some("2025-01-01T10:15:00Z"))
            .unwrap();
        assert_eq!(fixed.actual_arrival(), Some("2025-01-01T10:15:00Z"));
    }

    #[test]
    fn arrival_rejects_malformed_time() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        assert!(matches!(
            mgr.record_arrival(&r.id, Some("whenever")),
            Err(ReservationError::MalformedTimestamp { .. })
        ));
        assert!(matches!(
            mgr.record_arrival("missing", None),
            Err(ReservationError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_stay_too() {
        let mgr = manager();
        let r = mgr.create(&booking("lot", "A", None)).unwrap();
        mgr.delete(&r.id).unwrap();
        assert!(mgr.get(&r.id).unwrap().is_none());
        let stays: i64 = mgr
            .conn()
            .query_row("SELECT COUNT(*) FROM stays", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stays, 0);
        assert!(matches!(
            mgr.delete(&r.id),
            Err(ReservationError::NotFound(_))
        ));
    }

    #[test]
    fn delete_for_lot_only_touches_that_lot() {
        let mgr = manager();
        mgr.create(&booking("lot1", "A", None)).unwrap();
        mgr.create(&booking("lot1", "B", None)).unwrap();
        mgr.create(&booking("lot2", "C", None)).unwrap();
        assert_eq!(mgr.delete_for_lot("lot1").unwrap(), 2);
        assert_eq!(mgr.list_all().unwrap().len(), 1);
    }

    #[test]
    fn row_without_stay_reads_as_none() {
        let mgr = manager();
        mgr.conn()
            .execute(
                "INSERT INTO reservations
                 (id, lot_id, spot_id, status, reserved_at, planned_arrival, planned_departure)
                 VALUES ('legacy', 'lot', 'A', 'weird', 'x', 'y', 'z')",
                [],
            )
            .unwrap();
        let r = mgr.get("legacy").unwrap().unwrap();
        assert!(r.stay.is_none());
        assert_eq!(r.status, BookingStatus::Other("weird".into()));
    }
}
