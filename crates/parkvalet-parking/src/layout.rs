use rand::seq::SliceRandom;
use rand::Rng;

use parkvalet_core::types::random_id;

use crate::category::{Category, CategoryMap};
use crate::error::{ParkingError, Result};
use crate::types::{Position, Spot};

/// Build a `rows x cols` layout in row-major order. Each spot gets a fresh id
/// and the category of a raw vehicle type drawn from `categories`.
pub fn generate_layout<R: Rng + ?Sized>(
    rows: u32,
    cols: u32,
    max_spots: u32,
    categories: &CategoryMap,
    rng: &mut R,
) -> Result<Vec<Spot>> {
    if rows == 0 || cols == 0 {
        return Err(ParkingError::InvalidDimensions { rows, cols });
    }
    let requested = u64::from(rows) * u64::from(cols);
    if requested > u64::from(max_spots) {
        return Err(ParkingError::TooManySpots {
            requested,
            max: max_spots,
        });
    }

    let raw_types: Vec<&str> = categories.raw_types().collect();
    let layout = (0..rows * cols)
        .map(|index| {
            let category = raw_types
                .choose(&mut *rng)
                .map(|raw| categories.categorize(raw))
                .unwrap_or_else(Category::unknown);
            Spot {
                id: random_id(),
                position: Position {
                    row: index / cols,
                    col: index % cols,
                },
                category,
            }
        })
        .collect();
    Ok(layout)
}
