use crate::error::{Result, SimError};
use crate::prelude::Real;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the distance kernel, in kilometers.
const EARTH_RADIUS_KM: Real = 6367.0;

/// Geographic position in decimal degrees. Every agent carries a
/// copy, so the fields stay at f32.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f32,
    pub lon: f32,
}

impl Coord {
    pub fn new(lat: f32, lon: f32) -> Self {
        Coord { lat, lon }
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine(p: Coord, q: Coord) -> Real {
    let lat1 = (p.lat as Real).to_radians();
    let lat2 = (q.lat as Real).to_radians();
    let dlat = lat2 - lat1;
    let dlon = ((q.lon - p.lon) as Real).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    return EARTH_RADIUS_KM * 2.0 * a.sqrt().asin();
}

/// Read-only table of candidate household locations. One catalog may
/// be shared by many runs; each run draws its own shuffled selection.
#[derive(Debug, Clone, Default)]
pub struct CoordinateCatalog {
    coords: Vec<Coord>,
}

impl CoordinateCatalog {
    pub fn new(coords: Vec<Coord>) -> Self {
        CoordinateCatalog { coords }
    }

    /// Draw `n` distinct locations in random order. Fails with
    /// InsufficientCoordinates when the catalog is too small.
    pub fn sample(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<Coord>> {
        if n > self.coords.len() {
            return Err(SimError::InsufficientCoordinates {
                requested: n,
                available: self.coords.len(),
            });
        }
        let mut indices: Vec<usize> = (0..self.coords.len()).collect();
        indices.shuffle(rng);
        indices.truncate(n);
        return Ok(indices.into_iter().map(|i| self.coords[i]).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Coord::new(55.676, 12.568);
        assert_approx_eq!(haversine(p, p), 0.0, 1e-9);
    }

    #[test]
    fn haversine_copenhagen_aarhus() {
        // Copenhagen to Aarhus is roughly 157 km as the crow flies.
        let cph = Coord::new(55.676, 12.568);
        let aar = Coord::new(56.162, 10.204);
        let d = haversine(cph, aar);
        assert!(d > 150.0 && d < 165.0, "got {}", d);
    }

    #[test]
    fn haversine_is_symmetric() {
        let p = Coord::new(55.0, 12.0);
        let q = Coord::new(57.0, 10.0);
        assert_approx_eq!(haversine(p, q), haversine(q, p), 1e-9);
    }

    #[test]
    fn sample_rejects_oversized_requests() {
        let catalog = CoordinateCatalog::new(vec![Coord::default(); 5]);
        let mut rng = SmallRng::seed_from_u64(1);
        match catalog.sample(6, &mut rng) {
            Err(SimError::InsufficientCoordinates {
                requested: 6,
                available: 5,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn sample_returns_distinct_coordinates() {
        let coords: Vec<_> = (0..100).map(|i| Coord::new(i as f32, -(i as f32))).collect();
        let catalog = CoordinateCatalog::new(coords);
        let mut rng = SmallRng::seed_from_u64(7);
        let picked = catalog.sample(50, &mut rng).unwrap();
        assert_eq!(picked.len(), 50);
        let mut lats: Vec<i32> = picked.iter().map(|c| c.lat as i32).collect();
        lats.sort_unstable();
        lats.dedup();
        assert_eq!(lats.len(), 50);
    }
}
