use std::{env, fs, path::Path};

use epinet::network::HouseholdModel;
use epinet::prelude::*;
use ndarray::prelude::*;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct CoordRow {
    lat: f32,
    lon: f32,
}

/// Load a lat,lon table from disk.
fn read_coordinates(path: &str) -> csv::Result<CoordinateCatalog> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut coords = Vec::new();
    for res in reader.deserialize() {
        let row: CoordRow = res?;
        coords.push(Coord::new(row.lat, row.lon));
    }
    return Ok(CoordinateCatalog::new(coords));
}

/// A regular grid roughly the size of Denmark, for runs without an
/// empirical coordinate table.
fn synthetic_catalog(n: usize) -> CoordinateCatalog {
    let side = (n as f64).sqrt().ceil() as usize;
    let coords = (0..n)
        .map(|i| {
            let row = (i / side) as f32;
            let col = (i % side) as f32;
            Coord::new(55.0 + row * 2.0 / side as f32, 9.0 + col * 3.0 / side as f32)
        })
        .collect();
    return CoordinateCatalog::new(coords);
}

/// Household size histogram loosely following the Danish census,
/// with a flat age profile per size.
fn default_households(n_ages: usize) -> HouseholdModel {
    let sizes = [0.38, 0.33, 0.11, 0.12, 0.05, 0.01];
    let ages = Array2::from_elem((sizes.len(), n_ages), 1.0);
    return HouseholdModel::new(&sizes, &ages).unwrap();
}

pub fn main() {
    use simple_logger::SimpleLogger;
    SimpleLogger::new().init().unwrap();

    let cfg_path = env::args().nth(1).unwrap_or_else(|| "conf.toml".to_string());
    let cfg: SimConfig = match fs::read_to_string(&cfg_path) {
        Ok(data) => toml::from_str(&data).unwrap(),
        Err(_) => {
            println!("{} not found, using defaults", cfg_path);
            SimConfig::default()
        }
    };
    println!("{:#?}", cfg);

    let catalog = if Path::new("coordinates.csv").exists() {
        println!("Using coordinates from coordinates.csv");
        read_coordinates("coordinates.csv").unwrap()
    } else {
        synthetic_catalog(cfg.n_tot())
    };

    let households = default_households(10);
    let layout = cfg.layout();
    let engine = Gillespie::prepare(cfg, &catalog, &households).unwrap();
    println!("{:#?}", NetworkReport::new(engine.network()));
    let out = engine.run().unwrap();

    println!("{}", RunReport::new(&out, &layout).render_toml());
    fs::write("epicurve.csv", out.series.render_csv(&layout)).unwrap();
    println!("epicurve written to epicurve.csv");
}
