//! Thermal diffusion over an adaptively refined mesh.
//!
//! Injects a circular heat source at the domain center, alternates solver
//! steps with periodic refine/coarsen sweeps driven by the relative-gradient
//! criterion, and writes a VTK frame after every sweep so the refined region
//! tracking the spreading heat can be inspected in ParaView.
//!
//! Usage: `thermal_diffusion [iterations]` (default 40).

use amr_core::mesh::Mesh;
use amr_core::refinement::Gradient;
use amr_core::scheme::SecondOrderCenteredFiniteDifferences;

const BASE_RESOLUTION: u32 = 16;
const DOMAIN_SIZE: f64 = 1.0;
const MIN_DEPTH: u32 = 4;
const MAX_DEPTH: u32 = 8;
const REFINE_EVERY: usize = 5;
const SOURCE_RADIUS: f64 = 0.1;
const SOURCE_VALUE: f64 = 100.0;

fn main() {
  let iterations = match parse_iterations() {
    Ok(n) => n,
    Err(message) => {
      eprintln!("{message}");
      eprintln!("usage: thermal_diffusion [iterations]");
      std::process::exit(1);
    }
  };

  if let Err(err) = run(iterations) {
    eprintln!("thermal_diffusion: {err}");
    std::process::exit(1);
  }
}

fn parse_iterations() -> Result<usize, String> {
  let mut args = std::env::args().skip(1);
  match args.next() {
    None => Ok(40),
    Some(raw) => raw.parse::<usize>().map_err(|_| format!("invalid iteration count: {raw}")),
  }
}

fn run(iterations: usize) -> amr_core::Result<()> {
  let mut mesh = Mesh::uniform(BASE_RESOLUTION, || 0.0, DOMAIN_SIZE, DOMAIN_SIZE, None)?;

  let cx = DOMAIN_SIZE / 2.0;
  let cy = DOMAIN_SIZE / 2.0;
  mesh.inject(|tree, id| {
    if !tree.is_leaf(id) {
      return;
    }
    let (x, y, _) = tree.absolute_centered_origin(id);
    let (px, py) = (x * DOMAIN_SIZE, y * DOMAIN_SIZE);
    let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
    if distance <= SOURCE_RADIUS {
      tree.set_value(id, SOURCE_VALUE);
    }
  })?;

  let cell_size = DOMAIN_SIZE / BASE_RESOLUTION as f64;
  let scheme = SecondOrderCenteredFiniteDifferences::new(0.1, cell_size, cell_size);
  let criterion = Gradient::new(0.05);

  mesh.save(format!("mesh_t{:05}", 0))?;
  println!("frame 0: {} leaves", mesh.leafs()?.len());

  for step in 1..=iterations {
    amr_core::benchmark::time("solve", || mesh.solve(&scheme))?;

    if step % REFINE_EVERY == 0 {
      let stats = amr_core::benchmark::time("refine", || mesh.refine(&criterion, MIN_DEPTH, MAX_DEPTH))?;
      println!("step {step}: refined {}, coarsened {}", stats.refined, stats.coarsened);
    }

    mesh.save(format!("mesh_t{step:05}"))?;
    println!("frame {step}: {} leaves", mesh.leafs()?.len());
  }

  for (label, stats) in amr_core::benchmark::report() {
    println!("{label}: {} samples, {:.1}us avg", stats.count, stats.average);
  }

  Ok(())
}
