//! Minimal example of a stigmergy simulation

use stigmergy::{Config, PointerSample, SimulationState};

fn main() -> Result<(), stigmergy::ConfigError> {
    println!("stigmergy - Minimal Example");
    println!("===========================\n");

    let config = Config::preset("classic")?;

    // Seeded for reproducibility
    let mut sim = SimulationState::new_with_seed(config, 42)?;

    println!("Initial state:");
    println!("  Agents: {}", sim.population().len());
    println!("  Field: {}x{}", sim.field().width(), sim.field().height());
    println!();

    let frames = 500;
    println!("Running {} frames...\n", frames);

    for i in 0..frames {
        // Drag a short horizontal stroke through the middle for a while
        let pointer = if (100..120).contains(&i) {
            PointerSample::drag(50.0 + (i - 100) as f32 * 5.0, 100.0)
        } else {
            PointerSample::default()
        };
        sim.frame(&pointer);

        if (i + 1) % 100 == 0 {
            println!("{}", sim.stats.summary());
        }
    }

    let pixels = sim.field().to_rgba8();
    println!("\nFinal state:");
    println!("  Frames: {}", sim.frame_count());
    println!("  Coverage: {:.1}%", sim.stats.coverage * 100.0);
    println!("  Buffer: {} bytes", pixels.len());

    Ok(())
}
