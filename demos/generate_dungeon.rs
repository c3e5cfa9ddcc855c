//! Example: Grow a dungeon and tile it
//!
//! Demonstrates the basic usage of the generation pipeline.

use std::collections::BTreeMap;

use dungeon_regions::*;

fn main() {
    println!("Region Growth Dungeon Example");
    println!("=============================\n");

    // A courtyard feeding a keep (with its own cellar) and a crypt
    let config = GeneratorConfigBuilder::new()
        .seed(42)
        .root(
            RegionConfig::new("courtyard", 24)
                .with_child(
                    RegionConfig::new("keep", 12).with_child(RegionConfig::new("cellar", 6)),
                )
                .with_child(RegionConfig::new("crypt", 10).has_end(false)),
        )
        .pacing(Pacing::Immediate)
        .cell_size(Vec2::splat(4.0))
        .unwrap()
        .build()
        .unwrap();

    println!("Configuration:");
    println!("  Seed: {}", config.seed);
    println!("  Regions: {}", config.root.region_count());
    println!("  Cell Size: {}", config.cell_size);
    println!();

    println!("Growing regions...");
    let mut generator = Generator::new(config);
    generator.generate().expect("Failed to grow regions");
    println!(
        "Generated {} sections ({} grown of {} requested)\n",
        generator.graph().len(),
        generator.full_section_count(),
        generator.full_target_size()
    );

    println!("Regions:");
    for region in generator.regions().iter() {
        println!(
            "  {} {:<10} owned={:>3} target={:>3} parent={}",
            region.id,
            region.name,
            region.owned_count(),
            region.target_size,
            region.parent.map_or_else(|| "-".to_string(), |p| p.to_string())
        );
    }
    println!();

    let tile_set = tiles::catalog::canonical();
    let layout = generator
        .place_tiles(std::slice::from_ref(&tile_set))
        .expect("Failed to place tiles");

    let mut usage: BTreeMap<&str, usize> = BTreeMap::new();
    for placement in &layout.placements {
        if let Some(template) = tile_set.template(placement.template) {
            *usage.entry(template.name.as_str()).or_default() += 1;
        }
    }

    println!("Tile usage ({}):", tile_set.name());
    for (name, count) in &usage {
        println!("  {:<24} {}", name, count);
    }
    println!();

    println!("Sample placements:");
    for placement in layout.placements.iter().take(5) {
        let section = generator.graph().get(placement.section).expect("placed section exists");
        println!(
            "  Section {}: grid=({}, {}), {:?}, tile={}, rotation={}°",
            section.id,
            section.position.x,
            section.position.y,
            section.archetype,
            placement.template,
            placement.rotation
        );
    }

    println!("\nGeneration complete! Stage: {}", generator.stage());
}
