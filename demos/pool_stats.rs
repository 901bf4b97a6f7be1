use clap::Parser;
use compact_hash::CompactMap;
use compact_hash::CompactSet;
use compact_hash::array_pool::shared;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "collections", default_value_t = 10_000)]
    collections: usize,

    #[arg(short = 's', long = "max_size", default_value_t = 12)]
    max_size: usize,

    #[arg(short = 'r', long = "rounds", default_value_t = 3)]
    rounds: usize,
}

fn main() {
    let args = Args::parse();

    println!(
        "Building {} sets and {} maps of up to {} entries, {} rounds",
        args.collections, args.collections, args.max_size, args.rounds
    );

    for round in 0..args.rounds {
        let mut sets: Vec<CompactSet<u64>> = Vec::with_capacity(args.collections);
        let mut maps: Vec<CompactMap<u32, u32>> = Vec::with_capacity(args.collections);

        for i in 0..args.collections {
            let size = i % (args.max_size + 1);
            sets.push((0..size as u64).collect());
            maps.push((0..size as u32).map(|k| (k, k * 2)).collect());
        }

        // Drain half of the maps so they shrink and hand arrays back.
        for map in maps.iter_mut().step_by(2) {
            let keys: Vec<u32> = map.keys().copied().collect();
            for key in keys {
                map.remove(&key);
            }
        }

        let entries: usize = sets.iter().map(CompactSet::len).sum::<usize>()
            + maps.iter().map(CompactMap::len).sum::<usize>();
        let capacity: usize = sets.iter().map(CompactSet::capacity).sum::<usize>()
            + maps.iter().map(CompactMap::capacity).sum::<usize>();

        drop(sets);
        drop(maps);

        let stats = shared::stats();
        println!("Round {round}:");
        println!("  live entries before drop: {entries}");
        println!(
            "  slots before drop: {capacity} ({:.2}% used)",
            entries as f64 / capacity.max(1) as f64 * 100.0
        );
        println!("  pooled arrays: {}", shared::pooled());
        println!(
            "  hits: {}, misses: {}, released: {}, evicted: {}",
            stats.hits, stats.misses, stats.released, stats.evicted
        );
        let requests = stats.hits + stats.misses;
        if requests > 0 {
            println!(
                "  reuse rate: {:.2}%",
                stats.hits as f64 / requests as f64 * 100.0
            );
        }
    }

    shared::purge();
    println!("Pool purged, {} arrays left", shared::pooled());
}
