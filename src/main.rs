// Churn driver for Tree instances. Measure:
// * Initial load, attaching every node next to a random existing node.
// * Churn rounds, each round deletes a tenth of the nodes and attaches
//   as many new ones, reusing pooled slots.
// * Audit at the end, reporting node counts, black depth and leaf depths.
//
// Usage: rbtree-index [nodes] [rounds] [seed] [log-level]

use std::{env, process, str::FromStr, time::Instant};

use log::{error, info, warn, LevelFilter};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use rbtree_index::Tree;

const DEFAULT_NODES: usize = 100_000;
const DEFAULT_ROUNDS: usize = 10;
const DEFAULT_SEED: u64 = 0x5eed;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    // logger is not up yet, report a bad level once it is.
    let level = args.get(3).map(|arg| arg.parse::<LevelFilter>());
    if let Err(err) = TermLogger::init(
        match &level {
            Some(Ok(level)) => *level,
            _ => LevelFilter::Info,
        },
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger: {}", err);
    }
    if let Some(Err(_)) = level {
        warn!("invalid log level {:?}, using info", args[3]);
    }

    let nodes = arg(&args, 0, DEFAULT_NODES);
    let rounds = arg(&args, 1, DEFAULT_ROUNDS);
    let seed = arg(&args, 2, DEFAULT_SEED);
    info!("nodes:{} rounds:{} seed:{}", nodes, rounds, seed);

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut tree: Tree<u64> = Tree::with_capacity(nodes);

    let start = Instant::now();
    for value in 0..(nodes as u64) {
        attach_random(&mut tree, &mut rng, value);
    }
    info!("loaded {} nodes in {:?}", tree.len(), start.elapsed());

    let mut value = nodes as u64;
    for round in 0..rounds {
        let start = Instant::now();
        let churn = tree.len() / 10;
        for _ in 0..churn {
            if let Some(node) = tree.random(&mut rng) {
                tree.delete_node(node);
            }
        }
        for _ in 0..churn {
            attach_random(&mut tree, &mut rng, value);
            value += 1;
        }
        let stats = tree.stats();
        info!(
            "round {} churned {} nodes in {:?}, allocated:{} pooled:{}",
            round,
            churn,
            start.elapsed(),
            stats.allocated(),
            stats.pooled()
        );
    }

    match tree.audit() {
        Ok(stats) => {
            info!(
                "entries:{} allocated:{} node_size:{} blacks:{:?}",
                stats.entries(),
                stats.allocated(),
                stats.node_size(),
                stats.blacks()
            );
            if let Some(depths) = stats.depths() {
                depths.pretty_print("");
                info!("depths {}", depths.json());
            }
        }
        Err(err) => {
            error!("audit failed: {}", err);
            process::exit(1);
        }
    }
}

fn attach_random(tree: &mut Tree<u64>, rng: &mut SmallRng, value: u64) {
    let at = tree.random(rng);
    let node = tree.new_node(value);
    if rng.gen::<bool>() {
        tree.attach_before(at, node);
    } else {
        tree.attach_after(at, node);
    }
}

fn arg<V: FromStr>(args: &[String], n: usize, default: V) -> V {
    match args.get(n).map(|arg| arg.parse::<V>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            warn!("invalid argument {:?}, using default", args[n]);
            default
        }
        None => default,
    }
}
