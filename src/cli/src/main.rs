#![warn(clippy::pedantic)]

use std::{
    num::NonZeroU64,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail};
use cube_core::{Action, Cube, TwistEngine, encode};
use itertools::Itertools;
use log::{info, warn};
use move_table::{
    ExploreConfig, Explorer, latest_checkpoint_for, read_manifest, read_table, success,
};

mod render;

/// Build and query tables of undo moves for n×n×n cubes
#[derive(Parser)]
#[command(name = "cubetable", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore outward from the solved cube, checkpointing the table as it grows
    Explore(ExploreArgs),

    /// Summarize a table file
    Inspect {
        /// A `.table` file written by `explore`
        table: PathBuf,
    },

    /// Scramble a solved cube and undo the scramble using a table
    Solve {
        /// A `.table` file written by `explore`
        table: PathBuf,

        #[command(flatten)]
        scramble: ScrambleArgs,
    },

    /// Print the net of a cube
    Show {
        /// Edge length of the cube
        #[arg(short = 'n', long, default_value_t = 3)]
        size: usize,

        #[command(flatten)]
        scramble: ScrambleArgs,

        /// Print face letters instead of coloured stickers
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Args)]
struct ExploreArgs {
    /// TOML file with exploration settings. Flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Edge length of the cube
    #[arg(short = 'n', long)]
    size: Option<usize>,

    /// Stop once configurations this many twists away have been recorded
    #[arg(long)]
    max_depth: Option<u32>,

    /// Stop once this many configurations have been recorded
    #[arg(long)]
    max_states: Option<u64>,

    /// Also twist inner slices
    #[arg(long)]
    deep_slices: bool,

    /// Generate children on all cores
    #[arg(long)]
    parallel: bool,

    /// Directory checkpoints are written to
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Checkpoint every time this many more configurations have been recorded
    #[arg(long)]
    increment: Option<NonZeroU64>,

    /// Keep the table in memory only
    #[arg(long)]
    no_checkpoint: bool,

    /// Continue from the newest checkpoint in the data directory
    #[arg(long)]
    resume: bool,
}

#[derive(Args)]
struct ScrambleArgs {
    /// An action to apply to the solved cube, written face,direction,slice (e.g. 4,1,0). May be
    /// repeated.
    #[arg(short, long = "action", value_parser = parse_triple)]
    actions: Vec<(u8, u8, u8)>,

    /// Apply this many random actions instead
    #[arg(short, long, conflicts_with = "actions")]
    random: Option<usize>,

    /// Seed for `--random`
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn parse_triple(text: &str) -> Result<(u8, u8, u8), String> {
    let fields = text
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("{text}: {e}"))?;

    match fields[..] {
        [face, direction, slice] => Ok((face, direction, slice)),
        _ => Err(format!(
            "{text}: expected three comma separated numbers face,direction,slice"
        )),
    }
}

impl ScrambleArgs {
    fn actions(&self, n: usize) -> color_eyre::Result<Vec<Action>> {
        if let Some(count) = self.random {
            let mut rng = fastrand::Rng::with_seed(self.seed);
            return Ok((0..count).map(|_| Action::sample(n, &mut rng)).collect());
        }

        Ok(self
            .actions
            .iter()
            .map(|&(face, direction, slice)| Action::from_raw(face, direction, slice, n))
            .collect::<Result<Vec<_>, _>>()?)
    }

    fn apply(&self, engine: &TwistEngine) -> color_eyre::Result<(Cube, Vec<Action>)> {
        let actions = self.actions(engine.size())?;
        let cube = engine.apply_all(&Cube::solved(engine.size())?, actions.iter().copied())?;
        Ok((cube, actions))
    }
}

fn describe(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "(none)".to_owned();
    }

    actions
        .iter()
        .map(|action| {
            let [face, direction, slice] = action.to_raw();
            format!("{face},{direction},{slice} ({action})")
        })
        .join("  ")
}

fn explore(args: ExploreArgs) -> color_eyre::Result<()> {
    let mut config = match &args.config {
        Some(path) => ExploreConfig::from_file(path)?,
        None => ExploreConfig::default(),
    };

    if let Some(size) = args.size {
        config.size = size;
    }
    if args.max_depth.is_some() {
        config.budget.max_depth = args.max_depth;
    }
    if args.max_states.is_some() {
        config.budget.max_states = args.max_states;
    }
    config.deep_slices |= args.deep_slices;
    config.parallel |= args.parallel;
    if let Some(data_dir) = args.data_dir {
        config.checkpoint.data_dir = data_dir;
    }
    if let Some(increment) = args.increment {
        config.checkpoint.increment = increment;
    }
    if args.no_checkpoint {
        config.checkpoint.enabled = false;
    }

    let solved = Cube::solved(config.size)?;

    let latest = if args.resume {
        if !config.checkpoint.data_dir.is_dir() {
            bail!(
                "Cannot resume: {} is not a directory",
                config.checkpoint.data_dir.display()
            );
        }
        latest_checkpoint_for(&config.checkpoint.data_dir, config.size)?
    } else {
        None
    };

    let mut explorer = match latest {
        Some((table_path, manifest)) => {
            Explorer::resume_checkpoint(&config, &solved, &table_path, &manifest)
                .wrap_err_with(|| format!("Cannot resume from {}", table_path.display()))?
        }
        None => {
            if args.resume {
                warn!(
                    "No checkpoint for size {} found in {}, starting from scratch",
                    config.size,
                    config.checkpoint.data_dir.display()
                );
            }
            Explorer::new(&config)?
        }
    };

    let outcome = explorer.run()?;
    let stats = explorer.stats();

    println!("Stopped: {outcome:?}");
    println!("Configurations recorded: {}", stats.completed);
    println!("Repeated children: {}", stats.repeated);
    for (depth, count) in stats.level_sizes.iter().enumerate() {
        println!("  depth {depth:>2}: {count}");
    }

    Ok(())
}

fn inspect(path: &Path) -> color_eyre::Result<()> {
    let table = read_table(path)?;
    let engine = TwistEngine::new(table.size())?;
    let start = encode(&Cube::solved(table.size())?);

    println!("Cube size: {}", table.size());
    println!("Entries: {}", table.len());

    let manifest_path = path.with_extension("json");
    if manifest_path.exists() {
        let manifest = read_manifest(&manifest_path)?;
        println!("Recorded after {} repeats", manifest.repeated);
        println!("Written at unix time {}", manifest.written_at);
    }

    let depths = table
        .depths(&engine, &start)
        .wrap_err("The table does not lead back to the solved cube")?;
    for (depth, count) in depths.values().counts().into_iter().sorted() {
        println!("  depth {depth:>2}: {count}");
    }

    Ok(())
}

fn solve(path: &Path, scramble: &ScrambleArgs) -> color_eyre::Result<()> {
    let table = read_table(path)?;
    let engine = TwistEngine::new(table.size())?;
    let solved = Cube::solved(table.size())?;

    let (cube, actions) = scramble.apply(&engine)?;
    println!("Scramble: {}", describe(&actions));
    println!("{}", render::net(&cube));

    match table.solve(&engine, &cube, &encode(&solved))? {
        Some(moves) => {
            info!(success!("Solved in {} twists"), moves.len());
            println!("Solution: {}", describe(&moves));
        }
        None => println!("This configuration is not in the table"),
    }

    Ok(())
}

fn show(size: usize, scramble: &ScrambleArgs, plain: bool) -> color_eyre::Result<()> {
    let engine = TwistEngine::new(size)?;
    let (cube, actions) = scramble.apply(&engine)?;

    println!("Actions: {}", describe(&actions));
    if plain {
        print!("{cube}");
    } else {
        println!("{}", render::net(&cube));
    }
    println!("Solved: {}", cube.is_complete());

    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Explore(args) => explore(args),
        Commands::Inspect { table } => inspect(&table),
        Commands::Solve { table, scramble } => solve(&table, &scramble),
        Commands::Show {
            size,
            scramble,
            plain,
        } => show(size, &scramble, plain),
    }
}
