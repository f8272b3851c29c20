use std::{
    mem,
    path::{Path, PathBuf},
    time::Instant,
};

use cube_core::{Action, Cube, CubeError, StateKey, TwistEngine, decode, encode};
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    Budget, CheckpointError, Checkpointer, ExploreConfig, LookupTable, Manifest, TableError,
    read_table, start, success, working,
};

#[derive(Error, Debug)]
pub enum ExploreError {
    #[error(transparent)]
    Cube(#[from] CubeError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(
        "The table was built with deep_slices = {table} but this run has deep_slices = {config}"
    )]
    MoveSetMismatch { table: bool, config: bool },
}

/// Counters describing how far exploration has come
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stats {
    /// Configurations recorded in the table
    pub completed: u64,
    /// Children that had already been seen when they were generated
    pub repeated: u64,
    /// Frontier configurations whose children have all been generated
    pub expanded: u64,
    /// Depth of the frontier being expanded
    pub depth: u32,
    /// `level_sizes[d]` is the number of configurations first found `d` twists from the start
    pub level_sizes: Vec<u64>,
}

/// Why [`Explorer::run`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreOutcome {
    /// Every configuration reachable with the action set has been recorded
    Exhausted,
    /// The table reached `Budget::max_states` entries
    StateBudget,
    /// The next frontier to expand lies at `Budget::max_depth`
    DepthBudget,
}

/// Breadth first enumeration of the configurations reachable from a start configuration.
///
/// Every newly seen configuration is recorded in the [`LookupTable`] together with the inverse of
/// the action that produced it, so following the table always leads back towards the start along
/// a shortest path.
pub struct Explorer {
    engine: TwistEngine,
    actions: Vec<Action>,
    start: StateKey,
    table: LookupTable,
    /// Keys at `stats.depth`
    frontier: Vec<StateKey>,
    /// Index of the next frontier configuration to expand
    cursor: usize,
    /// Keys at `stats.depth + 1` found so far
    next_frontier: Vec<StateKey>,
    stats: Stats,
    budget: Budget,
    checkpointer: Option<Checkpointer>,
    final_checkpoint: bool,
    parallel: bool,
    chunk_size: usize,
    progress_interval: u64,
}

/// Every child of the configuration stored under `key`, in action order, paired with the action
/// that produced it
fn children(
    engine: &TwistEngine,
    actions: &[Action],
    key: &StateKey,
) -> Result<Vec<(StateKey, Action)>, CubeError> {
    let cube = decode(engine.size(), key)?;

    actions
        .iter()
        .map(|&action| Ok((encode(&engine.apply(&cube, action)?), action)))
        .collect()
}

impl Explorer {
    /// Explore outward from the solved cube
    ///
    /// # Errors
    ///
    /// Fails if the configured size is not a valid cube size
    pub fn new(config: &ExploreConfig) -> Result<Explorer, ExploreError> {
        let solved = Cube::solved(config.size)?;
        Explorer::from_start(config, &solved)
    }

    /// Explore outward from an arbitrary start configuration
    ///
    /// # Errors
    ///
    /// Fails if the configured size is invalid or does not match `start`
    pub fn from_start(config: &ExploreConfig, start: &Cube) -> Result<Explorer, ExploreError> {
        let mut explorer = Explorer::empty(config, start)?;
        explorer.frontier.push(explorer.start.clone());
        Ok(explorer)
    }

    fn empty(config: &ExploreConfig, start: &Cube) -> Result<Explorer, ExploreError> {
        let engine = TwistEngine::new(config.size)?;

        if start.size() != engine.size() {
            return Err(CubeError::SizeMismatch {
                engine: engine.size(),
                cube: start.size(),
            }
            .into());
        }

        let checkpointer = config.checkpoint.enabled.then(|| {
            Checkpointer::new(
                config.checkpoint.data_dir.clone(),
                config.checkpoint.increment,
                0,
                config.deep_slices,
            )
        });

        Ok(Explorer {
            actions: engine.actions(config.deep_slices),
            engine,
            start: encode(start),
            table: LookupTable::new(config.size),
            frontier: Vec::new(),
            cursor: 0,
            next_frontier: Vec::new(),
            stats: Stats {
                level_sizes: vec![1],
                ..Stats::default()
            },
            budget: config.budget,
            checkpointer,
            final_checkpoint: config.checkpoint.enabled && config.checkpoint.final_checkpoint,
            parallel: config.parallel,
            chunk_size: config.chunk_size.max(1),
            progress_interval: config.progress_interval,
        })
    }

    /// Pick up exploration from a previously built table.
    ///
    /// The depth of every entry is recomputed by following its recorded actions back to `start`.
    /// The level before the deepest one is then expanded again: children that are already in the
    /// table count as repeats and anything the earlier run had not reached yet is added. The
    /// recorded depths therefore stay exact, but the counters differ from an uninterrupted run.
    ///
    /// A table that records inner slice twists is only accepted when `config.deep_slices` is set.
    /// Prefer [`Explorer::resume_checkpoint`] when the manifest is at hand, since it also catches
    /// an outer layer table being resumed with inner slices.
    ///
    /// # Errors
    ///
    /// Fails if the sizes or move sets disagree or if some entry does not lead back to `start`
    pub fn resume(
        config: &ExploreConfig,
        start: &Cube,
        table: LookupTable,
    ) -> Result<Explorer, ExploreError> {
        let mut explorer = Explorer::empty(config, start)?;

        if table.size() != explorer.engine.size() {
            return Err(CubeError::SizeMismatch {
                engine: explorer.engine.size(),
                cube: table.size(),
            }
            .into());
        }

        if !config.deep_slices && table.iter().any(|(_, action)| action.slice() > 0) {
            return Err(ExploreError::MoveSetMismatch {
                table: true,
                config: false,
            });
        }

        let depths = table.depths(&explorer.engine, &explorer.start)?;
        let deepest = depths.values().copied().max().unwrap_or(0);

        let mut levels = vec![Vec::new(); deepest as usize + 1];
        levels[0].push(explorer.start.clone());
        for (key, depth) in depths {
            levels[depth as usize].push(key);
        }
        for level in &mut levels {
            level.sort_unstable();
        }

        explorer.stats.level_sizes = levels.iter().map(|level| level.len() as u64).collect();
        explorer.stats.completed = table.len() as u64;

        if deepest == 0 {
            explorer.frontier = levels.swap_remove(0);
        } else {
            explorer.next_frontier = levels.pop().unwrap_or_default();
            explorer.frontier = levels.pop().unwrap_or_default();
            explorer.stats.depth = deepest - 1;
        }

        explorer.table = table;

        if let Some(checkpointer) = &mut explorer.checkpointer {
            *checkpointer = Checkpointer::new(
                config.checkpoint.data_dir.clone(),
                config.checkpoint.increment,
                explorer.stats.completed,
                config.deep_slices,
            );
        }

        info!(
            success!("Resumed with {} entries, re-expanding {} configurations at depth {}"),
            explorer.stats.completed,
            explorer.frontier.len(),
            explorer.stats.depth
        );

        Ok(explorer)
    }

    /// Pick up exploration from a checkpoint written by an earlier run, after checking that its
    /// manifest describes the same cube size and move set as `config`. See [`Explorer::resume`].
    ///
    /// # Errors
    ///
    /// Fails if the manifest disagrees with `config`, if the table cannot be read, or if
    /// [`Explorer::resume`] rejects it
    pub fn resume_checkpoint(
        config: &ExploreConfig,
        start: &Cube,
        table_path: &Path,
        manifest: &Manifest,
    ) -> Result<Explorer, ExploreError> {
        if manifest.size != config.size {
            return Err(CubeError::SizeMismatch {
                engine: config.size,
                cube: manifest.size,
            }
            .into());
        }

        if manifest.deep_slices != config.deep_slices {
            return Err(ExploreError::MoveSetMismatch {
                table: manifest.deep_slices,
                config: config.deep_slices,
            });
        }

        info!(start!("Loading {}..."), table_path.display());
        let table = read_table(table_path)?;

        Explorer::resume(config, start, table)
    }

    #[must_use]
    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    #[must_use]
    pub fn into_table(self) -> LookupTable {
        self.table
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[must_use]
    pub fn engine(&self) -> &TwistEngine {
        &self.engine
    }

    #[must_use]
    pub fn start_key(&self) -> &StateKey {
        &self.start
    }

    /// The actions every configuration is expanded with, in expansion order
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    fn is_visited(&self, key: &StateKey) -> bool {
        key == &self.start || self.table.contains(key)
    }

    fn state_budget_reached(&self) -> bool {
        self.budget
            .max_states
            .is_some_and(|max| self.stats.completed >= max)
    }

    /// Record the children of one frontier configuration. Returns `false` if the state budget ran
    /// out before all of them were looked at.
    fn record(&mut self, children: Vec<(StateKey, Action)>) -> bool {
        let child_depth = self.stats.depth as usize + 1;

        for (key, action) in children {
            if self.state_budget_reached() {
                return false;
            }

            if self.is_visited(&key) {
                self.stats.repeated += 1;
                continue;
            }

            self.table.insert_first(key.clone(), action.inverse());
            self.next_frontier.push(key);
            self.stats.completed += 1;

            if self.stats.level_sizes.len() <= child_depth {
                self.stats.level_sizes.resize(child_depth + 1, 0);
            }
            self.stats.level_sizes[child_depth] += 1;
        }

        true
    }

    /// Bookkeeping after a frontier configuration has been handled
    fn finish_parent(&mut self, fully_expanded: bool) -> Result<(), ExploreError> {
        if fully_expanded {
            self.cursor += 1;
            self.stats.expanded += 1;

            if self.progress_interval > 0 && self.stats.expanded % self.progress_interval == 0 {
                info!(
                    working!("Expanded {} configurations at depth {}: {} recorded, {} repeated"),
                    self.stats.expanded, self.stats.depth, self.stats.completed, self.stats.repeated
                );
            }
        }

        if let Some(checkpointer) = &mut self.checkpointer {
            checkpointer.poll(&self.table, &self.stats)?;
        }

        Ok(())
    }

    fn expand_sequential(&mut self) -> Result<(), ExploreError> {
        let children = children(&self.engine, &self.actions, &self.frontier[self.cursor])?;
        let done = self.record(children);
        self.finish_parent(done)
    }

    fn expand_parallel(&mut self) -> Result<(), ExploreError> {
        let end = (self.cursor + self.chunk_size).min(self.frontier.len());

        let batch = self.frontier[self.cursor..end]
            .par_iter()
            .map(|key| children(&self.engine, &self.actions, key))
            .collect::<Result<Vec<_>, _>>()?;

        for generated in batch {
            let done = self.record(generated);
            self.finish_parent(done)?;

            if !done {
                break;
            }
        }

        Ok(())
    }

    /// Move to the next level. Returns `false` if there is none.
    fn advance_level(&mut self) -> bool {
        if self.next_frontier.is_empty() {
            return false;
        }

        info!(
            success!("Finished depth {}: {} configurations at depth {}"),
            self.stats.depth,
            self.next_frontier.len(),
            self.stats.depth + 1
        );

        self.frontier = mem::take(&mut self.next_frontier);
        self.cursor = 0;
        self.stats.depth += 1;

        true
    }

    fn finish(&mut self, outcome: ExploreOutcome) -> Result<ExploreOutcome, ExploreError> {
        if self.final_checkpoint {
            self.checkpoint_now()?;
        }

        Ok(outcome)
    }

    /// Explore until the budget runs out or nothing new can be reached.
    ///
    /// Returns early with an error if a checkpoint cannot be written. The explorer is left in a
    /// consistent state, so calling `run` again continues where it stopped and retries the write.
    ///
    /// # Errors
    ///
    /// Fails if a checkpoint cannot be written or a frontier key is corrupt
    pub fn run(&mut self) -> Result<ExploreOutcome, ExploreError> {
        info!(
            start!("Exploring a cube of size {} with {} actions per configuration..."),
            self.engine.size(),
            self.actions.len()
        );
        let started = Instant::now();

        let outcome = loop {
            if self.state_budget_reached() {
                break ExploreOutcome::StateBudget;
            }

            if self.cursor >= self.frontier.len() {
                if self.advance_level() {
                    continue;
                }
                break ExploreOutcome::Exhausted;
            }

            if self
                .budget
                .max_depth
                .is_some_and(|max| self.stats.depth >= max)
            {
                break ExploreOutcome::DepthBudget;
            }

            if self.parallel {
                self.expand_parallel()?;
            } else {
                self.expand_sequential()?;
            }
        };

        info!(
            success!("Stopped ({:?}) after {:.3}s with {} entries, {} repeats, level sizes {}"),
            outcome,
            started.elapsed().as_secs_f64(),
            self.stats.completed,
            self.stats.repeated,
            self.stats.level_sizes.iter().join(" ")
        );

        self.finish(outcome)
    }

    /// Write a checkpoint immediately, whatever the threshold says. Does nothing if checkpointing
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Fails if the checkpoint cannot be written
    pub fn checkpoint_now(&mut self) -> Result<Option<PathBuf>, ExploreError> {
        let Some(checkpointer) = &mut self.checkpointer else {
            debug!("Checkpointing is disabled");
            return Ok(None);
        };

        Ok(Some(checkpointer.write(&self.table, &self.stats)?))
    }
}
