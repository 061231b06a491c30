// src/core/iterate.rs — Nested iteration controller
//
// Levels run like nested loops. A round at level d runs the level's
// pre_iterate hooks, converges every deeper level (or solves, at the
// deepest), then runs the post_iterate hooks. The level repeats until a
// round converges or the round cap is hit.

use std::path::Path;

use crate::infra::errors::SwitchgearError;
use crate::model::instance::ModelInstance;
use crate::modules::extension::Vote;
use crate::modules::loader::ModuleSet;
use crate::util;

/// Default limit on the number of iteration levels.
pub const MAX_ITERATION_DEPTH: usize = 8;

/// What an iteration hook sees.
pub struct IterationContext<'a> {
    pub level: usize,
    pub round: u32,
    pub instance: &'a mut ModelInstance,
}

/// Module names per iteration level, outermost level first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationPlan {
    pub levels: Vec<Vec<String>>,
}

impl IterationPlan {
    /// One level per non-comment line; names separated by spaces, tabs or
    /// commas.
    pub fn parse(content: &str) -> Self {
        let levels = util::list_lines(content)
            .into_iter()
            .map(|line| {
                line.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|level| !level.is_empty())
            .collect();
        Self { levels }
    }

    /// Read an iteration list. A missing default file means no iteration;
    /// a missing explicit file is an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, SwitchgearError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SwitchgearError::config(
                format!("Iteration list {} not found", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Resolve names to module-set positions. Every named module must be
    /// loaded and the plan may not exceed `max_depth` levels.
    pub fn bind(&self, modules: &ModuleSet, max_depth: usize) -> Result<Vec<Vec<usize>>, SwitchgearError> {
        if self.depth() > max_depth {
            return Err(SwitchgearError::IterationTooDeep {
                depth: self.depth(),
                max: max_depth,
            });
        }
        self.levels
            .iter()
            .enumerate()
            .map(|(level, names)| {
                names
                    .iter()
                    .map(|name| {
                        modules.index_of(name).ok_or_else(|| {
                            SwitchgearError::IterationModuleNotLoaded {
                                level,
                                module: name.clone(),
                            }
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// How one run of one level ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub level: usize,
    /// Node of the enclosing levels when this level ran.
    pub parent_node: Vec<u32>,
    pub rounds: u32,
    pub converged: bool,
}

/// Drives the nested levels around a solve step.
pub struct IterationController {
    levels: Vec<Vec<usize>>,
    max_iter: Option<u32>,
    reports: Vec<LevelReport>,
}

impl IterationController {
    pub fn new(levels: Vec<Vec<usize>>, max_iter: Option<u32>) -> Self {
        Self {
            levels,
            max_iter,
            reports: Vec::new(),
        }
    }

    /// Per-level results, in completion order (innermost first).
    pub fn reports(&self) -> &[LevelReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<LevelReport> {
        self.reports
    }

    /// Run every level to convergence. `solve` is called once per
    /// innermost round; with no levels it is called exactly once.
    pub fn run<F>(
        &mut self,
        modules: &mut ModuleSet,
        instance: &mut ModelInstance,
        solve: &mut F,
    ) -> Result<(), SwitchgearError>
    where
        F: FnMut(&mut ModelInstance) -> Result<(), SwitchgearError>,
    {
        instance.iteration_node.clear();
        self.iterate(0, modules, instance, solve)
    }

    fn iterate<F>(
        &mut self,
        depth: usize,
        modules: &mut ModuleSet,
        instance: &mut ModelInstance,
        solve: &mut F,
    ) -> Result<(), SwitchgearError>
    where
        F: FnMut(&mut ModelInstance) -> Result<(), SwitchgearError>,
    {
        if depth == self.levels.len() {
            return solve(instance);
        }

        let level_modules = self.levels[depth].clone();
        let mut round: u32 = 0;
        let mut converged = false;

        while !converged {
            if self.max_iter.is_some_and(|cap| round >= cap) {
                break;
            }

            enter_round(instance, depth, round);
            converged = true;
            for &index in &level_modules {
                converged = Vote::fold(
                    converged,
                    run_hook(modules, index, depth, round, instance, HookKind::Pre)?,
                );
            }

            self.iterate(depth + 1, modules, instance, solve)?;

            // Deeper levels moved the node; put this level's position back.
            enter_round(instance, depth, round);
            for &index in &level_modules {
                converged = Vote::fold(
                    converged,
                    run_hook(modules, index, depth, round, instance, HookKind::Post)?,
                );
            }

            round += 1;
        }

        let names = level_modules
            .iter()
            .filter_map(|&i| modules.descriptors().get(i).map(|d| d.name.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        if converged {
            tracing::info!(
                "Iteration of {} completed after {} rounds",
                names,
                round
            );
        } else {
            tracing::warn!(
                "Iteration of {} was stopped after {} rounds without convergence",
                names,
                round
            );
        }

        instance.iteration_node.truncate(depth);
        self.reports.push(LevelReport {
            level: depth,
            parent_node: instance.iteration_node.clone(),
            rounds: round,
            converged,
        });
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum HookKind {
    Pre,
    Post,
}

fn enter_round(instance: &mut ModelInstance, depth: usize, round: u32) {
    instance.iteration_node.truncate(depth);
    instance.iteration_node.push(round);
    instance.iteration_number = round;
}

fn run_hook(
    modules: &mut ModuleSet,
    index: usize,
    level: usize,
    round: u32,
    instance: &mut ModelInstance,
    kind: HookKind,
) -> Result<Vote, SwitchgearError> {
    let Some(module) = modules.get_mut(index) else {
        return Ok(Vote::Abstain);
    };
    let mut ctx = IterationContext {
        level,
        round,
        instance,
    };
    match kind {
        HookKind::Pre => module.pre_iterate(&mut ctx),
        HookKind::Post => module.post_iterate(&mut ctx),
    }
}
