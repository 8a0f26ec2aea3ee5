//! Genetic search over strategies
//!
//! Each generation pools fresh random strategies with clones, mutants and
//! merges of the previous generation's best. Every candidate is scored by
//! averaging its group's fitness over independent matches; the trials of one
//! candidate run in parallel, each with its own pre-drawn seed.

use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::meta::CharacterTemplate;
use super::policy::Strategy;
use super::table::StrategyTable;
use crate::context::Dice;
use crate::core::config::StrategyConfig;
use crate::core::error::{Result, SimError};
use crate::encounter::{match_root, MatchCharacter, MatchContext, MatchObserver, MatchSummary};
use crate::rules::{Environment, MatchSetup, Scenario};

/// Result of one `optimize` call
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    /// Strategy now live for the group
    pub strategy: Strategy,
    pub generations: usize,
    pub best_fitness: f64,
    /// Best fitness of each generation, in order
    pub history: Vec<f64>,
    /// False when the generation cap stopped the search
    pub converged: bool,
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Optimized {} over {} generations: best fitness {}",
            self.strategy.name, self.generations, self.best_fitness
        )?;
        if !self.converged {
            write!(f, " (stopped at generation cap)")?;
        }
        Ok(())
    }
}

pub struct StrategyManager {
    environment: Environment,
    game: String,
    setup: MatchSetup,
    config: StrategyConfig,
    templates: Vec<CharacterTemplate>,
    strategies: StrategyTable,
    rng: ChaCha8Rng,
}

impl StrategyManager {
    /// Validate the inputs, read every participant's group and skills, and
    /// seed one random strategy per group
    pub fn new(
        environment: Environment,
        game: impl Into<String>,
        setup: MatchSetup,
        config: StrategyConfig,
    ) -> Result<Self> {
        let game = game.into();
        config.validate().map_err(SimError::InvalidConfig)?;
        if setup.characters.is_empty() {
            return Err(SimError::InvalidConfig(format!("game {} has no characters", game)));
        }
        for definition in &setup.characters {
            environment.validate_character(definition)?;
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut strategies = StrategyTable::new(config.strategy_grouping.clone());
        let root = match_root(&game, &setup);
        let mut dice = Dice::new(ChaCha8Rng::seed_from_u64(rng.gen()));

        let mut templates = Vec::with_capacity(setup.characters.len());
        for (definition, instance) in setup.instances() {
            let character = MatchCharacter::build(&environment, &definition, &instance, &root, &mut dice)?;
            let group = strategies.group_of(&character.context, &mut dice)?;
            templates.push(CharacterTemplate {
                name: character.name.clone(),
                group,
                skills: character.skill_names(),
            });
        }

        for template in &templates {
            if !strategies.contains(&template.group) {
                let strategy = Strategy::random(&mut rng, &templates, &template.group);
                strategies.insert(strategy);
            }
        }

        tracing::info!(
            "Strategy manager for {}: {} characters in groups {:?}",
            game,
            templates.len(),
            strategies.names()
        );

        Ok(Self {
            environment,
            game,
            setup,
            config,
            templates,
            strategies,
            rng,
        })
    }

    /// Manager for the scenario's selected game
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        let (game, setup) = scenario.selected_game()?;
        Self::new(
            scenario.environment.clone(),
            game,
            setup.clone(),
            scenario.strategy.clone(),
        )
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn templates(&self) -> &[CharacterTemplate] {
        &self.templates
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn game(&self) -> &str {
        &self.game
    }

    pub fn setup(&self) -> &MatchSetup {
        &self.setup
    }

    pub fn get_strategy(&self, character: &MatchCharacter) -> Result<&Strategy> {
        self.strategies.get(&character.group)
    }

    /// Evolve the strategy of one group until a generation fails to improve
    /// on the previous best by more than the configured threshold.
    ///
    /// The overall best replaces the live strategy once the search ends.
    pub fn optimize(&mut self, group: &str) -> Result<OptimizationReport> {
        if !self.strategies.contains(group) {
            return Err(SimError::UnknownStrategy(group.to_string()));
        }
        tracing::info!("Optimizing strategy for {}", group);

        let threshold = self.config.fitness_improvement_threshold;
        let mut retained: Vec<Strategy> = Vec::new();
        let mut best: Option<Strategy> = None;
        let mut history = Vec::new();
        let mut converged = false;

        while history.len() < self.config.max_generations {
            let mut candidates: Vec<Strategy> = (0..self.config.novel_strategy_count)
                .map(|_| Strategy::random(&mut self.rng, &self.templates, group))
                .collect();
            candidates.append(&mut retained);

            self.evaluate(&mut candidates)?;
            candidates.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

            let Some(leader) = candidates.first() else {
                break;
            };
            let generation_best = leader.fitness;
            history.push(generation_best);
            tracing::info!(
                "Generation {} for {}: best {} from {} candidates",
                history.len(),
                group,
                generation_best,
                candidates.len()
            );

            let last = best.as_ref().map(|strategy| strategy.fitness);
            if last.map_or(true, |last| generation_best > last) {
                best = Some(leader.clone());
            }
            if let Some(last) = last {
                if generation_best <= last * (1.0 + threshold) {
                    converged = true;
                    break;
                }
            }

            retained = self.next_generation(&candidates);
        }

        if !converged {
            tracing::warn!(
                "Optimizing {} stopped at the cap of {} generations",
                group,
                self.config.max_generations
            );
        }

        let strategy = match best {
            Some(strategy) => strategy,
            None => self.strategies.get(group)?.clone(),
        };
        tracing::info!(
            "Strategy {} ({}) is now live for {} with fitness {}",
            strategy.id.short(),
            strategy.nodes.len(),
            group,
            strategy.fitness
        );
        self.strategies.insert(strategy.clone());

        Ok(OptimizationReport {
            best_fitness: strategy.fitness,
            strategy,
            generations: history.len(),
            history,
            converged,
        })
    }

    /// Play one match with the live strategies
    pub fn step(&mut self, observer: &mut dyn MatchObserver) -> Result<MatchSummary> {
        let seed = self.rng.gen();
        let mut game = MatchContext::new(
            &self.environment,
            &self.game,
            &self.setup,
            &self.strategies,
            &self.config,
            seed,
        )?;
        game.simulate(observer)
    }

    /// Score every candidate by its average fitness over independent matches
    fn evaluate(&mut self, candidates: &mut [Strategy]) -> Result<()> {
        let simulations = self.config.simulations_per_generation;
        let seeds: Vec<Vec<u64>> = candidates
            .iter()
            .map(|_| (0..simulations).map(|_| self.rng.gen()).collect())
            .collect();

        let Self {
            environment,
            game,
            setup,
            config,
            strategies,
            ..
        } = &*self;

        for (candidate, seeds) in candidates.iter_mut().zip(seeds) {
            let table = strategies.with_candidate(candidate);
            let group = candidate.name.clone();

            let scores = seeds
                .par_iter()
                .map(|&seed| -> Result<f64> {
                    let mut trial = MatchContext::new(environment, game, setup, &table, config, seed)?;
                    trial.simulate(&mut ())?;
                    Ok(trial.fitness(&group))
                })
                .collect::<Result<Vec<f64>>>()?;

            let average = scores.iter().sum::<f64>() / scores.len() as f64;
            tracing::debug!(
                "Strategy {} for {} averaged {} over {} matches",
                candidate.id.short(),
                group,
                average,
                scores.len()
            );
            candidate.set_fitness(average);
        }
        Ok(())
    }

    /// Clone, mutate and merge pools drawn from a generation sorted best first
    fn next_generation(&mut self, ranked: &[Strategy]) -> Vec<Strategy> {
        let config = &self.config;
        let mut next = trim(ranked, config.cloned_strategy_count);

        for parent in trim(ranked, config.mutated_strategy_count) {
            next.push(parent.mutate(
                &mut self.rng,
                &self.templates,
                config.mutation_mode,
                config.mutation_coefficient,
            ));
        }

        let mut mergeable = trim(ranked, config.merged_strategy_count);
        mergeable.shuffle(&mut self.rng);
        for pair in mergeable.chunks_exact(2) {
            next.push(pair[0].merge(&pair[1], config.max_strategy_complexity));
        }

        next
    }
}

/// The `count` fittest of a list sorted best first
fn trim(ranked: &[Strategy], count: usize) -> Vec<Strategy> {
    ranked.iter().take(count).cloned().collect()
}
