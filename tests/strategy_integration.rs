//! Integration tests for the strategy optimizer

use serde_json::json;

use skirmish_lab::core::error::SimError;
use skirmish_lab::encounter::{MatchAction, MatchCharacter, MatchObserver};
use skirmish_lab::rules::{parse_scenario, Scenario};
use skirmish_lab::strategy::{Strategy, StrategyManager};

/// No dice anywhere: a strategy always earns the same fitness
fn standoff(threshold: f64) -> Scenario {
    let doc = json!({
        "characters": {
            "knight": {
                "alignment": "good",
                "initiative": 15,
                "skills": ["slash", "guard"],
                "resources": ["hit_points"]
            },
            "orc": {
                "alignment": "evil",
                "initiative": 10,
                "skills": ["slash"],
                "resources": ["hit_points"]
            }
        },
        "skills": {
            "slash": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "effects": [
                        { "profile": "damage", "value": 1 },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            },
            "guard": {
                "trigger": { "effects": [{ "profile": "end-turn" }] }
            }
        },
        "resources": {
            "hit_points": { "initial": 3, "max_quantity": 3, "compulsory": true, "value": 1 }
        },
        "games": {
            "standoff": { "characters": ["knight", "orc"] }
        },
        "strategy": {
            "maximum_turns": 5,
            "simulations_per_generation": 3,
            "novel_strategy_count": 5,
            "cloned_strategy_count": 2,
            "mutated_strategy_count": 2,
            "merged_strategy_count": 2,
            "fitness_improvement_threshold": threshold,
            "max_generations": 50,
            "seed": 7
        }
    });
    parse_scenario(&doc.to_string()).unwrap()
}

#[test]
fn test_zero_threshold_stops_at_first_stall() {
    let scenario = standoff(0.0);
    let mut manager = StrategyManager::from_scenario(&scenario).unwrap();

    let report = manager.optimize("good").unwrap();

    assert!(report.converged);
    let history = &report.history;
    assert!(history.len() >= 2);
    let (last, earlier) = history.split_last().unwrap();
    for i in 1..earlier.len() {
        let previous_best = earlier[..i].iter().cloned().fold(f64::MIN, f64::max);
        assert!(earlier[i] > previous_best, "generation {} did not improve", i + 1);
    }
    let best_before_last = earlier.iter().cloned().fold(f64::MIN, f64::max);
    assert!(*last <= best_before_last);
    assert_eq!(report.best_fitness, best_before_last);
}

#[test]
fn test_optimized_strategy_goes_live() {
    let scenario = standoff(0.05);
    let mut manager = StrategyManager::from_scenario(&scenario).unwrap();
    let before = manager.strategies().get("evil").unwrap().clone();

    let report = manager.optimize("evil").unwrap();

    assert_eq!(manager.strategies().get("evil").unwrap(), &report.strategy);
    assert!(report.best_fitness >= 0.0 && report.best_fitness <= 3.0);
    // the other group is untouched
    assert_eq!(manager.strategies().len(), 2);
    assert_ne!(before.id, report.strategy.id);
}

#[test]
fn test_same_seed_same_report() {
    let scenario = standoff(0.0);
    let a = StrategyManager::from_scenario(&scenario)
        .unwrap()
        .optimize("good")
        .unwrap();
    let b = StrategyManager::from_scenario(&scenario)
        .unwrap()
        .optimize("good")
        .unwrap();

    assert_eq!(a.history, b.history);
    assert_eq!(a.strategy.nodes, b.strategy.nodes);
}

#[derive(Default)]
struct Choices {
    count: usize,
    strategies: Vec<String>,
}

impl MatchObserver for Choices {
    fn on_action(
        &mut self,
        actor: &MatchCharacter,
        strategy: &Strategy,
        candidates: &[MatchAction],
        chosen: &MatchAction,
    ) {
        assert_eq!(chosen.actor_name, actor.name);
        assert!(candidates.iter().any(|c| c.to_string() == chosen.to_string()));
        self.count += 1;
        self.strategies.push(strategy.name.clone());
    }
}

#[test]
fn test_step_uses_each_groups_strategy() {
    let scenario = standoff(0.05);
    let mut manager = StrategyManager::from_scenario(&scenario).unwrap();
    let mut choices = Choices::default();

    let summary = manager.step(&mut choices).unwrap();

    assert_eq!(choices.count, summary.actions_taken);
    assert_eq!(choices.strategies[0], "good");
    assert!(choices.strategies.iter().any(|name| name == "evil"));
}

#[test]
fn test_unknown_group_is_an_error() {
    let scenario = standoff(0.05);
    let mut manager = StrategyManager::from_scenario(&scenario).unwrap();

    assert!(matches!(
        manager.optimize("pirates"),
        Err(SimError::UnknownStrategy(name)) if name == "pirates"
    ));
}
