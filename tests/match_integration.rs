//! Integration tests for whole matches built from scenario documents

use serde_json::json;

use skirmish_lab::core::config::StrategyConfig;
use skirmish_lab::core::types::Turn;
use skirmish_lab::encounter::{
    MatchCharacter, MatchContext, MatchObserver, MatchSummary, ATTACK, DAMAGE, HIT_POINTS,
};
use skirmish_lab::rules::{parse_scenario, Environment, MatchSetup, Scenario};
use skirmish_lab::strategy::{Strategy, StrategyTable};

fn duel_scenario() -> Scenario {
    let doc = json!({
        "characters": {
            "paladin": {
                "alignment": "good",
                "position": [0, 0],
                "skills": ["attack"],
                "resources": ["hit_points"]
            },
            "brigand": {
                "alignment": "evil",
                "position": [1, 0],
                "skills": ["attack"],
                "resources": ["hit_points"]
            }
        },
        "skills": {
            "attack": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "effects": [
                        { "profile": "attack", "type": "slashing", "hit_conditions": [true], "damage": 1 },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            }
        },
        "resources": {
            "hit_points": { "initial": 1, "max_quantity": 1, "compulsory": true, "value": 3 }
        },
        "games": {
            "duel": { "board_width": 2, "board_height": 1, "characters": ["paladin", "brigand"] }
        },
        "strategy": { "maximum_turns": 10 }
    });
    parse_scenario(&doc.to_string()).unwrap()
}

fn live_table() -> StrategyTable {
    let mut table = StrategyTable::new(json!({ "context": "alignment" }));
    table.insert(Strategy::new("good", vec![]));
    table.insert(Strategy::new("evil", vec![]));
    table
}

#[test]
fn test_one_hit_duel() {
    let scenario = duel_scenario();
    let (game, setup) = scenario.selected_game().unwrap();
    let table = live_table();

    for seed in 0..20 {
        let mut duel =
            MatchContext::new(&scenario.environment, game, setup, &table, &scenario.strategy, seed)
                .unwrap();
        let summary = duel.simulate(&mut ()).unwrap();

        assert!(summary.turn <= 2);
        assert_eq!(summary.actions_taken, 1);
        assert_eq!(summary.in_play.len(), 1);

        let winner = duel.character(&summary.in_play[0]).unwrap();
        assert_eq!(winner.resources.quantity(HIT_POINTS).unwrap(), 1.0);
        assert_eq!(summary.fitness[&winner.group], 3.0);
        assert_eq!(summary.fitness.values().sum::<f64>(), 3.0);
        assert_eq!(duel.characters().iter().filter(|c| !c.in_play()).count(), 1);
    }
}

#[test]
fn test_single_alignment_never_starts() {
    let mut scenario = duel_scenario();
    scenario
        .environment
        .characters
        .get_mut("brigand")
        .unwrap()
        .insert("alignment".into(), json!("good"));
    let (game, setup) = scenario.selected_game().unwrap();
    let table = live_table();

    let mut duel =
        MatchContext::new(&scenario.environment, game, setup, &table, &scenario.strategy, 4).unwrap();
    let summary = duel.simulate(&mut ()).unwrap();

    assert_eq!(summary.turn, 0);
    assert_eq!(summary.actions_taken, 0);
    assert_eq!(summary.in_play, vec!["paladin", "brigand"]);
}

#[test]
fn test_zero_turn_limit_takes_no_actions() {
    let scenario = duel_scenario();
    let (game, setup) = scenario.selected_game().unwrap();
    let table = live_table();
    let config = StrategyConfig {
        maximum_turns: 0,
        ..scenario.strategy.clone()
    };

    let mut duel = MatchContext::new(&scenario.environment, game, setup, &table, &config, 4).unwrap();
    let summary = duel.simulate(&mut ()).unwrap();

    assert_eq!(summary.actions_taken, 0);
    assert_eq!(summary.in_play.len(), 2);
}

#[test]
fn test_same_seed_same_match() {
    let scenario = duel_scenario();
    let (game, setup) = scenario.selected_game().unwrap();
    let table = live_table();

    let play = |seed: u64| {
        let mut duel =
            MatchContext::new(&scenario.environment, game, setup, &table, &scenario.strategy, seed)
                .unwrap();
        let summary = duel.simulate(&mut ()).unwrap();
        let initiatives: Vec<f64> = duel.characters().iter().map(|c| c.initiative).collect();
        (summary, initiatives)
    };

    assert_eq!(play(42), play(42));
}

#[derive(Default)]
struct TurnOrder(Vec<(Turn, String)>);

impl MatchObserver for TurnOrder {
    fn on_character(&mut self, character: &MatchCharacter, turn: Turn) {
        self.0.push((turn, character.name.clone()));
    }
}

#[test]
fn test_initiative_order_with_ties() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "scout": { "alignment": "good", "initiative": 12, "skills": ["wait"] },
            "captain": { "alignment": "evil", "initiative": 18, "skills": ["wait"] },
            "squire": { "alignment": "good", "initiative": 12, "skills": ["wait"] },
            "porter": { "alignment": "evil", "initiative": 4, "skills": ["wait"] }
        },
        "skills": {
            "wait": { "trigger": { "effects": [{ "profile": "end-turn" }] } }
        }
    }))
    .unwrap();
    let setup = MatchSetup::new(["scout", "captain", "squire", "porter"]);
    let config = StrategyConfig {
        maximum_turns: 2,
        ..StrategyConfig::default()
    };
    let table = live_table();

    let mut game = MatchContext::new(&environment, "muster", &setup, &table, &config, 0).unwrap();
    let mut order = TurnOrder::default();
    let summary = game.simulate(&mut order).unwrap();

    let round = ["captain", "scout", "squire", "porter"];
    let expected: Vec<(Turn, String)> = [1, 2]
        .iter()
        .flat_map(|&turn| round.iter().map(move |name| (turn, name.to_string())))
        .collect();
    assert_eq!(order.0, expected);
    assert_eq!(summary.turn, 3);
    assert_eq!(summary.actions_taken, 8);
}

#[test]
fn test_effects_can_target_the_actor() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "vampire": {
                "alignment": "evil",
                "initiative": 20,
                "skills": ["drain"],
                "resources": ["hit_points"]
            },
            "peasant": {
                "alignment": "good",
                "initiative": 1,
                "skills": [],
                "resources": ["hit_points"]
            }
        },
        "skills": {
            "drain": {
                "targeting": { "profile": "single-target" },
                "potency": 2,
                "trigger": {
                    "conditions": [{ "is-in-play": null }],
                    "success_effects": [
                        { "profile": "damage", "value": { "context": "potency" } },
                        { "profile": "credit", "target": "actor", "arguments": ["hit_points", { "context": "potency" }] }
                    ],
                    "effects": [{ "profile": "end-turn", "target": "actor" }]
                }
            }
        },
        "resources": {
            "hit_points": { "initial": 5, "max_quantity": 10, "compulsory": true, "value": 1 }
        }
    }))
    .unwrap();
    let setup = MatchSetup::new(["vampire", "peasant"]);
    let config = StrategyConfig {
        maximum_turns: 1,
        ..StrategyConfig::default()
    };
    let table = live_table();

    let mut game = MatchContext::new(&environment, "night", &setup, &table, &config, 0).unwrap();
    let summary = game.simulate(&mut ()).unwrap();

    // vampire drains once, the peasant abstains
    assert_eq!(summary.actions_taken, 2);
    assert_eq!(game.character("vampire").unwrap().resources.quantity(HIT_POINTS).unwrap(), 7.0);
    assert_eq!(game.character("peasant").unwrap().resources.quantity(HIT_POINTS).unwrap(), 3.0);
    assert_eq!(summary.fitness["evil"], 7.0);
}

/// Play one match with rule-free strategies, keeping the final characters
fn play_out(
    environment: &Environment,
    characters: &[&str],
    maximum_turns: Turn,
) -> (MatchSummary, Vec<MatchCharacter>) {
    let setup = MatchSetup::new(characters.iter().copied());
    let config = StrategyConfig {
        maximum_turns,
        ..StrategyConfig::default()
    };
    let table = live_table();

    let mut game = MatchContext::new(environment, "arena", &setup, &table, &config, 0).unwrap();
    let summary = game.simulate(&mut ()).unwrap();
    (summary, game.characters().to_vec())
}

fn quantity(characters: &[MatchCharacter], name: &str, resource: &str) -> f64 {
    characters
        .iter()
        .find(|c| c.name == name)
        .unwrap()
        .resources
        .quantity(resource)
        .unwrap()
}

#[test]
fn test_failed_conditions_run_failure_then_common_effects() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "rogue": {
                "alignment": "good",
                "initiative": 20,
                "skills": ["feint"],
                "resources": ["hit_points", "marks"]
            },
            "dummy": {
                "alignment": "evil",
                "initiative": 1,
                "skills": [],
                "resources": ["hit_points", "marks"]
            }
        },
        "skills": {
            "feint": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "conditions": [{ "greater": [1, 2] }],
                    "success_effects": [{ "profile": "damage", "value": 4 }],
                    "failure_effects": [{ "profile": "credit", "arguments": ["marks", 1] }],
                    "effects": [
                        { "profile": "credit", "target": "actor", "arguments": ["marks", 10] },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            }
        },
        "resources": {
            "hit_points": { "initial": 5, "max_quantity": 10, "compulsory": true, "value": 1 },
            "marks": { "initial": 0 }
        }
    }))
    .unwrap();

    let (summary, characters) = play_out(&environment, &["rogue", "dummy"], 1);

    assert_eq!(summary.actions_taken, 2);
    assert_eq!(quantity(&characters, "dummy", HIT_POINTS), 5.0);
    assert_eq!(quantity(&characters, "dummy", "marks"), 1.0);
    assert_eq!(quantity(&characters, "rogue", "marks"), 10.0);
}

#[test]
fn test_damage_hooks_see_the_damage_dealt() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "bruiser": {
                "alignment": "good",
                "initiative": 20,
                "skills": ["maul"],
                "abilities": ["bloodlust"],
                "resources": ["hit_points", "rage"]
            },
            "victim": {
                "alignment": "evil",
                "initiative": 1,
                "skills": [],
                "abilities": ["wince"],
                "resources": ["hit_points", "pain"]
            }
        },
        "skills": {
            "maul": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "effects": [
                        { "profile": "damage", "value": 3, "type": "bludgeoning" },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            }
        },
        "abilities": {
            "bloodlust": {
                "hook": "damage_done",
                "trigger": {
                    "effects": [{
                        "profile": "credit",
                        "arguments": ["rage", { "get": [{ "context": "damage" }, "amount"] }]
                    }]
                }
            },
            "wince": {
                "hook": "damage_taken",
                "trigger": {
                    "conditions": [{ "contains": [{ "get": [{ "context": "damage" }, "type"] }, "bludgeon"] }],
                    "success_effects": [{
                        "profile": "credit",
                        "arguments": ["pain", { "get": [{ "context": "damage" }, "amount"] }]
                    }]
                }
            }
        },
        "resources": {
            "hit_points": { "initial": 10, "max_quantity": 10, "compulsory": true, "value": 1 },
            "rage": { "initial": 0 },
            "pain": { "initial": 0 }
        }
    }))
    .unwrap();

    let (_, characters) = play_out(&environment, &["bruiser", "victim"], 1);

    assert_eq!(quantity(&characters, "victim", HIT_POINTS), 7.0);
    assert_eq!(quantity(&characters, "victim", "pain"), 3.0);
    assert_eq!(quantity(&characters, "bruiser", "rage"), 3.0);
    assert!(characters.iter().all(|c| c.context.get_temp(DAMAGE).is_none()));
}

#[test]
fn test_attack_metrics_reach_hit_conditions() {
    let attack_value = |key: &str| json!({ "get": [{ "context": "attack" }, key] });
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "archer": {
                "alignment": "good",
                "initiative": 20,
                "skills": ["shoot"],
                "resources": ["hit_points"]
            },
            "bandit": {
                "alignment": "evil",
                "initiative": 1,
                "skills": [],
                "resources": ["hit_points"]
            }
        },
        "skills": {
            "shoot": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "effects": [
                        {
                            "profile": "attack",
                            "type": "piercing",
                            "hit_metric": 15,
                            "save_metric": 12,
                            "hit_conditions": [
                                { "greater": [attack_value("hit_metric"), attack_value("save_metric")] },
                                { "contains": [attack_value("type"), "pierc"] }
                            ],
                            "damage": { "subtract": [attack_value("hit_metric"), attack_value("save_metric")] }
                        },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            }
        },
        "resources": {
            "hit_points": { "initial": 10, "max_quantity": 10, "compulsory": true, "value": 1 }
        }
    }))
    .unwrap();

    let (_, characters) = play_out(&environment, &["archer", "bandit"], 1);

    assert_eq!(quantity(&characters, "bandit", HIT_POINTS), 7.0);
    assert!(characters.iter().all(|c| c.context.get_temp(ATTACK).is_none()));
}

#[test]
fn test_end_of_turn_hook_fires_when_turn_ends() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "sentinel": {
                "alignment": "good",
                "initiative": 20,
                "skills": ["wait"],
                "abilities": ["vigil"],
                "resources": ["hit_points", "watch"]
            },
            "dummy": {
                "alignment": "evil",
                "initiative": 1,
                "skills": [],
                "resources": ["hit_points", "watch"]
            }
        },
        "skills": {
            "wait": { "trigger": { "effects": [{ "profile": "end-turn" }] } }
        },
        "abilities": {
            "vigil": {
                "hook": "end_of_turn",
                "trigger": { "effects": [{ "profile": "credit", "arguments": ["watch", 1] }] }
            }
        },
        "resources": {
            "hit_points": { "initial": 5, "max_quantity": 10, "compulsory": true, "value": 1 },
            "watch": { "initial": 0 }
        }
    }))
    .unwrap();

    let (summary, characters) = play_out(&environment, &["sentinel", "dummy"], 2);

    // the third turn starts but never ends
    assert_eq!(summary.turn, 3);
    assert_eq!(quantity(&characters, "sentinel", "watch"), 2.0);
    assert_eq!(quantity(&characters, "dummy", "watch"), 0.0);
}

#[test]
fn test_remove_from_play_hook_fires_on_defeat() {
    let environment: Environment = serde_json::from_value(json!({
        "characters": {
            "paladin": {
                "alignment": "good",
                "initiative": 20,
                "skills": ["strike"],
                "resources": ["hit_points"]
            },
            "martyr": {
                "alignment": "evil",
                "initiative": 1,
                "skills": [],
                "abilities": ["curse"],
                "resources": ["hit_points"]
            }
        },
        "skills": {
            "strike": {
                "targeting": { "profile": "single-target" },
                "trigger": {
                    "effects": [
                        { "profile": "damage", "value": 5 },
                        { "profile": "end-turn", "target": "actor" }
                    ]
                }
            }
        },
        "abilities": {
            "curse": {
                "hook": "remove_from_play",
                "targeting": { "profile": "single-target" },
                "trigger": { "effects": [{ "profile": "damage", "value": 2 }] }
            }
        },
        "resources": {
            "hit_points": { "initial": 5, "max_quantity": 10, "compulsory": true, "value": 1 }
        }
    }))
    .unwrap();

    let (summary, characters) = play_out(&environment, &["paladin", "martyr"], 5);

    assert_eq!(summary.actions_taken, 1);
    assert_eq!(summary.in_play, vec!["paladin"]);
    assert_eq!(quantity(&characters, "paladin", HIT_POINTS), 3.0);
    assert_eq!(quantity(&characters, "martyr", HIT_POINTS), 0.0);
}
