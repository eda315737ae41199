use padtree_core::{ButtonSet, InputSpace, SearchConfig, Tree};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn public_iteration_loop_counts_every_iteration_at_the_root() {
    let mut tree = Tree::new();
    let config = SearchConfig {
        exploration_bias: 0.5,
        partial_expansion_base: 1.0,
        ..SearchConfig::default()
    };
    let inputs = InputSpace::new(
        vec![ButtonSet::new(0b01), ButtonSet::new(0b10)],
        ButtonSet::new(0b1100),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let max_score = 100.0;
    let iterations = 100;

    for _ in 0..iterations {
        let selected = tree.select(&config, max_score).expect("selection succeeds");
        let expanded = tree
            .expand(selected, &inputs, &mut rng)
            .expect("expansion succeeds");

        // Stand-in rollout: deeper positions score better.
        let score = tree.depth(expanded).expect("expanded exists") as f64;
        tree.backpropagate(expanded, score, &config, max_score)
            .expect("backpropagation succeeds");
    }

    assert_eq!(tree.visits(tree.root_id()).unwrap(), iterations);
    // One fresh node per iteration at most, plus the root.
    assert!(tree.node_count() > 1);
    assert!(tree.node_count() <= iterations as usize + 1);

    // The tracked best node has been visited and carries a finite average.
    let best = tree.best_scoring();
    assert!(tree.visits(best).unwrap() > 0);
    assert!(tree.average_score(best).unwrap().is_finite());
}

#[test]
fn public_default_yaml_config_parses() {
    let config = SearchConfig::from_default_yaml().expect("default yaml should parse");
    assert_eq!(config.exploration_bias, 0.5);
    assert_eq!(config.expansion_macro_frames, 1);
    assert!(config.max_simulation_seconds > 0.0);
}

#[test]
fn public_config_validation_rejects_bad_values() {
    let err = SearchConfig::from_yaml_str("exploration_bias: -1.0").unwrap_err();
    assert!(err.to_string().contains("exploration_bias"));

    let err = SearchConfig::from_yaml_str("simulation_macro_frames: 0").unwrap_err();
    assert!(err.to_string().contains("simulation_macro_frames"));
}
