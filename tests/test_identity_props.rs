//! Property tests: crossing the membrane any number of times, in any order, maps each
//! blue object to exactly one red proxy and back.

extern crate near_membrane;

use proptest::prelude::*;

use near_membrane::membrane::{
    create_connector, EnvironmentOptions, RealmEvaluator, VirtualEnvironment,
};
use near_membrane::runner::ds::realm::CodeRealm;
use near_membrane::runner::ds::value::JsValue;

fn crossings() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0usize..6, any::<bool>()), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_identity_is_stable_across_crossings(sequence in crossings()) {
        let blue = CodeRealm::new();
        let red = CodeRealm::new();
        let env = VirtualEnvironment::new(
            EnvironmentOptions::new()
                .blue_connector(create_connector(RealmEvaluator::Global(blue.clone())).unwrap())
                .red_connector(create_connector(RealmEvaluator::Global(red.clone())).unwrap()),
        )
        .unwrap();
        let pool: Vec<JsValue> = (0..6)
            .map(|i| blue.evaluate(&format!("({{ n: {} }})", i)).unwrap())
            .collect();
        let mut seen: Vec<Option<JsValue>> = vec![None; pool.len()];

        for (index, keep) in sequence {
            let proxy = env.get_red(&pool[index]).unwrap();
            prop_assert_ne!(&proxy, &pool[index]);
            prop_assert_eq!(&env.get_blue(&proxy).unwrap(), &pool[index]);
            if let Some(previous) = &seen[index] {
                prop_assert_eq!(previous, &proxy);
            } else if keep {
                seen[index] = Some(proxy);
            }
        }

        let kept = seen.iter().filter(|s| s.is_some()).count();
        let stats = env.stats();
        prop_assert_eq!(stats.red.imported - stats.red.linked, kept);
    }
}
