//! Property-based minimization tests (proptest).

use proptest::prelude::*;

use sqlmin::minimizer::neighbours;
use sqlmin::{
    parse_statement, verify_local_minimum, Minimizer, PredicateOracle, RuleCatalog, Statement,
};

const ITEMS: &[&str] = &["a", "b", "t1.a", "a + 1", "zz", "count(*)", "-b", "'x'"];
const RELATIONS: &[&str] = &[
    "t1",
    "t1, t2",
    "t1 join t2 on t1.id = t2.id",
    "t1 left join t2 on t1.id = t2.id and t2.c > 0",
    "t1 cross join t2",
];
const PREDICATES: &[&str] = &[
    "a > 1",
    "b = 'x'",
    "zz is null",
    "not a = 2",
    "a in (1, 2, 3)",
    "(a = 1 or zz < 5)",
    "t2.c like 'q%'",
];

/// Generate a statement from sampled clause components
fn sql_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop::sample::select(ITEMS), 1..4),
        any::<bool>(),
        prop::sample::select(RELATIONS),
        prop::collection::vec(prop::sample::select(PREDICATES), 0..4),
        prop::option::of(prop::sample::select(&["a", "b desc", "a, zz"][..])),
        prop::option::of(prop::sample::select(&["limit 5", "limit 5 offset 2"][..])),
    )
        .prop_map(|(items, distinct, relation, predicates, order, limit)| {
            let mut sql = String::from("select ");
            if distinct {
                sql.push_str("distinct ");
            }
            sql.push_str(&items.join(", "));
            sql.push_str(" from ");
            sql.push_str(relation);
            if !predicates.is_empty() {
                sql.push_str(" where ");
                sql.push_str(&predicates.join(" and "));
            }
            if let Some(order) = order {
                sql.push_str(" order by ");
                sql.push_str(order);
            }
            if let Some(limit) = limit {
                sql.push(' ');
                sql.push_str(limit);
            }
            sql
        })
}

fn mentions_zz(statement: &Statement) -> bool {
    statement.to_string().contains("zz")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Rendering then re-parsing gives back the same tree
    #[test]
    fn prop_render_round_trips(sql in sql_strategy()) {
        let statement = parse_statement(&sql).expect("generated SQL should parse");
        let rendered = statement.to_string();
        let reparsed = parse_statement(&rendered).expect("rendering should parse");
        prop_assert_eq!(reparsed, statement);
    }

    /// Every proposal is strictly smaller and survives a round trip
    #[test]
    fn prop_neighbours_shrink_and_round_trip(sql in sql_strategy()) {
        let statement = parse_statement(&sql).expect("generated SQL should parse");
        let base = statement.size();
        for candidate in neighbours(&statement, &RuleCatalog::new()) {
            prop_assert!(candidate.size() < base, "{} is not smaller than {}", candidate.statement(), statement);
            prop_assert_eq!(candidate.statement().size(), candidate.size());
            let rendered = candidate.statement().to_string();
            let reparsed = parse_statement(&rendered).expect("candidate rendering should parse");
            prop_assert_eq!(&reparsed, candidate.statement());
        }
    }

    /// The result still reproduces, is no larger, and no single rule shrinks it further
    #[test]
    fn prop_minimized_result_is_locally_minimal(sql in sql_strategy()) {
        prop_assume!(sql.contains("zz"));
        let seed = parse_statement(&sql).expect("generated SQL should parse");
        let oracle = PredicateOracle::new(mentions_zz);

        let reduction = Minimizer::new().minimize(seed.clone(), &oracle).expect("seed reproduces");

        prop_assert!(reduction.is_complete());
        prop_assert!(mentions_zz(&reduction.statement));
        prop_assert!(reduction.statement.size() <= seed.size());
        prop_assert_eq!(reduction.stats.final_size, reduction.statement.size());
        let better = verify_local_minimum(&reduction.statement, &oracle, &RuleCatalog::new())
            .expect("predicate oracle has no infrastructure");
        prop_assert!(better.is_none(), "{} still shrinks to {:?}", reduction.statement, better.map(|c| c.statement().to_string()));
    }

    /// Same seed and oracle, same answer and same number of oracle calls
    #[test]
    fn prop_minimization_is_deterministic(sql in sql_strategy()) {
        prop_assume!(sql.contains("zz"));
        let seed = parse_statement(&sql).expect("generated SQL should parse");
        let oracle = PredicateOracle::new(mentions_zz);

        let first = Minimizer::new().minimize(seed.clone(), &oracle).expect("seed reproduces");
        let second = Minimizer::new().minimize(seed, &oracle).expect("seed reproduces");

        prop_assert_eq!(first.statement, second.statement);
        prop_assert_eq!(first.stats.oracle_calls, second.stats.oracle_calls);
    }

    /// Arbitrary printable input never panics the parser
    #[test]
    fn prop_parser_never_panics(input in "[ -~]{0,64}") {
        let _ = parse_statement(&input);
    }
}
