//! Parser and canonical rendering tests: round trips, precedence, quoting
//! and error reporting.

use sqlmin::ast::{BinaryOp, Expr, JoinKind, Literal, TableExpr};
use sqlmin::parser::parse_expr;
use sqlmin::{parse_statement, Statement};

fn render(sql: &str) -> String {
    parse_statement(sql).unwrap().to_string()
}

fn assert_round_trip(sql: &str) {
    let statement = parse_statement(sql).unwrap();
    let rendered = statement.to_string();
    let reparsed: Statement = parse_statement(&rendered)
        .unwrap_or_else(|e| panic!("rendering of {sql:?} does not parse: {e}\n{rendered}"));
    assert_eq!(reparsed, statement, "round trip changed the tree of {sql:?}");
    assert_eq!(reparsed.to_string(), rendered);
}

// Round trips
#[test]
fn test_round_trip_corpus() {
    let corpus = [
        "select 1",
        "select a, b from t1",
        "select distinct a as x, t1.* from t1 as t",
        "select * from t1, t2 where t1.id = t2.id",
        "select a from t1 join t2 on t1.id = t2.id left join t3 on t3.x = t1.x",
        "select a from t1 cross join t2",
        "select a from t1 join (t2 join t3 on t2.id = t3.id) on t1.id = t2.id",
        "select count(*), count(distinct a), sum(b) from t group by c having count(*) > 1",
        "select a from t where a in (1, 2, 3) and b not in ('x') or c is not null",
        "select a from t where not (a = 1 or b = 2)",
        "select a from t where a like 'x%' and b not like '%y'",
        "select -a, -(-5), (a + b) * c, a - (b - c), a / b % c from t",
        "select a from t order by a desc, b limit 10 offset 5",
        "select a from t1 union all select b from t2 union select c from t3",
        "select a from t1 union (select b from t2 union select c from t3)",
        "(select a from t1 order by a limit 1) union select b from t2",
        "select 'it''s', 1.50, null, true, false from t",
        "select `select`, `my col` from `order`",
        "select a from t where (a > 1 and b > 2) and c > 3",
    ];
    for sql in corpus {
        assert_round_trip(sql);
    }
}

#[test]
fn test_rendering_is_canonical() {
    assert_eq!(
        render("SELECT a,b FROM t1 WHERE a=1 AND b<>2"),
        "select a, b from t1 where a = 1 and b != 2"
    );
    assert_eq!(
        render("select a from t limit 5, 10"),
        "select a from t limit 10 offset 5"
    );
    assert_eq!(render("select \"x\" from t"), "select 'x' from t");
    assert_eq!(render("select a from t1 inner join t2 on x"), "select a from t1 join t2 on x");
    assert_eq!(
        render("select a from t1 left outer join t2 on x"),
        "select a from t1 left join t2 on x"
    );
}

#[test]
fn test_redundant_parentheses_are_dropped() {
    assert_eq!(render("select ((a)) from t where ((a = 1))"), "select a from t where a = 1");
    assert_eq!(render("select (a - b) - c from t"), "select a - b - c from t");
    assert_eq!(render("select (a * b) + c from t"), "select a * b + c from t");
    assert_eq!(render("select a + (b * c) from t"), "select a + b * c from t");
}

#[test]
fn test_comments_are_ignored() {
    assert_eq!(
        render("select a -- trailing note\nfrom t /* block /* nested */ */ where a # hash\n"),
        "select a from t where a"
    );
}

// Precedence
#[test]
fn test_comparison_binds_tighter_than_and() {
    let expr = parse_expr("a = 1 and b + 1 > 2 * c").unwrap();
    let Expr::And(children) = expr else {
        panic!("expected AND");
    };
    assert_eq!(children.len(), 2);
    match &children[1] {
        Expr::Binary {
            op: BinaryOp::Gt,
            left,
            right,
        } => {
            assert!(matches!(**left, Expr::Binary { op: BinaryOp::Add, .. }));
            assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn test_not_binds_looser_than_comparison() {
    let expr = parse_expr("not a = 1").unwrap();
    assert!(matches!(expr, Expr::Not(ref inner) if matches!(**inner, Expr::Binary { .. })));
}

#[test]
fn test_literals() {
    assert_eq!(parse_expr("42").unwrap(), Expr::Literal(Literal::Int(42)));
    assert_eq!(
        parse_expr("1.5").unwrap(),
        Expr::Literal(Literal::Decimal("1.5".to_string()))
    );
    assert_eq!(parse_expr("null").unwrap(), Expr::Literal(Literal::Null));
    assert_eq!(parse_expr("TRUE").unwrap(), Expr::Literal(Literal::Bool(true)));
    assert_eq!(
        parse_expr("'a''b'").unwrap(),
        Expr::Literal(Literal::String("a'b".to_string()))
    );
}

#[test]
fn test_join_tree_shape() {
    let statement =
        parse_statement("select 1 from t1 join t2 on t1.id = t2.id left join t3 on t3.id = t2.id")
            .unwrap();
    let select = statement.as_select().unwrap();
    assert_eq!(select.from.len(), 1);
    match &select.from[0] {
        TableExpr::Join { kind, left, .. } => {
            assert_eq!(*kind, JoinKind::Left);
            assert!(matches!(**left, TableExpr::Join { kind: JoinKind::Inner, .. }));
        }
        other => panic!("expected join, got {other:?}"),
    }
}

// Errors
#[test]
fn test_parse_errors() {
    for bad in [
        "",
        "select",
        "select a from",
        "select a from t where",
        "select 'unterminated",
        "select a from t1 cross join t2 on x",
        "select a from t limit x",
        "update t set a = 1",
        "select a from t /* open comment",
    ] {
        assert!(parse_statement(bad).is_err(), "{bad:?} should not parse");
    }
}

#[test]
fn test_error_offset_points_at_problem() {
    let err = parse_statement("select a from t where ,").unwrap_err();
    assert_eq!(err.offset, 22);
    assert!(err.to_string().starts_with("parse error at offset 22"));
}
