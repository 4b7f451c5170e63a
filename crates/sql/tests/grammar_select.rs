//! Tests for SELECT rendering and read options

use chrono::{TimeZone, Utc};
use spanql::ast::{Direction, Expression, IndexHint, IndexHintKind, JoinKind, LockMode, Select, TableRef};
use spanql::{DialectConfig, Error, Grammar, StalenessBound, Statement};
use std::time::Duration;

fn sql(select: Select) -> String {
    Grammar::default().to_sql(&Statement::Select(select)).unwrap()
}

#[test]
fn test_force_index_hint_sequence() {
    let base = Select::from("User");
    let hints = [Some(IndexHint::force("idx1")), Some(IndexHint::force("idx2")), None];
    let rendered: Vec<String> = hints
        .into_iter()
        .map(|hint| sql(base.clone().index_hint(hint)))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "select * from `User` @{FORCE_INDEX=idx1}",
            "select * from `User` @{FORCE_INDEX=idx2}",
            "select * from `User`",
        ]
    );
}

#[test]
fn test_use_and_ignore_index_unsupported() {
    for (kind, name) in [(IndexHintKind::Use, "use"), (IndexHintKind::Ignore, "ignore")] {
        let select = Select::from("User").index_hint(Some(IndexHint {
            kind,
            index: "idx".into(),
        }));
        let err = Grammar::default()
            .render(&Statement::Select(select))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature(_)));
        assert!(
            err.to_string().contains(&format!("index hint type: {}", name)),
            "message `{}` does not name the hint kind",
            err
        );
    }
}

#[test]
fn test_clause_order() {
    let select = Select::from_table(TableRef::aliased("User", "u"))
        .column(Expression::qualified("u", "name"))
        .column_as(Expression::function("count", vec![Expression::All]), "n")
        .join(
            JoinKind::Left,
            TableRef::aliased("Item", "i"),
            Some(Expression::qualified("i", "userId").equals(Expression::qualified("u", "id"))),
        )
        .filter(Expression::qualified("u", "age").greater_than(Expression::bind(20i64).unwrap()))
        .group_by(Expression::qualified("u", "name"))
        .having(
            Expression::function("count", vec![Expression::All])
                .greater_than(Expression::bind(1i64).unwrap()),
        )
        .order_by(Expression::column("n"), Direction::Desc)
        .limit(10)
        .offset(5);
    assert_eq!(
        sql(select),
        "select `u`.`name`, count(*) as `n` from `User` as `u` \
         left join `Item` as `i` on `i`.`userId` = `u`.`id` \
         where `u`.`age` > ? group by `u`.`name` having count(*) > ? \
         order by `n` desc limit 10 offset 5"
    );
}

#[test]
fn test_lock_hints_render_nothing() {
    let plain = sql(Select::from("User").filter(Expression::column("id").equals(Expression::bind(1i64).unwrap())));
    for mode in [LockMode::Update, LockMode::Shared] {
        let locked = Select::from("User")
            .filter(Expression::column("id").equals(Expression::bind(1i64).unwrap()))
            .lock(mode);
        assert_eq!(sql(locked), plain);
    }
}

#[test]
fn test_staleness_is_out_of_band() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let select = Select::from("User").staleness(StalenessBound::ReadTimestamp(at));
    let rendered = Grammar::default().render(&Statement::Select(select)).unwrap();
    assert_eq!(rendered.sql, "select * from `User`");
    let read_only = rendered.options.read_only.unwrap();
    assert_eq!(read_only.read_timestamp.as_deref(), Some("2024-01-02T03:04:05Z"));
    assert!(!read_only.return_read_timestamp);
}

#[test]
fn test_default_read_options_from_config() {
    let grammar = Grammar::new(
        DialectConfig::default()
            .with_data_boost(true)
            .with_default_staleness(StalenessBound::MaxStaleness(Duration::from_secs(10))),
    );

    let rendered = grammar.render(&Select::from("User").into()).unwrap();
    assert!(rendered.options.data_boost_enabled);
    let read_only = rendered.options.read_only.unwrap();
    assert_eq!(read_only.max_staleness.as_deref(), Some("10s"));
    assert!(read_only.return_read_timestamp);

    // The statement's own settings win
    let rendered = grammar
        .render(
            &Select::from("User")
                .staleness(StalenessBound::Strong)
                .data_boost(false)
                .into(),
        )
        .unwrap();
    assert!(!rendered.options.data_boost_enabled);
    assert_eq!(rendered.options.read_only.unwrap().strong, Some(true));
}

#[test]
fn test_render_is_deterministic() {
    let select = Select::from("User")
        .force_index("idx")
        .filter(
            Expression::column("name")
                .like(Expression::bind("a%").unwrap())
                .or(Expression::column("id").in_list(vec![
                    Expression::bind(1i64).unwrap(),
                    Expression::bind(2i64).unwrap(),
                ])),
        )
        .order_by(Expression::column("id"), Direction::Asc);
    let grammar = Grammar::default();
    let statement = Statement::Select(select);
    let first = grammar.render(&statement).unwrap();
    for _ in 0..10 {
        assert_eq!(grammar.render(&statement).unwrap(), first);
    }
}
