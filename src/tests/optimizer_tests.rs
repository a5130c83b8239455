use super::*;
use crate::core::models::settlement::SettlementAlgorithm;
use crate::core::optimizer::{Transfer, direct_netting, min_transactions, net_positions, optimize};
use std::collections::BTreeMap;

fn pairs(transfers: &[Transfer]) -> Vec<(&str, &str, f64)> {
    transfers
        .iter()
        .map(|t| (t.from.as_str(), t.to.as_str(), t.amount))
        .collect()
}

/// Applying the transfers to the original positions must leave everyone at zero.
fn assert_positions_cleared(obligations: &[Obligation], transfers: &[Transfer]) {
    let mut positions: BTreeMap<String, f64> = net_positions(obligations);
    for t in transfers {
        *positions.entry(t.from.clone()).or_insert(0.0) -= t.amount;
        *positions.entry(t.to.clone()).or_insert(0.0) += t.amount;
    }
    for (user, position) in positions {
        assert!(position.abs() <= 0.01, "{} left at {}", user, position);
    }
}

#[test]
fn test_chain_collapses_under_advanced() {
    let obligations = vec![owes("bob", "alice", 100.0), owes("carol", "bob", 100.0)];

    let transfers = min_transactions(&obligations);

    assert_eq!(pairs(&transfers), vec![("carol", "alice", 100.0)]);
}

#[test]
fn test_chain_stays_pairwise_under_normal() {
    let obligations = vec![owes("bob", "alice", 100.0), owes("carol", "bob", 100.0)];

    let transfers = direct_netting(&obligations);

    assert_eq!(
        pairs(&transfers),
        vec![("bob", "alice", 100.0), ("carol", "bob", 100.0)]
    );
}

#[test]
fn test_direct_pair_is_netted() {
    let obligations = vec![owes("alice", "bob", 100.0), owes("bob", "alice", 30.0)];

    let transfers = optimize(&obligations, SettlementAlgorithm::Normal);

    assert_eq!(pairs(&transfers), vec![("alice", "bob", 70.0)]);
    assert_eq!(transfers[0].expense_ids, vec!["e-alice-bob".to_string(), "e-bob-alice".to_string()]);
}

#[test]
fn test_balanced_pair_produces_nothing() {
    let obligations = vec![owes("alice", "bob", 40.0), owes("bob", "alice", 40.005)];

    assert!(direct_netting(&obligations).is_empty());
    assert!(min_transactions(&obligations).is_empty());
}

#[test]
fn test_only_pending_debts_between_distinct_users_count() {
    let mut completed = owes("bob", "alice", 50.0);
    completed.status = SettlementStatus::Completed;
    let mut cancelled = owes("carol", "alice", 50.0);
    cancelled.status = SettlementStatus::Cancelled;
    let own_share = owes("alice", "alice", 50.0);
    let obligations = vec![completed, cancelled, own_share, owes("carol", "bob", 12.5)];

    for algorithm in [SettlementAlgorithm::Normal, SettlementAlgorithm::Advanced] {
        let transfers = optimize(&obligations, algorithm);
        assert_eq!(pairs(&transfers), vec![("carol", "bob", 12.5)]);
    }
}

#[test]
fn test_advanced_conserves_positions_and_bounds_count() {
    let obligations = vec![
        owes("bob", "alice", 40.0),
        owes("carol", "alice", 25.0),
        owes("dave", "bob", 10.0),
        owes("erin", "carol", 60.0),
        owes("alice", "erin", 15.0),
        owes("dave", "erin", 7.5),
    ];
    let nonzero = net_positions(&obligations)
        .values()
        .filter(|p| p.abs() > 0.01)
        .count();

    let transfers = min_transactions(&obligations);

    assert!(transfers.len() < nonzero);
    assert!(transfers.iter().all(|t| t.amount > 0.01 && t.from != t.to));
    assert_positions_cleared(&obligations, &transfers);
    assert_positions_cleared(&obligations, &direct_netting(&obligations));
}

#[test]
fn test_advanced_is_deterministic_on_ties() {
    let obligations = vec![
        owes("dave", "alice", 10.0),
        owes("carol", "bob", 10.0),
        owes("bob", "alice", 10.0),
        owes("carol", "alice", 0.0),
    ];

    let first = min_transactions(&obligations);
    let mut reversed = obligations.clone();
    reversed.reverse();
    let second = min_transactions(&reversed);

    assert_eq!(pairs(&first), pairs(&second));
    // carol and dave both owe 10, alice is owed 20: ties resolve in id order.
    assert_eq!(
        pairs(&first),
        vec![("carol", "alice", 10.0), ("dave", "alice", 10.0)]
    );
}

#[test]
fn test_advanced_amounts_are_rounded_to_cents() {
    let obligations = vec![owes("bob", "alice", 10.0 / 3.0), owes("carol", "alice", 20.0 / 3.0)];

    let transfers = min_transactions(&obligations);

    assert_eq!(pairs(&transfers), vec![("carol", "alice", 6.67), ("bob", "alice", 3.33)]);
}

#[test]
fn test_advanced_lists_related_expenses() {
    let obligations = vec![owes("bob", "alice", 100.0), owes("carol", "bob", 100.0)];

    let transfers = min_transactions(&obligations);

    assert_eq!(
        transfers[0].expense_ids,
        vec!["e-bob-alice".to_string(), "e-carol-bob".to_string()]
    );
}

#[test]
fn test_advanced_related_expenses_skip_unrelated_users() {
    let obligations = vec![owes("bob", "alice", 100.0), owes("carol", "dave", 50.0)];

    let transfers = min_transactions(&obligations);

    assert_eq!(pairs(&transfers), vec![("bob", "alice", 100.0), ("carol", "dave", 50.0)]);
    assert_eq!(transfers[0].expense_ids, vec!["e-bob-alice".to_string()]);
    assert_eq!(transfers[1].expense_ids, vec!["e-carol-dave".to_string()]);
}

#[tokio::test]
async fn test_service_report_uses_display_names_and_savings() {
    let service = create_test_service().await;
    service
        .create_expense("g1", "alice", new_expense("Rent", 100.0, vec![split("bob", 100.0)]))
        .await
        .unwrap();
    service
        .create_expense("g1", "bob", new_expense("Power", 100.0, vec![split("carol", 100.0)]))
        .await
        .unwrap();

    let report = service
        .optimize_settlements("g1", Some(SettlementAlgorithm::Advanced))
        .await
        .unwrap();

    assert_eq!(report.algorithm, SettlementAlgorithm::Advanced);
    assert_eq!(report.optimized_settlements.len(), 1);
    let only = &report.optimized_settlements[0];
    assert_eq!((only.from_user_id.as_str(), only.to_user_id.as_str()), ("carol", "alice"));
    assert_eq!((only.from_user_name.as_str(), only.to_user_name.as_str()), ("Carol", "Alice"));
    assert_close(only.amount, 100.0);
    assert_eq!(report.savings.original_transactions, 2);
    assert_eq!(report.savings.optimized_transactions, 1);
    assert_close(report.savings.reduction_percentage, 50.0);

    let normal = service
        .optimize_settlements("g1", Some(SettlementAlgorithm::Normal))
        .await
        .unwrap();
    assert_eq!(normal.optimized_settlements.len(), 2);
    assert_close(normal.savings.reduction_percentage, 0.0);
}

#[tokio::test]
async fn test_unknown_identity_falls_back_to_placeholder() {
    let storage = InMemoryStorage::new();
    let directory = InMemoryDirectory::new();
    directory.save_user(User::new("alice", "Alice")).await;
    // "ghost" is a member but has no identity record.
    directory
        .save_group(Group::with_members(
            "g1",
            "Flat",
            vec![User::new("alice", "Alice"), User::new("ghost", "")],
        ))
        .await;
    let service = SettlementService::new(storage.clone(), storage, directory).with_settings(crate::EngineSettings {
        unknown_user_name: "Someone".to_string(),
        ..Default::default()
    });
    service
        .create_expense("g1", "alice", new_expense("Rent", 10.0, vec![split("ghost", 10.0)]))
        .await
        .unwrap();

    let settlements = service.optimized_settlements("g1", None).await.unwrap();

    assert_eq!(settlements[0].from_user_name, "Someone");
    assert_eq!(settlements[0].to_user_name, "Alice");
}

#[tokio::test]
async fn test_default_algorithm_comes_from_settings() {
    let storage = InMemoryStorage::new();
    let service = SettlementService::new(storage.clone(), storage, seeded_directory().await).with_settings(
        crate::EngineSettings {
            default_algorithm: SettlementAlgorithm::Normal,
            ..Default::default()
        },
    );

    let report = service.optimize_settlements("g1", None).await.unwrap();

    assert_eq!(report.algorithm, SettlementAlgorithm::Normal);
    assert!(report.optimized_settlements.is_empty());
    assert_eq!(report.savings.original_transactions, 0);
    assert_close(report.savings.reduction_percentage, 0.0);
}

#[tokio::test]
async fn test_optimize_unknown_group() {
    let service = create_test_service().await;

    let err = service.optimize_settlements("missing", None).await.unwrap_err();

    assert_eq!(err, SettleError::GroupNotFound("missing".to_string()));
}

#[test]
fn test_algorithm_parsing() {
    assert_eq!("normal".parse::<SettlementAlgorithm>().unwrap(), SettlementAlgorithm::Normal);
    assert_eq!(" Advanced ".parse::<SettlementAlgorithm>().unwrap(), SettlementAlgorithm::Advanced);
    assert!("fastest".parse::<SettlementAlgorithm>().unwrap_err().is_validation());
}
