use std::error::Error;
use tally_engine::config::CONFIG;
use tally_engine::core::models::{
    analytics::PeriodKind,
    expense::{ExpenseSplit, NewExpense, SplitType},
    group::Group,
    settlement::SettlementAlgorithm,
    user::User,
};
use tally_engine::{InMemoryDirectory, InMemoryStorage, SettlementService};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn split(user_id: &str, amount: f64) -> ExpenseSplit {
    ExpenseSplit::new(user_id, amount)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&CONFIG.log_level))
        .init();

    let storage = InMemoryStorage::new();
    let directory = InMemoryDirectory::new();

    let users = vec![
        User::new("alice", "Alice"),
        User::new("bob", "Bob"),
        User::new("carol", "Carol"),
    ];
    for user in &users {
        directory.save_user(user.clone()).await;
    }
    directory
        .save_group(Group::with_members("trip", "Weekend trip", users))
        .await;

    let service =
        SettlementService::new(storage.clone(), storage, directory).with_settings(CONFIG.engine_settings());

    let dinner = service
        .create_expense(
            "trip",
            "alice",
            NewExpense {
                description: "Dinner".to_string(),
                amount: 90.0,
                splits: vec![split("alice", 30.0), split("bob", 30.0), split("carol", 30.0)],
                split_type: SplitType::Equal,
                tags: vec!["food".to_string()],
            },
        )
        .await?;
    info!("Created expense {}", dinner.expense.id);

    service
        .create_expense(
            "trip",
            "bob",
            NewExpense {
                description: "Fuel".to_string(),
                amount: 60.0,
                splits: vec![split("bob", 20.0), split("carol", 40.0)],
                split_type: SplitType::Unequal,
                tags: vec!["transport".to_string()],
            },
        )
        .await?;

    for algorithm in [SettlementAlgorithm::Normal, SettlementAlgorithm::Advanced] {
        let report = service.optimize_settlements("trip", Some(algorithm)).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let balance = service.group_balance("trip", "carol").await?;
    println!("{}", serde_json::to_string_pretty(&balance)?);

    let friends = service.friends_balance("alice").await?;
    println!("{}", serde_json::to_string_pretty(&friends)?);

    let analytics = service.group_analytics("trip", PeriodKind::Month, None).await?;
    println!("{}", serde_json::to_string_pretty(&analytics)?);

    Ok(())
}
