use clap::Subcommand;
use focusroom_core::{Config, RewardEvaluator};

use super::{connect, describe};

#[derive(Subcommand)]
pub enum RewardsAction {
    /// Ask the server to evaluate automatic rewards now
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: RewardsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RewardsAction::Check { json } => {
            let config = Config::load()?;
            let services = connect(&config).map_err(|e| describe(&e))?;
            let granted = services
                .rewards
                .check_automatic()
                .await
                .map_err(|e| describe(&e))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&granted)?);
            } else if granted.is_empty() {
                println!("No new rewards.");
            } else {
                for reward in &granted {
                    match reward.description {
                        Some(ref d) => println!("Reward unlocked: {} ({d})", reward.name),
                        None => println!("Reward unlocked: {}", reward.name),
                    }
                }
            }
        }
    }
    Ok(())
}
