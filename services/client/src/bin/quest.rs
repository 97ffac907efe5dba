//! services/client/src/bin/quest.rs

use adhd_game_core::{
    check_minute_bounds, max_reward, parse_progress, preview_reward, DungeonId, EditState,
    MinuteBounds, Quest, QuestCard, QuestMode, QuestSource, UserContext,
};
use clap::{Args, Parser, Subcommand};
use client_lib::{
    adapters::HttpApiAdapter,
    config::Config,
    error::ClientError,
    retry::{RetryConfig, RetryingChannel},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quest")]
#[command(about = "Preview and complete quests from the command line")]
#[command(version)]
struct Cli {
    /// User id sent with every request (defaults to QUEST_USER_ID)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the quests of a dungeon with their reward hints
    List {
        #[arg(short, long)]
        dungeon: String,
    },

    /// Show the reward a completion would earn, without submitting it
    Preview(CompletionArgs),

    /// Submit a completion
    Complete(CompletionArgs),
}

#[derive(Args)]
struct CompletionArgs {
    #[arg(short, long)]
    dungeon: String,

    #[arg(short, long)]
    quest: String,

    /// Progress in percent, for PARTIAL quests
    #[arg(long, conflicts_with = "minutes")]
    percent: Option<String>,

    /// Minutes spent, for PER_MINUTE quests
    #[arg(long)]
    minutes: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let user = match cli.user {
        Some(user) => UserContext::new(user),
        None => UserContext::new(config.require_user_id()?),
    };

    // --- 2. Initialize the API Adapter ---
    let api = HttpApiAdapter::from_config(&config)?;
    info!("Using quest API at {}", config.api_base_url);

    // --- 3. Dispatch ---
    match cli.command {
        Commands::List { dungeon } => {
            let quests = api.list_quests(&user, &DungeonId(dungeon)).await?;
            if quests.is_empty() {
                println!("No quests in this dungeon.");
            }
            for quest in &quests {
                print_quest(quest);
            }
        }
        Commands::Preview(args) => {
            let quest = find_quest(&api, &user, &args).await?;
            let edit = edit_state(&quest, &args)?;
            print_preview(&quest, edit.as_ref());
        }
        Commands::Complete(args) => {
            let quest = find_quest(&api, &user, &args).await?;
            let edit = edit_state(&quest, &args)?;
            print_preview(&quest, edit.as_ref());

            let card = QuestCard::new(quest);
            card.begin()?;
            if let Some(edit) = edit {
                card.set_input(edit)?;
            }
            let channel = RetryingChannel::new(
                api.clone(),
                RetryConfig::with_max_attempts(config.submit_max_attempts),
            );
            let response = card.submit(&channel, &user).await?;

            println!("Awarded {} points.", response.awarded_points);
            if let Some(streak) = response.streak_count {
                println!("Streak: {} day(s).", streak);
            }
        }
    }

    Ok(())
}

async fn find_quest(
    api: &HttpApiAdapter,
    user: &UserContext,
    args: &CompletionArgs,
) -> Result<Quest, ClientError> {
    api.list_quests(user, &DungeonId(args.dungeon.clone()))
        .await?
        .into_iter()
        .find(|quest| quest.id.0 == args.quest)
        .ok_or_else(|| ClientError::Internal(format!("quest '{}' not found in dungeon", args.quest)))
}

// Turns the command-line progress flags into the edit state the quest's mode expects.
fn edit_state(quest: &Quest, args: &CompletionArgs) -> Result<Option<EditState>, ClientError> {
    let edit = match quest.mode {
        QuestMode::Binary => None,
        QuestMode::Partial => match &args.percent {
            Some(text) => Some(EditState::Slider {
                percent: parse_progress(text)?,
            }),
            None => None,
        },
        QuestMode::PerMinute => match &args.minutes {
            Some(text) => Some(EditState::Minutes {
                minutes: parse_progress(text)? as i64,
            }),
            None => None,
        },
    };
    Ok(edit)
}

fn print_quest(quest: &Quest) {
    let status = if quest.is_active() { "" } else { " (inactive)" };
    println!(
        "{:<24} {:<10} [{}] {}{}",
        quest.id,
        quest.mode,
        quest.mode.action_label(),
        preview_reward(quest, None),
        status
    );
    if !quest.title.is_empty() {
        println!("    {}", quest.title);
    }
}

fn print_preview(quest: &Quest, edit: Option<&EditState>) {
    let edit = edit
        .copied()
        .unwrap_or_else(|| EditState::initial(quest.mode));
    println!("Reward: {}", preview_reward(quest, edit.progress()));
    if let Some(max) = max_reward(quest) {
        println!("Max points: {}", max);
    }
    if let EditState::Minutes { minutes } = edit {
        let minutes = u32::try_from(minutes.max(0)).unwrap_or(u32::MAX);
        match check_minute_bounds(quest, minutes) {
            MinuteBounds::Within => {}
            MinuteBounds::BelowMinimum { min_minutes } => {
                println!("Note: minimum is {} minutes.", min_minutes)
            }
            MinuteBounds::AboveMaximum { max_minutes } => {
                println!("Note: only the first {} minutes earn points.", max_minutes)
            }
        }
    }
}
