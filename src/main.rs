use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use uuid::Uuid;

use cookbook::config::Config;
use cookbook::feed::FeedController;
use cookbook::recipes::{RatingValue, Recipe, RecipeStore};
use cookbook::session::SessionContext;

const ACCESS_TOKEN_ENV: &str = "COOKBOOK_ACCESS_TOKEN";
const USER_ID_ENV: &str = "COOKBOOK_USER_ID";

/// Get the default config file path (~/.config/cookbook/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("cookbook")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "cookbook", about = "Browse, search and rate recipes on a hosted recipe backend")]
struct Args {
    /// Config file (defaults to ~/.config/cookbook/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the feed, newest first
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// List highlighted recipes
    Highlights,
    /// Search recipe titles
    Search { text: String },
    /// Show one recipe with its images, category, difficulty and author
    Show { id: i64 },
    /// Rate a recipe from 1 to 5 (requires a session)
    Rate { id: i64, value: i64 },
    /// List your own recipes (requires a session)
    Mine,
    /// Delete one of your recipes (requires a session)
    Delete { id: i64 },
    /// List the categories and difficulties a new recipe can use
    Categories,
    /// Show your profile (requires a session)
    Profile,
}

/// Session handed over by whatever signed the user in.
fn session_from_env(config: &Config) -> Result<SessionContext> {
    let language = config.language();
    let token = std::env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty());
    let user = std::env::var(USER_ID_ENV).ok().filter(|u| !u.is_empty());
    match (user, token) {
        (Some(user), Some(token)) => {
            let user_id = Uuid::parse_str(&user)
                .with_context(|| format!("{} is not a valid user id", USER_ID_ENV))?;
            Ok(SessionContext::signed_in(
                user_id,
                SecretString::from(token),
                language,
            ))
        }
        (None, None) => Ok(SessionContext::anonymous(language)),
        _ => anyhow::bail!(
            "Set both {} and {} to act as a signed-in user",
            USER_ID_ENV,
            ACCESS_TOKEN_ENV
        ),
    }
}

fn require_user(session: &SessionContext) -> Result<Uuid> {
    session.user_id.ok_or_else(|| {
        anyhow::anyhow!(
            "This command needs a session: set {} and {}",
            USER_ID_ENV,
            ACCESS_TOKEN_ENV
        )
    })
}

fn print_recipe(recipe: &Recipe, category: Option<&str>, difficulty: Option<&str>) {
    println!(
        "#{:<6} {:<40} {:>5.1} min  {:.2}★ ({} ratings)  {} / {}",
        recipe.id,
        recipe.title,
        recipe.cooking_time,
        recipe.average_rating,
        recipe.ratings.len(),
        category.unwrap_or("-"),
        difficulty.unwrap_or("-"),
    );
}

async fn run(
    command: Command,
    store: RecipeStore,
    config: &Config,
    session: SessionContext,
) -> Result<()> {
    match command {
        Command::Feed { pages } => {
            let feed = FeedController::new(store, session, config.feed_options());
            feed.initial_load().await;
            for _ in 1..pages {
                if !feed.load_more().await {
                    break;
                }
            }
            let snapshot = feed.snapshot();
            for recipe in &snapshot.recipes {
                print_recipe(
                    recipe,
                    feed.category_label(recipe).as_deref(),
                    feed.difficulty_label(recipe).as_deref(),
                );
            }
            println!(
                "{} shown of {}{}",
                snapshot.recipes.len(),
                snapshot
                    .total
                    .map_or_else(|| "?".to_string(), |t| t.to_string()),
                if snapshot.has_more { ", more available" } else { "" }
            );
        }
        Command::Highlights => {
            let store = store.with_session(&session);
            let recipes = store
                .highlighted_recipes()
                .await
                .context("Failed to load highlighted recipes")?;
            for recipe in &recipes {
                print_recipe(recipe, None, None);
            }
        }
        Command::Search { text } => {
            let feed = FeedController::new(store, session, config.feed_options());
            let results = feed.search().search_now(&text).await;
            if results.is_empty() {
                println!("No recipes match {:?}", text);
            }
            for recipe in &results {
                print_recipe(recipe, None, None);
            }
            if feed.search().has_more() {
                println!("(more results available)");
            }
        }
        Command::Show { id } => {
            let store = store.with_session(&session);
            let detail = store
                .recipe_detail(id)
                .await
                .with_context(|| format!("Failed to load recipe {}", id))?;
            let language = session.language;
            let recipe = &detail.recipe;
            println!("{} (#{})", recipe.title, recipe.id);
            println!("  Cooking time: {} min", recipe.cooking_time);
            println!("  Origin:       {}", recipe.origin);
            println!(
                "  Category:     {}",
                detail
                    .category
                    .as_ref()
                    .map_or("-", |c| c.localized_name(language))
            );
            println!(
                "  Difficulty:   {}",
                detail
                    .difficulty
                    .as_ref()
                    .map_or("-", |c| c.localized_name(language))
            );
            println!(
                "  Author:       {}",
                detail
                    .author
                    .as_ref()
                    .and_then(|a| a.display_name.as_deref())
                    .unwrap_or("-")
            );
            println!(
                "  Rating:       {:.2} ({} ratings)",
                recipe.average_rating,
                recipe.ratings.len()
            );
            println!();
            println!("{}", recipe.description);
            for image in &detail.images {
                println!("  image: {}", image.image_url);
            }
        }
        Command::Rate { id, value } => {
            let user_id = require_user(&session)?;
            let rating = RatingValue::try_from(value)?;
            let store = store.with_session(&session);
            store
                .rate_recipe(id, user_id, rating)
                .await
                .with_context(|| format!("Failed to rate recipe {}", id))?;
            println!("Rated recipe #{} with {}", id, rating.get());
        }
        Command::Mine => {
            let user_id = require_user(&session)?;
            let store = store.with_session(&session);
            let recipes = store
                .user_recipes(user_id)
                .await
                .context("Failed to load your recipes")?;
            if recipes.is_empty() {
                println!("You have not shared any recipes yet");
            }
            for recipe in &recipes {
                print_recipe(recipe, None, None);
            }
        }
        Command::Delete { id } => {
            require_user(&session)?;
            let store = store.with_session(&session);
            store
                .delete_recipe(id)
                .await
                .with_context(|| format!("Failed to delete recipe {}", id))?;
            println!("Deleted recipe #{}", id);
        }
        Command::Categories => {
            let store = store.with_session(&session);
            let (categories, conditions) =
                tokio::try_join!(store.active_categories(), store.active_conditions())
                    .context("Failed to load categories")?;
            let language = session.language;
            println!("Categories:");
            for category in &categories {
                println!("  {:>3}  {}", category.id, category.localized_name(language));
            }
            println!("Difficulties:");
            for condition in &conditions {
                println!("  {:>3}  {}", condition.id, condition.localized_name(language));
            }
        }
        Command::Profile => {
            let user_id = require_user(&session)?;
            let store = store.with_session(&session);
            match store.profile(user_id).await.context("Failed to load profile")? {
                Some(profile) => {
                    println!("{}", profile.display_name.as_deref().unwrap_or("(no name)"));
                    println!("  Avatar: {}", profile.avatar_url.as_deref().unwrap_or("-"));
                    println!("  Phone:  {}", profile.phone.as_deref().unwrap_or("-"));
                }
                None => println!("No profile found for {}", user_id),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env();
    tracing::debug!(config = ?config, "Effective configuration");

    let store = config.store().context("Backend is not configured")?;
    let session = session_from_env(&config)?;

    run(args.command, store, &config, session).await
}
