use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Currency, Engine};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "homeledger_admin")]
#[command(about = "Admin utilities for homeledger (bootstrap users/households)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./homeledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Household(Household),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user and print its bearer token.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct Household {
    #[command(subcommand)]
    command: HouseholdCommand,
}

#[derive(Subcommand, Debug)]
enum HouseholdCommand {
    Create(HouseholdCreateArgs),
}

#[derive(Args, Debug)]
struct HouseholdCreateArgs {
    #[arg(long)]
    owner_email: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "EUR", value_parser = parse_currency)]
    currency: Currency,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let (user, token) = engine.create_user(&args.email, &args.name).await?;
            println!("created user: {} ({})", user.email, user.id);
            println!("token: {token}");
        }
        Command::Household(Household {
            command: HouseholdCommand::Create(args),
        }) => {
            let owner = match engine.user_by_email(&args.owner_email).await {
                Ok(owner) => owner,
                Err(err) => {
                    eprintln!("user not found: {} ({err})", args.owner_email);
                    std::process::exit(1);
                }
            };

            let household = engine
                .create_household(owner.id, &args.name, Some(args.currency), None)
                .await?;
            println!("created household: {} ({})", household.name, household.id);
        }
    }

    Ok(())
}
