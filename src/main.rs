use clap::{Parser, Subcommand};
use log::{debug, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use meal_basket::categorize::{apply_alias, categorize};
use meal_basket::matching::CatalogIndex;
use meal_basket::normalize::{normalize, normalize_for_match};
use meal_basket::prep::prepare_payload;
use meal_basket::shopping::{FileStore, PersistedState, PersistingObserver, ShoppingSection};
use meal_basket::units::normalize_unit;
use meal_basket::{
    catalog_from, load_config, Catalog, Ingredient, Meal, PlannerConfig, ProviderKind,
    RecipeImporter, ShoppingStore,
};

#[derive(Parser, Debug)]
#[command(name = "meal-basket", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the display and match forms of an ingredient name
    Normalize { text: String },
    /// Map a free-text unit to its short code
    Unit { unit: String },
    /// Shopping category of an ingredient name
    Categorize { name: String },
    /// Rank catalog entries for a query
    Match {
        query: String,
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,
        #[arg(short = 'k', long, default_value_t = 5)]
        limit: usize,
    },
    /// Extract ingredients from an OCR text file
    Import {
        file: PathBuf,
        /// openai, anthropic or ollama; defaults to the configured provider
        #[arg(short, long)]
        provider: Option<String>,
        #[arg(short, long)]
        model: Option<String>,
        /// Catalog JSON file to resolve rows against
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Send only the lines that look like ingredients
        #[arg(long)]
        prefilter: bool,
        /// Print the prepared payload without calling any provider
        #[arg(long)]
        dry_run: bool,
        /// Add the recipe to the shopping state for this many servings
        #[arg(long)]
        plan: Option<u32>,
        #[arg(long, default_value = ".meal-basket")]
        state: PathBuf,
    },
    /// Work with the persisted shopping list
    Shopping {
        #[arg(long, default_value = ".meal-basket")]
        state: PathBuf,
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Meals JSON file
        #[arg(long)]
        meals: Option<PathBuf>,
        #[command(subcommand)]
        action: ShoppingAction,
    },
}

#[derive(Subcommand, Debug)]
enum ShoppingAction {
    /// Print the list
    List {
        #[arg(long)]
        json: bool,
    },
    /// Put a meal in the basket, or change its persons
    AddMeal { meal_id: i64, persons: u32 },
    RemoveMeal { meal_id: i64 },
    /// Add a manual item, "name @Category" picks the category
    Add { text: String },
    /// Check an item, or mark it bought if already checked
    Toggle {
        name: String,
        #[arg(short, long, default_value = "")]
        unit: String,
        #[arg(short, long)]
        category: String,
    },
    /// Forget checked items and consumed quantities
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { text } => {
            println!("display: {}", normalize(&text));
            println!("match:   {}", normalize_for_match(&text));
        }
        Command::Unit { unit } => println!("{}", normalize_unit(&unit)),
        Command::Categorize { name } => {
            debug!("alias form: {}", apply_alias(&name));
            println!("{}", categorize(&name));
        }
        Command::Match {
            query,
            catalog,
            limit,
        } => {
            let entries: Vec<Ingredient> = read_json(&catalog)?;
            for candidate in CatalogIndex::new(&entries).search(&query, limit) {
                println!(
                    "{:>6.2}  {:<6} {}",
                    candidate.score,
                    candidate.id,
                    candidate.canonical_name.as_deref().unwrap_or(&candidate.name)
                );
            }
        }
        Command::Import {
            file,
            provider,
            model,
            catalog,
            prefilter,
            dry_run,
            plan,
            state,
        } => {
            let text = tokio::fs::read_to_string(&file).await?;
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&prepare_payload(&text))?);
                return Ok(());
            }

            let config = load_config()?;
            let catalog = match &catalog {
                Some(path) => load_catalog(path)?,
                None => Catalog::new(),
            };

            let mut builder = RecipeImporter::builder()
                .text(text)
                .config(config.clone())
                .catalog(catalog.clone());
            if let Some(name) = provider.as_deref() {
                builder = builder.provider(parse_provider(name)?);
            }
            if let Some(model) = model {
                builder = builder.model(model);
            }
            if prefilter {
                builder = builder.prefilter();
            }

            // Two round-trips at most, each bounded by the configured timeout
            let limit = Duration::from_secs(config.timeout.saturating_mul(2));
            let recipe = tokio::time::timeout(limit, builder.build())
                .await
                .map_err(|_| format!("import timed out after {}s", limit.as_secs()))??;

            println!("{}", serde_json::to_string_pretty(&recipe.rows)?);
            info!(
                "Imported '{}' ({} rows, servings {:?})",
                recipe.title.as_deref().unwrap_or("?"),
                recipe.rows.len(),
                recipe.servings
            );

            if let Some(servings) = plan {
                let mut store = open_store(&config, &state, catalog, None)?;
                store.add_planned_recipe(
                    &recipe.title.clone().unwrap_or_default(),
                    servings,
                    recipe.servings,
                    recipe.rows,
                    chrono::Utc::now(),
                );
            }
        }
        Command::Shopping {
            state,
            catalog,
            meals,
            action,
        } => {
            let config = load_config()?;
            let catalog = match &catalog {
                Some(path) => load_catalog(path)?,
                None => Catalog::new(),
            };
            let meals = meals
                .as_deref()
                .map(|path| read_json::<Vec<Meal>>(path))
                .transpose()?;
            let mut store = open_store(&config, &state, catalog, meals)?;

            match action {
                ShoppingAction::List { json } => {
                    let sections = store.build_shopping_sections();
                    if json {
                        println!("{}", serde_json::to_string_pretty(&sections)?);
                    } else {
                        print_sections(&sections);
                    }
                }
                ShoppingAction::AddMeal { meal_id, persons } => store.add_to_basket(meal_id, persons),
                ShoppingAction::RemoveMeal { meal_id } => store.remove_from_basket(meal_id),
                ShoppingAction::Add { text } => {
                    if store.add_manual_quick(&text).is_none() {
                        return Err(format!("nothing to add in '{}'", text).into());
                    }
                }
                ShoppingAction::Toggle {
                    name,
                    unit,
                    category,
                } => match store.toggle_or_remove(&name, &unit, &category) {
                    Some(outcome) => println!("{:?}", outcome),
                    None => return Err(format!("'{}' is not on the list", name).into()),
                },
                ShoppingAction::Reset => store.reset_consumed(),
            }
        }
    }

    Ok(())
}

fn parse_provider(name: &str) -> Result<ProviderKind, Box<dyn Error>> {
    match name {
        "openai" => Ok(ProviderKind::OpenAI),
        "anthropic" => Ok(ProviderKind::Anthropic),
        "ollama" => Ok(ProviderKind::Ollama),
        other => Err(format!("unknown provider '{}'", other).into()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_catalog(path: &Path) -> Result<Catalog, Box<dyn Error>> {
    let entries: Vec<Ingredient> = read_json(path)?;
    debug!("Loaded {} catalog entries", entries.len());
    Ok(catalog_from(entries))
}

/// Restore the persisted state, then write every later change through.
fn open_store(
    config: &PlannerConfig,
    state: &Path,
    catalog: Catalog,
    meals: Option<Vec<Meal>>,
) -> Result<ShoppingStore, Box<dyn Error>> {
    let files = Arc::new(FileStore::new(state));
    let mut store = ShoppingStore::with_config(catalog, &config.shopping);
    if let Some(meals) = meals {
        store.set_meals(meals);
    }
    store.restore(PersistedState::load(files.as_ref())?);
    store.subscribe(Arc::new(PersistingObserver::new(files)));
    Ok(store)
}

fn print_sections(sections: &[ShoppingSection]) {
    for section in sections {
        println!("{}", section.category);
        for item in &section.items {
            let mark = if item.checked { "x" } else { " " };
            if item.total_quantity > 0.0 {
                println!(
                    "  [{}] {} {} {}",
                    mark, item.name, item.total_quantity, item.unit
                );
            } else {
                println!("  [{}] {}", mark, item.name);
            }
        }
    }
}
