//! romtender
//!
//! Command-line front-end for the ROM library engine. Each invocation runs
//! one operation against the library described by the configuration file.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use romtender_config::{ArtCategory, ManagerConfig};
use romtender_library::paths::archive_root;
use romtender_library::{
    ActionOutcome, ArchiveDeletion, Collection, CollectionStore, CompanionStatus, LibraryLayout,
    LocalThumbnailMirror, PlayTracker, Relocator, RomAction, RomDirectory, RomItem,
    delete_archive, find_art, find_existing_art, list_archives,
};

#[derive(Parser)]
#[command(name = "romtender")]
#[command(about = "Keep ROMs, artwork, saves, collections and play history in step", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./romtender.toml, then /etc/romtender/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename a ROM and its companions
    Rename {
        rom: PathBuf,
        /// New base name; the extension is kept
        new_name: String,
    },

    /// Move a ROM into an archive
    Archive {
        rom: PathBuf,
        /// Archive name (defaults to the configured one)
        #[arg(short, long)]
        archive: Option<String>,
    },

    /// Move an archived ROM back into the active tree
    Restore {
        rom: PathBuf,
        /// Archive the ROM currently lives in
        #[arg(short, long)]
        archive: Option<String>,
    },

    /// Delete a ROM and its art
    Delete { rom: PathBuf },

    /// Clear a ROM's play history, then delete it
    Nuke { rom: PathBuf },

    /// List archives
    Archives,

    /// Remove an archive that holds no files
    DeleteArchive { name: String },

    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },

    /// Find artwork
    Art {
        #[command(subcommand)]
        command: ArtCommands,
    },

    /// List play-tracker records whose ROM is gone
    Orphans,
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// List collections
    List {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show the games in a collection
    Show { name: String },
    /// Add ROMs to a collection, creating it if needed
    Add { name: String, roms: Vec<PathBuf> },
    /// Delete a collection
    Delete { name: String },
}

#[derive(Subcommand)]
enum ArtCommands {
    /// Print the art already stored for a ROM
    Existing { rom: PathBuf },
    /// Match and fetch art from the configured thumbnail mirror
    Find {
        rom: PathBuf,
        #[arg(short, long)]
        threshold: Option<f64>,
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CategoryArg {
    BoxArt,
    Snap,
    TitleScreen,
    Logo,
}

impl From<CategoryArg> for ArtCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::BoxArt => ArtCategory::BoxArt,
            CategoryArg::Snap => ArtCategory::Snap,
            CategoryArg::TitleScreen => ArtCategory::TitleScreen,
            CategoryArg::Logo => ArtCategory::Logo,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Setup logging to stderr
fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ManagerConfig::load_default().context("Failed to load configuration")?,
    };
    let layout = LibraryLayout::from(&config.paths);

    match cli.command {
        Commands::Rename { rom, new_name } => {
            relocate(&layout, &rom, &RomAction::Rename { new_name })?
        }
        Commands::Archive { rom, archive } => {
            let archive_name = archive.unwrap_or_else(|| config.archive.default_name.clone());
            relocate(&layout, &rom, &RomAction::Archive { archive_name })?
        }
        Commands::Restore { rom, archive } => {
            let name = archive.unwrap_or_else(|| config.archive.default_name.clone());
            let archive = RomDirectory::new(archive_root(&layout.rom_root, &name));
            relocate(&layout, &rom, &RomAction::Restore { archive })?
        }
        Commands::Delete { rom } => relocate(&layout, &rom, &RomAction::Delete)?,
        Commands::Nuke { rom } => relocate(&layout, &rom, &RomAction::Nuke)?,
        Commands::Archives => {
            let archives = list_archives(&layout.rom_root)?;
            if archives.is_empty() {
                println!("No archives");
            }
            for archive in archives {
                println!("{}", archive.display_name);
            }
        }
        Commands::DeleteArchive { name } => {
            let archive = RomDirectory::new(archive_root(&layout.rom_root, &name));
            match delete_archive(&archive)? {
                ArchiveDeletion::Removed => println!("Deleted archive {}", archive.display_name),
                ArchiveDeletion::Blocked(blocker) => {
                    bail!("Archive {} is not empty: {}", archive.display_name, blocker)
                }
            }
        }
        Commands::Collection { command } => collection(&layout, command)?,
        Commands::Art { command } => art(&config, command)?,
        Commands::Orphans => {
            let tracker = PlayTracker::new(&layout.tracker_db);
            for record in tracker.orphaned_records(&layout.rom_root)? {
                println!("{}\t{}\t{}", record.id, record.name, record.file_path);
            }
        }
    }

    Ok(())
}

/// Describe a ROM path the way the library expects
fn locate(rom: &Path) -> Result<(RomItem, RomDirectory)> {
    let parent = rom
        .parent()
        .with_context(|| format!("{} has no parent directory", rom.display()))?;
    let rom_dir = RomDirectory::new(parent);

    let item = if rom.is_dir() {
        RomItem::directory(rom, &rom_dir.tag)
    } else {
        RomItem::file(rom, &rom_dir.tag)
    };

    Ok((item, rom_dir))
}

fn relocate(layout: &LibraryLayout, rom: &Path, action: &RomAction) -> Result<()> {
    let (item, rom_dir) = locate(rom)?;
    let outcome = Relocator::new(layout)
        .apply(action, &item, &rom_dir)
        .with_context(|| format!("Failed to process {}", item.filename))?;

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &ActionOutcome) {
    match &outcome.path {
        Some(path) => println!("{}", path.display()),
        None => println!("Deleted"),
    }

    for (kind, status) in outcome.companions.entries() {
        match status {
            CompanionStatus::Done => println!("  {}: updated", kind),
            CompanionStatus::Skipped => println!("  {}: nothing to do", kind),
            CompanionStatus::Failed(reason) => println!("  {}: FAILED ({})", kind, reason),
        }
    }
}

fn collection(layout: &LibraryLayout, command: CollectionCommands) -> Result<()> {
    let store = CollectionStore::new(layout);

    match command {
        CollectionCommands::List { filter } => {
            let collections = store.generate_list(filter.as_deref())?;
            if collections.is_empty() {
                println!("No collections");
            }
            for collection in collections {
                println!("{}", collection.display_name);
            }
        }
        CollectionCommands::Show { name } => {
            let file = Collection::new(&name, &layout.collections_dir).file;
            let collection = store
                .read(&file)
                .with_context(|| format!("Failed to read collection {}", name))?;
            for game in collection.games {
                println!("{}\t{}", game.display_name, game.path.display());
            }
        }
        CollectionCommands::Add { name, roms } => {
            let mut games = Vec::new();
            for rom in &roms {
                games.push(locate(rom)?.0);
            }
            let mut collection = Collection::new(&name, &layout.collections_dir);
            let added = store.add_games(&mut collection, &games)?;
            info!("Added {} of {} games to {}", added, games.len(), name);
        }
        CollectionCommands::Delete { name } => {
            store.delete(&Collection::new(&name, &layout.collections_dir))?;
        }
    }

    Ok(())
}

fn art(config: &ManagerConfig, command: ArtCommands) -> Result<()> {
    match command {
        ArtCommands::Existing { rom } => {
            let (item, rom_dir) = locate(&rom)?;
            match find_existing_art(&item, &rom_dir) {
                Some(path) => println!("{}", path.display()),
                None => println!("No art for {}", item.filename),
            }
        }
        ArtCommands::Find {
            rom,
            threshold,
            category,
        } => {
            let Some(mirror) = &config.art.mirror else {
                bail!("art.mirror is not configured");
            };
            let (item, rom_dir) = locate(&rom)?;
            let system = config.art.system_for_tag(&item.tag);
            let category = category.map(ArtCategory::from).unwrap_or(config.art.category);
            let threshold = threshold.unwrap_or(config.art.threshold);

            let source = LocalThumbnailMirror::new(mirror);
            match find_art(&source, &system, &rom_dir, &item, category, threshold) {
                Some(path) => println!("{}", path.display()),
                None => println!("No art found for {}", item.filename),
            }
        }
    }

    Ok(())
}
