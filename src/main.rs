use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flickr_exif_sync::config::DEFAULT_CONFIG_FILE;
use flickr_exif_sync::flickr::Progress;
use flickr_exif_sync::reorder::ReorderStep;
use flickr_exif_sync::{
    Config, Disposition, Error, ExifTool, FlickrClient, PhotoRecord, ReorderEngine, ReorderOptions, RestTransport, Result,
    SyncOptions, SyncPipeline,
};

#[derive(Parser)]
#[command(author, version, about = "Exif-Manipulator for Flickr", long_about = None)]
struct Args {
    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the configuration
    Config(ConfigArgs),
    /// Replace an EXIF value on every photo that carries it
    Modify {
        /// EXIF value to search for
        old: String,
        /// Replacing EXIF value
        new: String,
        /// Iterate through the complete account
        #[arg(long)]
        all: bool,
        /// Only report which photos would change
        #[arg(long = "checkonly")]
        check_only: bool,
    },
    /// Reorder the posted dates by the date each photo was taken
    Sort {
        /// Iterate through the complete account
        #[arg(long)]
        all: bool,
    },
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Show the current config
    #[arg(long)]
    view: bool,
    /// Set the specified values
    #[arg(long)]
    set: bool,
    /// Your Flickr NSID
    #[arg(long)]
    userid: Option<String>,
    /// Your Flickr screen name, resolved to an NSID
    #[arg(long)]
    username: Option<String>,
    /// Your Flickr API key
    #[arg(short = 'k', long)]
    apikey: Option<String>,
    /// Your Flickr API secret
    #[arg(short = 's', long)]
    apisecret: Option<String>,
}

const MODES: &[&str] = &["Global", "Photoset"];

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{wide_bar:.cyan/blue}}] {{pos}}/{{len}} ({{eta}}) {}",
                label
            ))
            .expect("Failed to set progress bar style"),
    );
    pb
}

fn flickr_client(config: &Config) -> Result<FlickrClient<RestTransport>> {
    let transport = RestTransport::new(&config.api.key, config.token())?;
    Ok(FlickrClient::new(transport, config.retry))
}

fn choose_photoset(client: &FlickrClient<RestTransport>, user_id: &str) -> Result<String> {
    println!("Fetching photosets...");
    let photosets = client.list_photosets(user_id).unwrap_or_default();
    if photosets.is_empty() {
        return Err(Error::NoPhotoset);
    }

    let titles: Vec<&str> = photosets.iter().map(|s| s.title.as_str()).collect();
    let selected = Select::new()
        .with_prompt("Please choose the photoset you want to manipulate")
        .items(&titles)
        .default(0)
        .interact()?;
    Ok(photosets[selected].id.clone())
}

fn select_photos(client: &FlickrClient<RestTransport>, config: &Config, scope_all: bool) -> Result<Vec<PhotoRecord>> {
    let user_id = config.user.id.as_str();
    let photos = if scope_all {
        client.list_all_user_photos(user_id)
    } else {
        let mode = Select::new()
            .with_prompt("Please choose mode")
            .items(MODES)
            .default(0)
            .interact()?;
        if MODES[mode] == "Photoset" {
            let photoset_id = choose_photoset(client, user_id)?;
            client.list_collection_photos(user_id, &photoset_id)
        } else {
            client.list_all_user_photos(user_id)
        }
    };
    photos.ok_or(Error::ListingUnavailable)
}

fn post_routine(downloads: &Path) -> Result<()> {
    let keep = Confirm::new()
        .with_prompt(format!("Do you want to keep the working files in {}?", downloads.display()))
        .default(true)
        .interact()?;
    if keep {
        println!("I don't touch the files.");
    } else {
        println!("Deleting files...");
        fs::remove_dir_all(downloads)?;
    }
    Ok(())
}

fn configure(config: &mut Config, config_path: &Path, args: ConfigArgs) -> Result<()> {
    let ConfigArgs {
        view,
        set,
        userid,
        username,
        apikey,
        apisecret,
    } = args;
    if view {
        println!("Exif-Manipulator Config:");
        print!("{}", config.render()?);
        return Ok(());
    }
    if !set {
        return Ok(());
    }

    let mut modified = false;
    if let Some(id) = userid {
        config.user.id = id;
        modified = true;
    }
    if let Some(name) = username {
        println!("Fetching user id...");
        let id = flickr_client(config)?
            .get_user_id_by_name(&name)
            .ok_or_else(|| Error::UserNotFound(name.clone()))?;
        config.user.id = id;
        config.user.name = name;
        modified = true;
    }
    modified |= config.set_api_credentials(apikey, apisecret)?;

    if modified {
        config.save(config_path)?;
        println!("Config saved to {}", config_path.display());
    }
    Ok(())
}

fn modify(config: &Config, options: SyncOptions) -> Result<()> {
    fs::create_dir_all(&config.paths.downloads)?;
    let mut exiftool = ExifTool::spawn(&config.exiftool.path)?;
    let client = flickr_client(config)?;
    let photos = select_photos(&client, config, options.scope_all)?;

    let bars = MultiProgress::new();
    let pb = bars.add(progress_bar(photos.len(), "Processing"));
    let upload = bars.add(progress_bar(100, "Uploading"));
    let upload_bar = upload.clone();
    let progress: Progress = Arc::new(move |percent: u8| {
        if percent == 0 {
            upload_bar.reset();
        }
        upload_bar.set_position(percent as u64);
    });

    let report = SyncPipeline::new(&client, &mut exiftool, options, &config.paths.downloads)
        .with_upload_progress(progress)
        .run(&photos, |photo, disposition| {
            debug!(photo_id = %photo.id, ?disposition, "Photo done");
            pb.inc(1);
        });
    upload.finish_and_clear();
    pb.finish_with_message("Processing complete");
    drop(exiftool);

    if report.processed() == photos.len() {
        println!("Done.");
        println!("{}", report);
    }
    for id in report.ids_with(Disposition::WouldModify) {
        println!("Needs change: {}", id);
    }
    report.write_status(&config.paths.status_file)?;
    println!("Status written to {}", config.paths.status_file.display());

    post_routine(&config.paths.downloads)
}

fn sort(config: &Config, options: ReorderOptions) -> Result<()> {
    let client = flickr_client(config)?;
    let engine = ReorderEngine::new(&client);
    let join_date = engine.join_date(&config.user.id)?;
    let photos = select_photos(&client, config, options.scope_all)?;

    let bars = MultiProgress::new();
    let fetch = bars.add(progress_bar(photos.len(), "Fetch Photo Info-Set"));
    let sorting = bars.add(progress_bar(0, "Sorting"));

    let report = engine.run(join_date, &photos, |step| match step {
        ReorderStep::Fetched => fetch.inc(1),
        ReorderStep::Sorted(count) => {
            fetch.finish();
            sorting.set_length(count as u64);
        }
        ReorderStep::Pushed => sorting.inc(1),
    });
    sorting.finish();

    println!("Posted dates updated: {}", report.assigned.len() - report.failed.len());
    if !report.skipped.is_empty() {
        println!("Skipped (no usable dates): {}", report.skipped.len());
    }
    if !report.failed.is_empty() {
        println!("Update failed: {}", report.failed.join(", "));
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    println!("Exif-Manipulator for Flickr v.{}", env!("CARGO_PKG_VERSION"));
    let Args {
        config: config_path,
        command,
        ..
    } = args;
    let mut config = Config::load_or_create(&config_path)?;

    match command {
        Commands::Config(args) => configure(&mut config, &config_path, args),
        Commands::Modify {
            old,
            new,
            all,
            check_only,
        } => modify(
            &config,
            SyncOptions {
                old_value: old,
                new_value: new,
                scope_all: all,
                check_only,
            },
        ),
        Commands::Sort { all } => sort(&config, ReorderOptions { scope_all: all }),
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
