//! Subcommands and their handlers.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tryon_core::{
    CropRect, Dispatch, GarmentImport, ImageData, ItemCategory, TryOnStudio, WardrobeItem,
};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the garment catalog
    #[command(subcommand)]
    Wardrobe(WardrobeCommand),

    /// Manage the model picture
    #[command(subcommand)]
    Model(ModelCommand),

    /// Dress the model in one or more garments and save the render
    Fit(FitArgs),

    /// List the available poses
    Poses,

    /// Maintain the generation cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum WardrobeCommand {
    /// List items grouped by category
    List,

    /// Import a garment picture
    Import {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// top, bottom, shoes, outerwear or accessory
        #[arg(long, default_value = "top")]
        category: String,
        /// Crop as x,y,width,height before importing
        #[arg(long)]
        crop: Option<String>,
        #[arg(long)]
        remove_background: bool,
    },

    Rename { id: String, name: String },

    Move { id: String, category: String },

    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Use a picture as the model as-is
    Set { file: PathBuf },

    /// Generate a studio model picture from a photo
    Create { photo: PathBuf },

    Show,

    /// Forget the model picture
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Delete expired entries now
    Purge,
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Wardrobe item ids. Use `+` to start a new layer on top.
    #[arg(required = true)]
    items: Vec<String>,

    /// Pose index to render after fitting
    #[arg(long)]
    pose: Option<usize>,

    /// Where to write the final picture
    #[arg(short, long, default_value = "outfit.png")]
    out: PathBuf,

    /// Print the session view as JSON
    #[arg(long)]
    json: bool,
}

impl Command {
    /// Whether the command may call the image model.
    pub fn needs_generation(&self) -> bool {
        match self {
            Command::Fit(_) => true,
            Command::Model(cmd) => matches!(cmd, ModelCommand::Create { .. }),
            Command::Wardrobe(cmd) => matches!(
                cmd,
                WardrobeCommand::Import {
                    remove_background: true,
                    ..
                }
            ),
            Command::Poses | Command::Cache(_) => false,
        }
    }
}

pub async fn run(studio: &TryOnStudio, command: Command) -> Result<()> {
    match command {
        Command::Wardrobe(cmd) => wardrobe(studio, cmd).await,
        Command::Model(cmd) => model(studio, cmd).await,
        Command::Fit(args) => fit(studio, args).await,
        Command::Poses => {
            for (index, pose) in studio.poses().iter().enumerate() {
                println!("{index}: {pose}");
            }
            Ok(())
        }
        Command::Cache(CacheCommand::Purge) => {
            let purged = studio.purge_expired_cache().await?;
            println!("Purged {purged} expired entries");
            Ok(())
        }
    }
}

fn parse_category(raw: &str) -> Result<ItemCategory> {
    raw.parse()
        .map_err(|_| anyhow!("Unknown category '{raw}'"))
}

fn parse_crop(raw: &str) -> Result<CropRect> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid crop '{raw}'"))?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(CropRect {
            x,
            y,
            width,
            height,
        }),
        _ => bail!("Crop must be x,y,width,height"),
    }
}

fn print_item(item: &WardrobeItem) {
    println!("  {:<24} {}", item.id, item.name);
}

async fn wardrobe(studio: &TryOnStudio, cmd: WardrobeCommand) -> Result<()> {
    match cmd {
        WardrobeCommand::List => {
            for (category, items) in studio.wardrobe_grouped().await {
                println!("{}", category.as_str());
                items.iter().for_each(print_item);
            }
        }
        WardrobeCommand::Import {
            file,
            name,
            category,
            crop,
            remove_background,
        } => {
            let mut request = GarmentImport::from_path(&file, parse_category(&category)?)?
                .with_background_removal(remove_background);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            if let Some(crop) = crop {
                request = request.with_crop(parse_crop(&crop)?);
            }
            let item = studio.import_garment(request).await?;
            println!("Imported {} as {}", item.name, item.id);
        }
        WardrobeCommand::Rename { id, name } => {
            let item = studio.rename_wardrobe_item(&id, &name).await?;
            println!("Renamed {} to {}", item.id, item.name);
        }
        WardrobeCommand::Move { id, category } => {
            let item = studio
                .recategorize_wardrobe_item(&id, parse_category(&category)?)
                .await?;
            println!("Moved {} to {}", item.id, item.category.as_str());
        }
        WardrobeCommand::Remove { id } => match studio.remove_wardrobe_item(&id).await {
            Some(item) => println!("Removed {}", item.name),
            None => bail!("No wardrobe item '{id}'"),
        },
    }
    Ok(())
}

async fn model(studio: &TryOnStudio, cmd: ModelCommand) -> Result<()> {
    match cmd {
        ModelCommand::Set { file } => {
            studio.save_model_image(&ImageData::from_path(&file)?).await?;
            println!("Model picture saved");
        }
        ModelCommand::Create { photo } => {
            studio
                .create_model_from_photo(&ImageData::from_path(&photo)?)
                .await?;
            println!("Model picture generated and saved");
        }
        ModelCommand::Show => match studio.load_model().await? {
            Some(model) => println!("{}", model.image_url),
            None => println!("No model picture saved"),
        },
        ModelCommand::Clear => {
            if studio.start_over().await? == Dispatch::Ignored {
                bail!("A generation is still running");
            }
            println!("Model picture cleared");
        }
    }
    Ok(())
}

/// Split item ids into layers at each `+`.
fn layers(items: &[String]) -> Vec<Vec<&str>> {
    items
        .split(|item| item == "+")
        .filter(|layer| !layer.is_empty())
        .map(|layer| layer.iter().map(String::as_str).collect())
        .collect()
}

async fn fit(studio: &TryOnStudio, args: FitArgs) -> Result<()> {
    let session = studio.session().await?;

    for layer in layers(&args.items) {
        for id in layer {
            let item = studio
                .wardrobe_item(id)
                .await
                .ok_or_else(|| anyhow!("No wardrobe item '{id}'"))?;
            session.toggle_garment(item);
        }
        session.fit_outfit().await?;
        info!("Fitted layer {}", session.layer_count());
    }

    if let Some(pose) = args.pose {
        session.select_pose(pose).await?;
    }

    let view = session.view();
    let image = studio.gateway().load(&view.display_image).await?;
    write_image(&args.out, &image)?;
    println!("Wrote {} ({})", args.out.display(), view.pose_instruction);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }
    Ok(())
}

fn write_image(path: &Path, image: &ImageData) -> Result<()> {
    std::fs::write(path, &image.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))
}
