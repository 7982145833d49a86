mod commands;
mod utils;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_derive::Subcommand;
use lifx_dash::logging::init_logging;
use lifx_dash::{ColorEdit, Serial, Settings};

use crate::utils::Target;

#[derive(Subcommand, Debug, Clone)]
enum ConvertCommands {
    /// Display color of a hue/saturation/brightness triple
    Hsb {
        #[arg(long)]
        hue: f64,
        #[arg(long)]
        saturation: f64,
        #[arg(long)]
        brightness: f64,
    },
    /// Display color of a white light at the given temperature
    Kelvin {
        #[arg(long)]
        kelvin: u32,
    },
}

#[derive(Subcommand, Debug, Default, Clone)]
enum Commands {
    /// Poll the lights and print every change, with keyboard control
    #[default]
    Watch,
    /// Print the discovered lights by group
    List {
        /// Also print address, product and location of each light
        #[arg(long)]
        info: bool,
    },
    /// Switch a light on or off
    #[command(group(clap::ArgGroup::new("target").required(true).args(["index", "serial"])))]
    #[command(group(clap::ArgGroup::new("state").required(true).args(["on", "off"])))]
    Power {
        /// Position in `list` output, counting from 1
        #[arg(long)]
        index: Option<usize>,
        /// Device serial, 12 hex digits
        #[arg(long)]
        serial: Option<Serial>,
        #[arg(long)]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    /// Change the color of a light; omitted components stay as they are
    #[command(group(clap::ArgGroup::new("target").required(true).args(["index", "serial"])))]
    Color {
        #[arg(long)]
        index: Option<usize>,
        #[arg(long)]
        serial: Option<Serial>,
        #[arg(long)]
        hue: Option<f64>,
        #[arg(long)]
        saturation: Option<f64>,
        #[arg(long)]
        brightness: Option<f64>,
        #[arg(long)]
        kelvin: Option<u32>,
    },
    /// Print the display color of a color value
    Convert {
        #[command(subcommand)]
        command: ConvertCommands,
    },
}

#[derive(Parser, Debug)]
#[command(name = "lifx-dash", version, about = "Dashboard for LAN smart lights")]
struct Params {
    /// JSON settings file
    #[clap(long, global = true, env = "LIFX_DASH_SETTINGS")]
    settings: Option<PathBuf>,
    /// Write logs to rotating files in this directory instead of stderr,
    /// overriding the settings file
    #[clap(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Number of simulated lights
    #[clap(long, global = true, default_value = "6")]
    devices: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let params = Params::parse();

    let mut settings = Settings::load(params.settings.as_deref()).context("Cannot load settings")?;
    if let Some(dir) = &params.log_dir {
        settings.logging.dir = Some(dir.clone());
    }
    let _guard = init_logging(&settings.logging).context("Cannot set up logging")?;

    match params.command.clone().unwrap_or_default() {
        Commands::Watch => commands::watch(&params, &settings).await?,
        Commands::List { info } => commands::list(&params, &settings, info).await?,
        Commands::Power {
            index, serial, on, ..
        } => {
            let target = Target::from_args(index, serial)?;
            commands::power(&params, &settings, target, on).await?
        }
        Commands::Color {
            index,
            serial,
            hue,
            saturation,
            brightness,
            kelvin,
        } => {
            let target = Target::from_args(index, serial)?;
            let edit = ColorEdit {
                hue,
                saturation,
                brightness,
                kelvin,
            };
            commands::color(&params, &settings, target, edit).await?
        }
        Commands::Convert { command } => match command {
            ConvertCommands::Hsb {
                hue,
                saturation,
                brightness,
            } => commands::convert_hsb(hue, saturation, brightness),
            ConvertCommands::Kelvin { kelvin } => commands::convert_kelvin(kelvin),
        },
    }

    Ok(())
}
