use anyhow::{anyhow, bail, Context};
use lenscam::platform::{Journal, RigDescription, SimulatedCatalog, SimulatedSession};
use lenscam::{
    CameraHandle, CameraManager, CameraPosition, LensCamConfig, StaticPermissions, ZoomOutcome,
};
use std::env;
use std::sync::Arc;

const USAGE: &str = "Usage: lenscam-cli <command> [args] [--rig <file>] [--config <file>] [--json]

Commands:
  list-devices [front|back]     List every camera with its zoom stops
  zoom-factors [front|back]     Zoom stops of the camera a session would use
  zoom <factor>...              Start a session and request each logical zoom in turn
  flip <front|back> [factor]    Start a session, switch camera, optionally zoom
  show-config                   Print the effective configuration";

struct Options {
    command: String,
    positional: Vec<String>,
    rig: Option<String>,
    config: Option<String>,
    json: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut positional = Vec::new();
    let mut rig = None;
    let mut config = None;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rig" => {
                i += 1;
                rig = Some(args.get(i).cloned().ok_or_else(|| anyhow!("--rig needs a path"))?);
            }
            "--config" => {
                i += 1;
                config = Some(
                    args.get(i)
                        .cloned()
                        .ok_or_else(|| anyhow!("--config needs a path"))?,
                );
            }
            "--json" => json = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if positional.is_empty() {
        bail!("{}", USAGE);
    }
    let command = positional.remove(0);
    Ok(Options {
        command,
        positional,
        rig,
        config,
        json,
    })
}

fn parse_position(value: &str) -> anyhow::Result<CameraPosition> {
    match value {
        "front" => Ok(CameraPosition::Front),
        "back" => Ok(CameraPosition::Back),
        other => bail!("Unknown camera position: {}", other),
    }
}

fn load_rig(options: &Options) -> anyhow::Result<RigDescription> {
    match &options.rig {
        Some(path) => RigDescription::load(path).with_context(|| format!("loading rig {}", path)),
        None => Ok(RigDescription::triple_camera_phone()),
    }
}

fn load_config(options: &Options) -> anyhow::Result<LensCamConfig> {
    let path = options
        .config
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(LensCamConfig::default_path);
    let config = LensCamConfig::load_layered(&path)?;
    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn build_manager(options: &Options) -> anyhow::Result<(CameraManager, Journal)> {
    let journal = Journal::new();
    let rig = load_rig(options)?;
    let catalog = SimulatedCatalog::from_rig(&rig, &journal)?;
    let manager = CameraManager::new(
        Arc::new(SimulatedSession::new(journal.clone())),
        Arc::new(catalog),
        Arc::new(StaticPermissions::granted()),
        load_config(options)?,
    );
    Ok((manager, journal))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lenscam::init_logging();
    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args)?;

    match options.command.as_str() {
        "list-devices" => cmd_list_devices(&options),
        "zoom-factors" => cmd_zoom_factors(&options),
        "zoom" => cmd_zoom(&options).await,
        "flip" => cmd_flip(&options).await,
        "show-config" => cmd_show_config(&options),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn cmd_list_devices(options: &Options) -> anyhow::Result<()> {
    let position = options
        .positional
        .first()
        .map(|p| parse_position(p))
        .transpose()?;
    let (manager, _) = build_manager(options)?;
    let cameras = manager
        .discovery()
        .list_cameras(position, &manager.config().zoom.policy());

    if options.json {
        println!("{}", serde_json::to_string(&cameras)?);
    } else {
        for camera in cameras {
            println!(
                "{}: {} zoom {:?} (physical {}..{})",
                camera.id,
                camera.display_name,
                camera.zoom_factors.as_slice(),
                camera.min_zoom,
                camera.max_zoom
            );
        }
    }
    Ok(())
}

fn cmd_zoom_factors(options: &Options) -> anyhow::Result<()> {
    let (manager, _) = build_manager(options)?;
    let position = match options.positional.first() {
        Some(p) => parse_position(p)?,
        None => manager.config().camera.default_position,
    };
    let device = manager.discovery().require(position)?;
    let topology = lenscam::LensTopology::of(device.as_ref());
    let factors = lenscam::zoom::ZoomProber::new(manager.config().zoom.policy()).probe(&topology);

    if options.json {
        println!("{}", serde_json::to_string(&factors)?);
    } else {
        println!("{} ({}): {:?}", device.unique_id(), position, factors.as_slice());
    }
    Ok(())
}

fn print_outcome(logical: f64, outcome: &lenscam::Result<ZoomOutcome>, json: bool) -> anyhow::Result<()> {
    if json {
        let value = match outcome {
            Ok(outcome) => serde_json::json!({ "requested": logical, "outcome": outcome }),
            Err(e) => serde_json::json!({ "requested": logical, "error": e.to_string() }),
        };
        println!("{}", value);
    } else {
        match outcome {
            Ok(ZoomOutcome::Applied {
                physical,
                switched_device,
                ..
            }) => println!(
                "{}x -> physical {}{}",
                logical,
                physical,
                if *switched_device { " (device switched)" } else { "" }
            ),
            Ok(ZoomOutcome::Ignored(reason)) => println!("{}x ignored: {:?}", logical, reason),
            Err(e) => println!("{}x failed: {}", logical, e),
        }
    }
    Ok(())
}

async fn cmd_zoom(options: &Options) -> anyhow::Result<()> {
    if options.positional.is_empty() {
        bail!("Usage: lenscam-cli zoom <factor>...");
    }
    let factors = options
        .positional
        .iter()
        .map(|f| f.parse::<f64>().with_context(|| format!("invalid zoom factor {}", f)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (manager, _) = build_manager(options)?;
    let (camera, task) = CameraHandle::spawn(manager);
    camera.setup().await?;

    for logical in factors {
        let outcome = camera.set_zoom_factor(logical).await;
        print_outcome(logical, &outcome, options.json)?;
    }

    let attributes = camera.attributes().borrow().clone();
    if options.json {
        println!("{}", serde_json::to_string(&attributes)?);
    } else {
        println!("final zoom: {}x", attributes.zoom_factor);
    }
    camera.cancel().await?;
    drop(camera);
    task.join().await?;
    Ok(())
}

async fn cmd_flip(options: &Options) -> anyhow::Result<()> {
    let position = options
        .positional
        .first()
        .ok_or_else(|| anyhow!("Usage: lenscam-cli flip <front|back> [factor]"))
        .and_then(|p| parse_position(p))?;
    let zoom = options
        .positional
        .get(1)
        .map(|f| f.parse::<f64>())
        .transpose()
        .context("invalid zoom factor")?;

    let (manager, journal) = build_manager(options)?;
    let (camera, task) = CameraHandle::spawn(manager);
    camera.setup().await?;
    camera.set_camera_position(position).await?;
    if let Some(logical) = zoom {
        let outcome = camera.set_zoom_factor(logical).await;
        print_outcome(logical, &outcome, options.json)?;
    }

    let factors = camera.available_zoom_factors().await?;
    let attributes = camera.attributes().borrow().clone();
    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "attributes": attributes,
                "zoom_factors": factors,
                "platform_calls": journal.entries(),
            })
        );
    } else {
        println!(
            "{} camera at {}x, stops {:?}",
            attributes.camera_position,
            attributes.zoom_factor,
            factors.as_slice()
        );
        for entry in journal.entries() {
            println!("  {}", entry);
        }
    }
    camera.cancel().await?;
    drop(camera);
    task.join().await?;
    Ok(())
}

fn cmd_show_config(options: &Options) -> anyhow::Result<()> {
    let config = load_config(options)?;
    if options.json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
