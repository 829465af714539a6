use anyhow::{anyhow, bail, Context, Result};
use crablens::{
    CameraController, CameraEvent, CrabLensConfig, DeviceSelector, InitializeParams,
    LensDirection,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const USAGE: &str = "Usage: crablens-cli <command> [args]

Commands:
  list-devices [--json]
  capture [--device ID] [--back] [--anti-macro] [--config PATH]
  record --seconds N [--device ID] [--back] [--config PATH]";

#[derive(Debug, Default)]
struct SessionArgs {
    device_id: Option<String>,
    back: bool,
    anti_macro: Option<bool>,
    seconds: Option<u64>,
    json: bool,
    config: Option<PathBuf>,
}

impl SessionArgs {
    fn parse(args: &[String]) -> Result<Self> {
        let mut parsed = SessionArgs::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--device" => {
                    parsed.device_id = Some(iter.next().context("--device needs an id")?.clone())
                }
                "--back" => parsed.back = true,
                "--anti-macro" => parsed.anti_macro = Some(true),
                "--json" => parsed.json = true,
                "--seconds" => {
                    let value = iter.next().context("--seconds needs a value")?;
                    parsed.seconds = Some(value.parse().context("--seconds must be a whole number")?);
                }
                "--config" => {
                    parsed.config = Some(PathBuf::from(iter.next().context("--config needs a path")?))
                }
                other => bail!("Unknown argument: {}\n\n{}", other, USAGE),
            }
        }
        Ok(parsed)
    }

    fn config(&self) -> Result<CrabLensConfig> {
        let path = self.config.clone().unwrap_or_else(CrabLensConfig::default_path);
        Ok(CrabLensConfig::load_from_file(path)?)
    }

    fn initialize_params(&self, config: &CrabLensConfig) -> InitializeParams {
        let direction = if self.back {
            LensDirection::Back
        } else {
            LensDirection::Front
        };
        InitializeParams::new(DeviceSelector {
            device_id: self.device_id.clone(),
            lens_direction: direction,
        })
        .with_preset(config.session.default_preset)
        .with_anti_macro(self.anti_macro.unwrap_or(config.session.anti_macro))
        .with_audio(config.session.enable_audio)
        .with_auto_flash(config.session.auto_flash)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    crablens::init_logging();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };
    let options = SessionArgs::parse(&args[2..])?;

    match command.as_str() {
        "list-devices" => cmd_list_devices(&options),
        "capture" => cmd_capture(&options).await,
        "record" => cmd_record(&options).await,
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn cmd_list_devices(options: &SessionArgs) -> Result<()> {
    let controller = CameraController::native(options.config()?);
    let devices = controller.enumerate_devices()?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        for d in devices {
            println!(
                "{}: {} ({}, {:?})",
                d.id, d.display_name, d.lens_direction, d.device_kind
            );
        }
    }
    Ok(())
}

async fn start(options: &SessionArgs) -> Result<CameraController> {
    let config = options.config()?;
    let params = options.initialize_params(&config);
    let controller = CameraController::native(config);
    controller
        .initialize(params)
        .await
        .context("Failed to initialize camera")?;

    let state = controller.state();
    if let Some(device) = &state.active_device {
        log::info!("Using {} ({})", device.display_name, device.id);
    }
    Ok(controller)
}

async fn cmd_capture(options: &SessionArgs) -> Result<()> {
    let controller = start(options).await?;
    let result = controller.take_picture().await;
    controller.dispose().await?;
    let path = result.context("Capture failed")?;
    println!("{}", path.display());
    Ok(())
}

async fn cmd_record(options: &SessionArgs) -> Result<()> {
    let seconds = options
        .seconds
        .ok_or_else(|| anyhow!("record needs --seconds N"))?;

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("error setting Ctrl-C handler")?;

    let controller = start(options).await?;
    let mut events = controller.subscribe();
    controller
        .start_video_recording()
        .await
        .context("Failed to start recording")?;
    log::info!("Recording for {}s (Ctrl-C to stop early)", seconds);

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = stop_rx.recv() => {
                log::info!("Stop requested");
                break;
            }
            event = events.recv() => match event {
                Some(CameraEvent::Error { code, message }) => {
                    controller.dispose().await?;
                    bail!("Recording failed ({}): {}", code, message);
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    let result = controller.stop_video_recording().await;
    controller.dispose().await?;
    let path = result.context("Failed to stop recording")?;
    println!("{}", path.display());
    Ok(())
}
