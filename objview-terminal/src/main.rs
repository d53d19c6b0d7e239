/// objview - terminal viewer for Wavefront-style geometry files
///
/// Usage: objview <geometry-file>
/// Controls:
///   - WASD: Move
///   - Arrow Keys / Left-drag: Look around
///   - Mouse wheel: Zoom
///   - R: Reload the file, C: Reset the camera
///   - Q/ESC: Quit
///
/// Set OBJVIEW_CONFIG to a TOML file to override camera, colour and load
/// settings; RUST_LOG controls log output.
use anyhow::{bail, Context, Result};
use objview_core::{load_geometry, GeometryBuffer, ViewerConfig};
use objview_terminal::TerminalApp;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const CONFIG_ENV: &str = "OBJVIEW_CONFIG";

/// Everything the viewer needs before the terminal is touched
struct Startup {
    path: PathBuf,
    geometry: GeometryBuffer,
    config: ViewerConfig,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let Startup { path, geometry, config } = prepare(env::args_os(), env::var_os(CONFIG_ENV))?;

    let mut app = TerminalApp::new(path, &geometry, config).context("failed to initialise the terminal")?;
    app.run().context("terminal error")?;

    log::info!("viewer closed");
    Ok(())
}

/// Parse arguments, read the optional config and load the geometry file
fn prepare<I>(args: I, config_path: Option<OsString>) -> Result<Startup>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let program = args
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "objview".to_string());
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("missing geometry file\nusage: {} <geometry-file>", program);
    };
    if args.next().is_some() {
        log::warn!("ignoring extra arguments after {}", path.display());
    }

    let config = match config_path {
        Some(config_path) => ViewerConfig::load(Path::new(&config_path))
            .with_context(|| format!("failed to load {}", CONFIG_ENV))?,
        None => ViewerConfig::default(),
    };

    let geometry = load_geometry(&path, config.load.face_policy)
        .with_context(|| format!("failed to load {}", path.display()))?;

    Ok(Startup { path, geometry, config })
}
