//! `molstage` binary: open a window showing one molecule.
//!
//! ```text
//! molstage [<preset id | PubChem CID | path.sdf> [stick|spacefill|wireframe]]
//! ```
//!
//! Options are read from `molstage.toml` in the working directory when
//! present.

use std::path::{Path, PathBuf};

use molstage::options::{DisplayStyle, Options};
use molstage::structure::library;
use molstage::viewer::{StructureSource, Viewer};

const OPTIONS_FILE: &str = "molstage.toml";

fn resolve_source(input: &str) -> Result<StructureSource, String> {
    if let Some(preset) = library::find(input) {
        return Ok(StructureSource::Preset(preset));
    }
    if Path::new(input).exists() {
        return Ok(StructureSource::File(PathBuf::from(input)));
    }
    if molstage::fetch::validate_cid(input).is_ok() {
        return Ok(StructureSource::Cid(input.trim().to_owned()));
    }
    Err(format!(
        "not a preset, file or PubChem CID: {input} (presets: {})",
        library::presets()
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

fn load_options() -> Options {
    let path = Path::new(OPTIONS_FILE);
    if !path.exists() {
        return Options::default();
    }
    match Options::load(path) {
        Ok(options) => {
            log::info!("loaded options from {OPTIONS_FILE}");
            options
        }
        Err(e) => {
            log::warn!("ignoring {OPTIONS_FILE}: {e}");
            Options::default()
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut options = load_options();

    let mut builder = Viewer::builder();
    if let Some(input) = args.next() {
        match resolve_source(&input) {
            Ok(source) => builder = builder.with_source(source),
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }
    if let Some(style) = args.next() {
        match style.parse::<DisplayStyle>() {
            Ok(style) => options.display.style = style,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = builder.with_options(options).build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
