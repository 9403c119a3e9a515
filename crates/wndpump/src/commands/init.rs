use std::fs;
use std::path::PathBuf;

use wndpump_core::{PumpError, PumpResult, config};

#[derive(clap::Args)]
pub struct InitArgs {
    /// Print the default configuration instead of writing it
    #[arg(long)]
    pub stdout: bool,
    /// Replace an existing configuration file
    #[arg(long)]
    pub force: bool,
}

enum Installed {
    Written(PathBuf),
    Kept(PathBuf),
}

pub fn execute(args: &InitArgs) {
    let template = config::template::generate_config();
    if args.stdout {
        print!("{template}");
        return;
    }

    match install(&template, args.force) {
        Ok(Installed::Written(path)) => {
            println!("Wrote default configuration to {}", path.display());
        }
        Ok(Installed::Kept(path)) => {
            println!("{} already exists; pass --force to replace it", path.display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Writes `template` to the config path unless a file is already there.
fn install(template: &str, force: bool) -> PumpResult<Installed> {
    let path = config::config_path()
        .ok_or_else(|| PumpError::Config("could not determine home directory".into()))?;
    if path.exists() && !force {
        return Ok(Installed::Kept(path));
    }

    let failed = |e: std::io::Error| PumpError::Config(format!("{}: {e}", path.display()));
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(failed)?;
    }
    fs::write(&path, template).map_err(failed)?;
    Ok(Installed::Written(path))
}
