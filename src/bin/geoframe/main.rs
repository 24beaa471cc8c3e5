mod cli;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::{WrapErr, eyre};
use geoframe::{Config, Extent, Map, MapDocument, ProjectionInfo, ReprojectReport};
use std::path::Path;

fn normalize(x: f64, y: f64, width: f64, height: f64) -> color_eyre::Result<()> {
    let extent = Extent::new(x, y, width, height);
    let normalized = extent.normalized()?;

    println!(
        "x: {}, y: {}, width: {}, height: {}",
        normalized.x, normalized.y, normalized.width, normalized.height
    );
    println!("crosses dateline: {}", normalized.crosses_dateline());

    Ok(())
}

fn describe(descriptor: &str) -> color_eyre::Result<()> {
    let projection = ProjectionInfo::parse(descriptor)?;

    match projection.name() {
        Some(name) => println!("{projection} ({name})"),
        None => println!("{projection}"),
    }
    println!("  proj4: {}", projection.to_proj4());
    println!("  geographic: {}", projection.is_geographic());

    Ok(())
}

fn print_report(report: &ReprojectReport, json: bool) -> color_eyre::Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    eprintln!(
        "Reprojected to {} ({} groups retagged):",
        report.projection, report.groups
    );
    for layer in &report.layers {
        let outcome = match layer.outcome {
            geoframe::LayerOutcome::Reprojected => "reprojected",
            geoframe::LayerOutcome::CannotReproject => "kept old projection",
        };
        eprintln!("  - {}: {}", layer.name, outcome);
    }

    Ok(())
}

fn reproject(
    config: &Config,
    input: &Path,
    to: Option<&str>,
    output: Option<&Path>,
    json: bool,
) -> color_eyre::Result<()> {
    let target = match to {
        Some(descriptor) => ProjectionInfo::parse(descriptor)?,
        None => config
            .default_projection
            .clone()
            .ok_or_else(|| eyre!("No target projection: pass --to or set default_projection in the config"))?,
    };

    let document = MapDocument::load(input)?;
    let name = document.name.clone();
    let mut map = Map::new(document.into_frame());

    let report = map
        .reproject(&target, |layer| {
            log::info!("'{}' stays in {}", layer.name(), layer.projection())
        })
        .wrap_err_with(|| format!("Reprojecting {}", input.display()))?;

    print_report(&report, json)?;

    if config.fail_on_unreprojectable && !report.is_complete() {
        return Err(eyre!(
            "{} layer(s) could not be reprojected",
            report.stale().count()
        ));
    }

    let document = MapDocument::from_frame(name, map.frame());
    match output {
        Some(path) => {
            document.save(path, config.pretty)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", document.to_ron(config.pretty)?),
    }

    Ok(())
}

fn main() -> color_eyre::Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Normalize {
            x,
            y,
            width,
            height,
        } => normalize(x, y, width, height),
        Command::Reproject {
            input,
            to,
            output,
            json,
        } => reproject(&config, &input, to.as_deref(), output.as_deref(), json),
        Command::Describe { descriptor } => describe(&descriptor),
    }
}
