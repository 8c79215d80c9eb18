use burnscar::{
    ClipMode, InputDataError, Inputs, Pipeline, PipelineConfig, PipelineError, RbrReview, Result,
    SeverityTable, Sentinel2,
};
use clap::Parser;
use std::{
    error::Error,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

#[derive(Parser, Debug)]
#[command(name = "burnscar")]
#[command(about = "Burn severity map from pre-fire and post-fire Sentinel-2 archives")]
struct Args {
    /// Pre-fire Sentinel-2 zip archive (prompted for when missing)
    #[arg(long, env = "BURNSCAR_PRE_FIRE")]
    pre_fire: Option<PathBuf>,

    /// Post-fire Sentinel-2 zip archive (prompted for when missing)
    #[arg(long, env = "BURNSCAR_POST_FIRE")]
    post_fire: Option<PathBuf>,

    /// Study area boundary (prompted for when missing)
    #[arg(long, env = "BURNSCAR_BOUNDARY")]
    boundary: Option<PathBuf>,

    /// Severity threshold; skips the interactive prompt
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// JSON configuration file
    #[arg(long, env = "BURNSCAR_CONFIG")]
    config: Option<PathBuf>,

    /// Root of the temporary run directories
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Directory the artifacts are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// How composites are cut to the study area
    #[arg(long, value_enum)]
    clip: Option<ClipMode>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(workspace) = &self.workspace {
            config.workspace = workspace.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(clip) = self.clip {
            config.clip = clip;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Prints `question` and reads one trimmed line; end of input aborts.
fn ask(input: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        Err(InputDataError::Aborted)?
    }
    Ok(line.trim().to_string())
}

fn ask_path(input: &mut impl BufRead, given: Option<PathBuf>, question: &str) -> Result<PathBuf> {
    match given {
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(ask(input, question)?)),
    }
}

/// Asks until the answer is a usable threshold.
fn ask_threshold(input: &mut impl BufRead, review: &RbrReview) -> Result<f64> {
    println!("\nRelativized burn ratio: {}", review.raster.display());
    println!("Preview: {}", review.preview.display());
    println!("{}\n", review.summary);
    loop {
        let answer = ask(input, "Enter the severity threshold: ")?;
        let Ok(threshold) = answer.parse::<f64>() else {
            println!("'{answer}' is not a number");
            continue;
        };
        match SeverityTable::new(threshold) {
            Ok(_) => return Ok(threshold),
            Err(error) => match error {
                burnscar::BurnscarError::InputData(input_error) => {
                    println!("{input_error}: {}", input_error.remediation())
                }
                other => return Err(other),
            },
        }
    }
}

fn report(error: &PipelineError) {
    eprintln!("error: {error}");
    match error.remediation() {
        Some(hint) if error.is_input_error() => eprintln!("hint: {hint}"),
        _ => {
            let mut source = error.source.source();
            while let Some(cause) = source {
                eprintln!("caused by: {cause}");
                source = cause.source();
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let config = match args.config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = match Pipeline::<Sentinel2>::new(config) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let inputs = (|| -> Result<Inputs> {
        Ok(Inputs {
            pre_fire: ask_path(&mut input, args.pre_fire.clone(), "Enter the pre-fire archive path: ")?,
            post_fire: ask_path(&mut input, args.post_fire.clone(), "Enter the post-fire archive path: ")?,
            boundary: ask_path(&mut input, args.boundary.clone(), "Enter the study area boundary path: ")?,
        })
    })();
    let inputs = match inputs {
        Ok(inputs) => inputs,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let started = Instant::now();
    let fixed = args.threshold;
    let mut source = |review: &RbrReview| match fixed {
        Some(threshold) => {
            println!("{}", review.summary);
            Ok(threshold)
        }
        None => ask_threshold(&mut input, review),
    };

    match pipeline.run(&inputs, &mut source) {
        Ok(outcome) => {
            println!("Burnt area: {:.2} ha", outcome.burnt_area_ha);
            println!("{}", outcome.class_counts);
            println!("Outputs in {}", pipeline.config().output_dir.display());
            println!("Processing time: {:.1?}", started.elapsed());
            ExitCode::SUCCESS
        }
        Err(error) => {
            report(&error);
            println!("Processing time: {:.1?}", started.elapsed());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burnscar::{stats::RasterSummary, BurnscarError, Grid};
    use ndarray::array;
    use rstest::{fixture, rstest};
    use std::io::Cursor;

    #[fixture]
    fn review() -> RbrReview {
        let grid = Grid::new(
            array![[0.1f32, 0.2]],
            burnscar::components::GeoTransform::new(0., 0., 10., -10.),
        );
        RbrReview {
            raster: PathBuf::from("review/rbr.tif"),
            preview: PathBuf::from("review/rbr_preview.png"),
            summary: RasterSummary::from_grid(&grid),
        }
    }

    #[rstest]
    fn reprompts_until_threshold_is_valid(review: RbrReview) {
        let mut input = Cursor::new("abc\n0.3\n-0.5\n 0.1 \n");
        assert_eq!(ask_threshold(&mut input, &review).unwrap(), 0.1);
    }

    #[rstest]
    fn end_of_input_aborts(review: RbrReview) {
        let mut input = Cursor::new("0.5\n");
        assert!(matches!(
            ask_threshold(&mut input, &review),
            Err(BurnscarError::InputData(InputDataError::Aborted))
        ));
    }

    #[rstest]
    fn given_paths_are_not_asked_for() {
        let mut input = Cursor::new("");
        let path = ask_path(&mut input, Some(PathBuf::from("pre.zip")), "?").unwrap();
        assert_eq!(path, PathBuf::from("pre.zip"));
        let path = ask_path(&mut Cursor::new("post.zip\n"), None, "?").unwrap();
        assert_eq!(path, PathBuf::from("post.zip"));
    }

    #[rstest]
    fn flags_override_config() {
        let args = Args::parse_from([
            "burnscar",
            "--output-dir",
            "maps",
            "--clip",
            "geometry",
            "--threshold",
            "-0.1",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("maps"));
        assert_eq!(config.clip, ClipMode::Geometry);
        assert_eq!(args.threshold, Some(-0.1));
    }
}
