// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate ifsgen;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use failure::err_msg;
use ifsgen::config::MIN_SIDE;
use ifsgen::dataset::Format;
use ifsgen::{DataType, GeneratorConfig};
use std::path::PathBuf;
use std::str::FromStr;

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

// Same bounds as GeneratorConfig::validate: above 0, at most 1.
fn validate_threshold(s: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(t) if t > 0.0 && t <= 1.0 => Ok(()),
        Ok(_) => Err("Density threshold must be greater than 0 and at most 1".to_string()),
        Err(_) => Err("Could not parse density threshold".to_string()),
    }
}

fn parse<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, failure::Error> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| err_msg(format!("Missing value for --{}", name)))?;
    T::from_str(raw).map_err(|_| err_msg(format!("Could not parse --{} value '{}'", name, raw)))
}

const OUTPUT: &str = "output-dir";
const COUNT: &str = "count";
const SHAPE: &str = "shape";
const TYPE: &str = "type";
const OVERWRITE: &str = "overwrite";
const MODEL_PATH: &str = "model-path";
const SEED: &str = "seed";
const WORKERS: &str = "workers";
const FORMAT: &str = "format";
const THRESHOLD: &str = "threshold";
const MAX_ATTEMPTS: &str = "max-attempts";
const ITERATIONS: &str = "iterations";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("ifsgen")
        .version("0.1.0")
        .author("elf")
        .about("Generates a synthetic dataset of colorized IFS fractal images")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output directory to store the generated dataset"),
        )
        .arg(
            Arg::with_name(COUNT)
                .required(true)
                .long(COUNT)
                .short("k")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        std::usize::MAX,
                        "Could not parse image count",
                        "Image count must be at least 1",
                    )
                })
                .help("Number of images to be generated"),
        )
        .arg(
            Arg::with_name(SHAPE)
                .required(true)
                .long(SHAPE)
                .takes_value(true)
                .number_of_values(2)
                .value_names(&["HEIGHT", "WIDTH"])
                .validator(|s| {
                    validate_range(
                        &s,
                        MIN_SIDE,
                        65_535,
                        "Could not parse image dimension",
                        &format!("Image dimensions must be between {} and 65535", MIN_SIDE),
                    )
                })
                .help("Height and width of the generated images"),
        )
        .arg(
            Arg::with_name(TYPE)
                .long(TYPE)
                .short("t")
                .takes_value(true)
                .default_value("image")
                .help("Type of data to generate (only 'image' is supported)"),
        )
        .arg(
            Arg::with_name(OVERWRITE)
                .long(OVERWRITE)
                .help("Overwrite existing files in the output directory"),
        )
        .arg(
            Arg::with_name(MODEL_PATH)
                .long(MODEL_PATH)
                .takes_value(true)
                .help("Directory where the colorization table is located, or is saved to"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        std::u64::MAX,
                        "Could not parse seed",
                        "Seed out of range",
                    )
                })
                .help("Seed every random stream of the run is derived from"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .long(WORKERS)
                .short("j")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads.max(64),
                        "Could not parse worker count",
                        &format!("Worker count must be between 1 and {}", max_threads.max(64)),
                    )
                })
                .help("Number of worker threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(FORMAT)
                .long(FORMAT)
                .takes_value(true)
                .default_value("png")
                .possible_values(&["png", "jpg", "jpeg", "bmp"])
                .help("Image container format"),
        )
        .arg(
            Arg::with_name(THRESHOLD)
                .long(THRESHOLD)
                .takes_value(true)
                .default_value("0.2")
                .validator(|s| validate_threshold(&s))
                .help("Minimum fraction of inked pixels for a fractal category"),
        )
        .arg(
            Arg::with_name(MAX_ATTEMPTS)
                .long(MAX_ATTEMPTS)
                .takes_value(true)
                .default_value("100000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        std::usize::MAX,
                        "Could not parse attempt count",
                        "Attempt count must be at least 1",
                    )
                })
                .help("Random systems to try per category before giving up"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("200000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1_000,
                        10_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1000 and 10000000",
                    )
                })
                .help("Chaos-game steps per generated image"),
        )
        .get_matches()
}

fn config(matches: &ArgMatches) -> Result<GeneratorConfig, failure::Error> {
    let data_type: DataType = parse_type(matches)?;
    let shape = matches
        .values_of(SHAPE)
        .ok_or_else(|| err_msg("Missing value for --shape"))?
        .map(usize::from_str)
        .collect::<Result<Vec<usize>, _>>()?;
    let (height, width) = match shape.as_slice() {
        [height, width] => (*height, *width),
        _ => return Err(err_msg("--shape takes exactly two values: HEIGHT WIDTH")),
    };

    let mut config = GeneratorConfig::new(
        PathBuf::from(parse::<String>(matches, OUTPUT)?),
        parse(matches, COUNT)?,
        height,
        width,
    );
    config.data_type = data_type;
    config.overwrite = matches.is_present(OVERWRITE);
    config.model_path = matches.value_of(MODEL_PATH).map(PathBuf::from);
    config.seed = parse(matches, SEED)?;
    config.workers = match matches.value_of(WORKERS) {
        Some(_) => Some(parse(matches, WORKERS)?),
        None => None,
    };
    config.format = parse::<String>(matches, FORMAT)?
        .parse::<Format>()
        .map_err(err_msg)?;
    config.threshold = parse(matches, THRESHOLD)?;
    config.max_attempts = parse(matches, MAX_ATTEMPTS)?;
    config.render_iterations = parse(matches, ITERATIONS)?;
    Ok(config)
}

fn parse_type(matches: &ArgMatches) -> Result<DataType, failure::Error> {
    Ok(matches.value_of(TYPE).unwrap_or("image").parse::<DataType>()?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = args();
    let result = config(&matches).and_then(|config| ifsgen::generate(&config));
    match result {
        Err(e) => {
            eprintln!("Generation failure: {}", e);
            std::process::exit(1);
        }
        Ok(report) => {
            println!("{}", report.output_dir.display());
        }
    }
}
