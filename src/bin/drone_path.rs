// 3D drone path planning demo
//
// usage: drone_path [scenario.json] [--seed N] [--plot out.png]
//
// Without a scenario file a random field of columns is generated.

use std::env;
use std::process::ExitCode;

use log::{error, info};

use drone_motion_planning::common::PlanningResult;
use drone_motion_planning::scenario::Scenario;
use drone_motion_planning::utils::quick_plot_plan;

struct Args {
    scenario: Option<String>,
    seed: u64,
    plot: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args { scenario: None, seed: 42, plot: None };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                let value = it.next().ok_or("--seed needs a value")?;
                args.seed = value.parse().map_err(|e| format!("bad seed {}: {}", value, e))?;
            }
            "--plot" => args.plot = Some(it.next().ok_or("--plot needs a file name")?),
            _ => args.scenario = Some(arg),
        }
    }
    Ok(args)
}

fn run(args: &Args) -> PlanningResult<()> {
    let scenario = match &args.scenario {
        Some(path) => Scenario::from_file(path)?,
        None => {
            info!("no scenario given, generating one with seed {}", args.seed);
            Scenario::random(args.seed, 12)
        }
    };
    let field = scenario.build_field()?;
    info!(
        "{} obstacles inflated into {} cells (grid {} m)",
        field.obstacles().len(),
        field.len(),
        field.grid_size()
    );

    let report = scenario.run(&field)?;
    println!(
        "path: {} points, length {:.2} m, {} expansions",
        report.raw_path.len(),
        report.raw_path.total_length(),
        report.expanded
    );
    println!(
        "waypoints: {}, length {:.2} m",
        report.waypoints.len(),
        report.waypoints.total_length()
    );
    for (i, p) in report.waypoints.iter().enumerate() {
        println!("  {:2}: ({:7.2}, {:7.2}, {:7.2})", i, p.x, p.y, p.z);
    }

    if let Some(out) = &args.plot {
        let mut vis = quick_plot_plan(&field, &report.raw_path, &report.waypoints, "3D A* drone path");
        vis.set_view(60.0, 30.0);
        vis.save_png(out, 1000, 800)?;
        println!("Plot saved to: {}", out);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: drone_path [scenario.json] [--seed N] [--plot out.png]");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
