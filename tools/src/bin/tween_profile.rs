// cargo run --bin tween-profile --release -- --interpolation cyclic --from 0 --to 10 --length 2 --repeating --duration 6 --dt 0.02 /tmp/tween.txt

use clap::Parser;
use oorandom::Rand64;
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use arengine_lib::{
    animation::{Animation, AnimationContext},
    host::RecordingHost,
    scene::MemoryNode,
    units::{Ticks, Time},
};
use poidsl::Interpolation;
use poitypes::prelude::{AnimationDefinition, EventCategory};

/// Print an animation's factor over time
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Curve (linear, cyclic, sine, halfsine, smooth)
    #[arg(short = 'i', long, default_value = "linear")]
    interpolation: String,

    #[arg(long, default_value_t = 0.0)]
    from: f64,

    #[arg(long, default_value_t = 1.0)]
    to: f64,

    /// Animation length in seconds
    #[arg(short = 'l', long)]
    length: f64,

    /// Delay in seconds
    #[arg(long, default_value_t = 0.0)]
    delay: f64,

    #[arg(short = 'r', long)]
    repeating: bool,

    /// Duration stretch factor
    #[arg(long)]
    stretch: Option<f64>,

    /// Duration in seconds
    #[arg(short = 'd', long)]
    duration: f64,

    /// Time step (dt)
    #[arg(short = 't', long)]
    dt: f64,

    /// Output file path to write
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    if Interpolation::from_keyword(&opts.interpolation).is_none() {
        return Err(format!("Unknown interpolation '{}'", opts.interpolation).into());
    }

    let def = AnimationDefinition {
        name: "profile".to_owned(),
        kind: "scale".to_owned(),
        length: opts.length,
        delay: opts.delay,
        interpolation: opts.interpolation.clone(),
        repeating: opts.repeating,
        from: opts.from,
        to: opts.to,
        ..Default::default()
    };
    let mut animation = Animation::new(1, 1, EventCategory::OnCreate, &def);

    let mut node = MemoryNode::default();
    let mut host = RecordingHost::new();
    let mut actions = Vec::new();
    let mut prng = Rand64::new(0);

    let mut output = File::create(opts.output)?;

    let mut time = Time::from_secs(0.0);
    let dt = Time::from_secs(opts.dt);

    loop {
        if time.as_secs() >= opts.duration {
            break;
        }

        let now = Ticks::from_time(time);
        let mut ctx = AnimationContext {
            node: Some(&mut node),
            host: &mut host,
            actions: &mut actions,
            prng: &mut prng,
            stretch: opts.stretch,
        };
        if time.as_secs() == 0.0 {
            animation.activate(now, now, false, &mut ctx);
        } else {
            animation.animate(now, &mut ctx);
        }

        if let Some(factor) = animation.last_factor() {
            writeln!(
                &mut output,
                "{} {} {}",
                time.as_secs(),
                factor,
                u8::from(animation.is_active())
            )?;
        }

        time += dt;
    }

    Ok(())
}
