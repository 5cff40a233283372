//! Drive one servo channel with uniform noise through the acquisition,
//! filter and DDS stages and print input and output amplitude for transfer
//! function analysis.
use std::io::{self, Write};

use clap::Parser;
use log::{info, Level, LevelFilter, Metadata, Record};
use rand_core::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;

use suservo::{
    design_parameters::DDS_SYSCLK,
    iir::{pi_coefficients, ChannelCtrl, Coeff, StateKind},
    sim::Bench,
    ServoConfig,
};

#[derive(Parser, Debug)]
#[command(name = "transfer")]
#[command(about = "Noise response of a servo channel", long_about = None)]
struct Args {
    /// Number of samples
    #[arg(long, default_value_t = 256)]
    samples: usize,

    /// Noise amplitude relative to ADC full scale
    #[arg(long, default_value_t = 0.8)]
    amplitude: f64,

    /// RNG seed
    #[arg(long, default_value_t = 0x123)]
    seed: u64,

    /// Integrator corner in units of the sample rate
    #[arg(long, default_value_t = 0.005)]
    corner: f64,

    /// Proportional gain
    #[arg(long, default_value_t = 0.01)]
    gain: f64,

    /// Integrator gain limit
    #[arg(long, default_value_t = f64::INFINITY)]
    limit: f64,

    /// DDS output frequency in Hz
    #[arg(long, default_value_t = 80e6)]
    frequency: f64,

    /// DDS output phase in turns
    #[arg(long, default_value_t = 0.)]
    phase: f32,

    /// Initial DDS amplitude as a fraction of full scale
    #[arg(long, default_value_t = 0.5)]
    start: f32,

    /// JSON servo configuration, e.g. '{"dds": {"clk": 2}}'
    #[arg(long, value_name = "JSON")]
    config: Option<String>,

    /// Log filter details
    #[arg(short, long)]
    verbose: bool,

    /// No logging
    #[arg(short, long)]
    quiet: bool,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match record.level() {
                Level::Error | Level::Warn => {
                    eprintln!("[{}] {}", record.level(), record.args())
                }
                _ => eprintln!(
                    "[{}] {}: {}",
                    record.level(),
                    record.target(),
                    record.args()
                ),
            }
        }
    }

    fn flush(&self) {
        io::stderr().flush().ok();
    }
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.quiet {
        LevelFilter::Off
    } else if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|e| e.to_string())?;

    let config = match &args.config {
        Some(json) => ServoConfig::from_json(json)?,
        None => ServoConfig::default(),
    };
    let mut bench = Bench::new(config, config.adc.t_rtt)?;
    let w = config.iir;
    let sysclk = DDS_SYSCLK.to_Hz() as f64;

    let [a1, b0, b1] =
        pi_coefficients(&w, args.corner, args.gain, args.limit)?;
    let carrier = ad9910::Profile::from_units(
        args.frequency,
        args.phase,
        args.start,
        sysclk,
    );
    let y1 = (carrier.asf().value() as i32) << (w.state - w.asf - 1);
    info!("a1 {a1:#x}, b0 {b0:#x}, b1 {b1:#x}, y1 {y1:#x}");
    let ftw = carrier.ftw();
    let iir = bench.servo_mut().iir_mut();
    iir.set_state(0, Some(0), StateKind::Y1, y1)?;
    for (coeff, value) in [
        (Coeff::Cfg, 0),
        (Coeff::A1, a1),
        (Coeff::B0, b0),
        (Coeff::B1, b1),
        (Coeff::Offset, 0),
        (Coeff::Ftw0, (ftw & 0xffff) as i32),
        (Coeff::Ftw1, (ftw >> 16) as i32),
        (Coeff::Pow, carrier.pow() as i32),
    ] {
        iir.set_coeff(0, 0, coeff, value)?;
    }
    iir.set_ctrl(
        0,
        ChannelCtrl {
            profile: 0,
            en_out: true,
            en_iir: true,
        },
    )?;

    let mut rng = XorShiftRng::seed_from_u64(args.seed);
    let v = ((1 << (w.adc - 1)) - 1) as f64;
    let mut out = io::stdout().lock();
    writeln!(out, "x,y")?;
    let mut latency = 0;
    for _ in 0..args.samples {
        let u = rng.next_u32() as f64 / u32::MAX as f64;
        let x = ((2. * u - 1.) * args.amplitude * v).round() as i32;
        bench.set_input(0, x);
        latency = bench.sample();
        let profile = bench.profile(0).ok_or("no DDS profile")?;
        // the filter inverts
        writeln!(out, "{},{}", x as f64 / -v, profile.amplitude())?;
    }
    if let Some(p) = bench.profile(0) {
        info!(
            "{} samples at {} Hz, {latency} cycles latency, DDS {} Hz {} turns",
            args.samples,
            bench.servo().sample_rate().to_Hz(),
            p.frequency(sysclk),
            p.phase()
        );
    }
    if bench.errors() != 0 {
        log::warn!("{} malformed DDS transfers", bench.errors());
    }
    Ok(())
}
