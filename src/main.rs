use std::io::{self, BufWriter, Write};

use anyhow::{anyhow, Result};
use structopt::StructOpt;

use bmff::debug;
use bmff::Mp4Reader;

#[derive(StructOpt, Debug)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUST_LOG; trace, debug, info etc)
    pub log: Option<String>,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Media information.
    Mediainfo(MediainfoOpts),

    #[structopt(display_order = 2)]
    /// Show the boxes.
    Boxes(BoxesOpts),

    #[structopt(display_order = 3)]
    /// Dump the sample table of a track.
    Samples(SamplesOpts),
}

#[derive(StructOpt, Debug)]
pub struct MediainfoOpts {
    #[structopt(short, long)]
    /// Output in JSON.
    pub json: bool,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct BoxesOpts {
    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct SamplesOpts {
    #[structopt(short, long)]
    /// Select a track by index (0-based).
    pub track: usize,

    /// Input filename.
    pub input: String,
}

fn main() -> Result<()> {
    let opts = MainOpts::from_args();

    let mut builder = env_logger::Builder::new();
    if let Some(ref log_opts) = opts.log {
        builder.parse_filters(log_opts);
    } else if let Ok(ref log_opts) = std::env::var("RUST_LOG") {
        builder.parse_filters(log_opts);
    } else {
        builder.parse_filters("info");
    }
    builder.init();

    match opts.cmd {
        Command::Boxes(opts) => boxes(opts),
        Command::Mediainfo(opts) => mediainfo(opts),
        Command::Samples(opts) => samples(opts),
    }
}

fn boxes(opts: BoxesOpts) -> Result<()> {
    let reader = Mp4Reader::open(&opts.input)?;

    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());
    debug::dump_boxes(reader.mp4(), &mut handle)?;

    let report = debug::overhead_report(reader.mp4());
    writeln!(handle)?;
    writeln!(
        handle,
        "total {} bytes, payload {} bytes, overhead {} bytes ({:.2}%)",
        report.total, report.payload, report.overhead, report.percent
    )?;

    Ok(())
}

fn mediainfo(opts: MediainfoOpts) -> Result<()> {
    let reader = Mp4Reader::open(&opts.input)?;

    let movie = reader.movie_info();
    let tracks = reader.track_infos();
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&movie)?);
        println!("{}", serde_json::to_string_pretty(&tracks)?);
    } else {
        println!("{:#?}", movie);
        println!("{:#?}", tracks);
    }

    Ok(())
}

fn samples(opts: SamplesOpts) -> Result<()> {
    let reader = Mp4Reader::open(&opts.input)?;
    if opts.track >= reader.track_count() {
        return Err(anyhow!("samples: track index {} not found", opts.track));
    }

    let stdout = io::stdout();
    let mut handle = BufWriter::with_capacity(128000, stdout.lock());
    debug::dump_track_samples(&reader, opts.track, &mut handle)?;

    Ok(())
}
